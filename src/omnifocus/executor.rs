//! Single-flight OmniJS execution
//!
//! OmniFocus does not tolerate overlapping Apple Events, so every payload
//! goes through one FIFO gate. The gate is a `tokio::sync::Mutex`, which
//! hands the lock to waiters in the order they asked for it; a failed
//! invocation releases it like a successful one.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::ExecutorConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::omnifocus::script::{js_string_literal, ScriptPayload};

/// Characters of a failing script written to the debug log.
const SCRIPT_LOG_PREVIEW_CHARS: usize = 500;

/// One request to the automation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// OmniJS program text
    pub script: String,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

/// What the automation target reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Set when the process was killed for exceeding the timeout
    pub killed: bool,
}

impl RawOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            ..Default::default()
        }
    }

    pub fn timed_out() -> Self {
        Self {
            killed: true,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0) && !self.killed
    }
}

/// Anything that can evaluate an OmniJS payload inside OmniFocus.
///
/// An `Err` means the target could not be driven at all (spawn failure,
/// output cap exceeded); script-level failures come back as [`RawOutput`].
#[async_trait]
pub trait AutomationTarget: Send + Sync {
    async fn evaluate(&self, request: &Invocation) -> io::Result<RawOutput>;
}

/// Runs payloads through `osascript -l JavaScript`, handing them to
/// OmniFocus with JXA `evaluateJavascript`.
#[derive(Debug, Clone)]
pub struct OsascriptTarget {
    osascript: String,
    application: String,
}

impl OsascriptTarget {
    pub fn new(osascript: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            osascript: osascript.into(),
            application: application.into(),
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(&config.osascript_path, &config.application)
    }
}

/// JXA program that evaluates `script` inside `application`.
pub fn jxa_wrapper(application: &str, script: &str) -> BridgeResult<String> {
    Ok(format!(
        "(() => {{\n  const app = Application({});\n  return app.evaluateJavascript({});\n}})()",
        js_string_literal(application)?,
        js_string_literal(script)?
    ))
}

#[async_trait]
impl AutomationTarget for OsascriptTarget {
    async fn evaluate(&self, request: &Invocation) -> io::Result<RawOutput> {
        let jxa = jxa_wrapper(&self.application, &request.script)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let mut child = Command::new(&self.osascript)
            .args(["-l", "JavaScript", "-e", jxa.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| io::Error::new(e.kind(), format!("Failed to launch {}: {}", self.osascript, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("osascript stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("osascript stderr was not captured"))?;
        let cap = request.max_output_bytes;

        let collected = tokio::time::timeout(request.timeout, async {
            let (out, err) = tokio::try_join!(read_capped(stdout, cap), read_capped(stderr, cap))?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((out, err, status))
        })
        .await;

        match collected {
            Ok(Ok((out, err, status))) => Ok(RawOutput {
                stdout: String::from_utf8_lossy(&out).into_owned(),
                stderr: String::from_utf8_lossy(&err).into_owned(),
                exit_code: status.code(),
                killed: false,
            }),
            Ok(Err(e)) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(e)
            }
            Err(_) => {
                warn!(timeout = ?request.timeout, "osascript exceeded timeout, killing");
                let _ = child.start_kill();
                let _ = child.wait().await;
                Ok(RawOutput::timed_out())
            }
        }
    }
}

/// Read a stream to the end, failing once more than `cap` bytes arrive.
async fn read_capped<R>(mut reader: R, cap: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        if captured.len() + read > cap {
            return Err(io::Error::other(format!(
                "OmniFocus output exceeded the {cap} byte limit"
            )));
        }
        captured.extend_from_slice(&buffer[..read]);
    }
    Ok(captured)
}

struct Rule {
    name: &'static str,
    matches: fn(&RawOutput) -> bool,
    error: fn(&RawOutput, Duration) -> BridgeError,
}

fn stderr_mentions(raw: &RawOutput, markers: &[&str]) -> bool {
    let text = raw.stderr.to_lowercase();
    markers.iter().any(|marker| text.contains(marker))
}

/// First matching rule wins.
const RULES: &[Rule] = &[
    Rule {
        name: "not_running",
        matches: |raw| stderr_mentions(raw, &["-600", "not running"]),
        error: |_, _| BridgeError::NotRunning,
    },
    Rule {
        name: "permission_denied",
        matches: |raw| stderr_mentions(raw, &["-1743", "not authorized", "not allowed"]),
        error: |_, _| BridgeError::PermissionDenied,
    },
    Rule {
        name: "timeout",
        matches: |raw| raw.killed && raw.exit_code.is_none(),
        error: |_, timeout| BridgeError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        },
    },
    Rule {
        name: "script_error",
        matches: |_| true,
        error: |raw, _| {
            if raw.stderr.is_empty() {
                match raw.exit_code {
                    Some(code) => BridgeError::script(format!("osascript exited with status {code}")),
                    None => BridgeError::script("osascript was terminated by a signal"),
                }
            } else {
                BridgeError::script(raw.stderr.clone())
            }
        },
    },
];

/// Map a finished invocation to an error, or `None` on success.
pub fn classify(raw: &RawOutput, timeout: Duration) -> Option<BridgeError> {
    if raw.is_success() {
        return None;
    }
    RULES.iter().find(|rule| (rule.matches)(raw)).map(|rule| {
        debug!(rule = rule.name, "Classified OmniJS failure");
        (rule.error)(raw, timeout)
    })
}

fn script_preview(script: &str) -> &str {
    match script.char_indices().nth(SCRIPT_LOG_PREVIEW_CHARS) {
        Some((idx, _)) => &script[..idx],
        None => script,
    }
}

pub struct Executor {
    target: Arc<dyn AutomationTarget>,
    config: ExecutorConfig,
    gate: Mutex<()>,
}

impl Executor {
    pub fn new(target: Arc<dyn AutomationTarget>, config: ExecutorConfig) -> Self {
        Self {
            target,
            config,
            gate: Mutex::new(()),
        }
    }

    /// Executor driving the real OmniFocus through `osascript`.
    pub fn osascript(config: ExecutorConfig) -> Self {
        let target = Arc::new(OsascriptTarget::from_config(&config));
        Self::new(target, config)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run one payload and return its trimmed stdout.
    pub async fn run(&self, payload: &ScriptPayload) -> BridgeResult<String> {
        let invocation = Invocation {
            script: payload.as_str().to_string(),
            timeout: self.config.timeout(),
            max_output_bytes: self.config.max_output_bytes,
        };

        let _turn = self.gate.lock().await;
        debug!(script_len = payload.len(), "Executing OmniJS script");

        let raw = match self.target.evaluate(&invocation).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to drive OmniFocus");
                debug!(script = script_preview(payload.as_str()), "Failed script preview");
                return Err(BridgeError::script(e.to_string()));
            }
        };

        if let Some(err) = classify(&raw, invocation.timeout) {
            error!(
                kind = %err.kind(),
                stderr = %raw.stderr,
                exit_code = ?raw.exit_code,
                "OmniJS execution failed"
            );
            debug!(script = script_preview(payload.as_str()), "Failed script preview");
            return Err(err);
        }

        Ok(raw.stdout.trim().to_string())
    }

    /// Run one payload and decode its output as JSON.
    pub async fn run_json<T: DeserializeOwned>(&self, payload: &ScriptPayload) -> BridgeResult<T> {
        let raw = self.run(payload).await?;
        decode_json(&raw)
    }
}

/// Decode script output, keeping only a bounded preview of it on failure.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> BridgeResult<T> {
    serde_json::from_str(raw).map_err(|e| {
        let err = BridgeError::parse(e.to_string(), raw);
        if let BridgeError::Parse { preview, .. } = &err {
            error!(raw = %preview, error = %e, "Failed to parse OmniJS JSON response");
        }
        err
    })
}
