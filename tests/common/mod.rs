#![allow(dead_code)]

use async_trait::async_trait;
use omnifocus_mcp::config::{BridgeConfig, CacheTtls};
use omnifocus_mcp::omnifocus::{AutomationTarget, Invocation, OmniFocusClient, RawOutput};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::io;
use std::sync::Arc;

/// Marker present only in the database summary script.
pub const SUMMARY: &str = "inboxCount:";
/// Marker present only in the create_task script.
pub const CREATE_TASK: &str = "new Task(args.name";
/// Marker shared by list_tasks and get_task_count.
pub const FILTER_TASKS: &str = "filterTasks(args)";

/// In-process stand-in for OmniFocus.
///
/// Routes each script to the first registered output whose marker occurs
/// in it and records every script it was asked to evaluate.
#[derive(Default)]
pub struct FakeOmniFocus {
    routes: Mutex<Vec<(String, RawOutput)>>,
    scripts: Mutex<Vec<String>>,
}

impl FakeOmniFocus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, marker: &str, output: RawOutput) -> &Self {
        self.routes.lock().push((marker.to_string(), output));
        self
    }

    pub fn route_json(&self, marker: &str, value: Value) -> &Self {
        self.route(marker, RawOutput::success(value.to_string()))
    }

    /// Total invocations so far
    pub fn calls(&self) -> usize {
        self.scripts.lock().len()
    }

    pub fn calls_matching(&self, marker: &str) -> usize {
        self.scripts
            .lock()
            .iter()
            .filter(|script| script.contains(marker))
            .count()
    }

    pub fn last_script(&self) -> Option<String> {
        self.scripts.lock().last().cloned()
    }
}

#[async_trait]
impl AutomationTarget for FakeOmniFocus {
    async fn evaluate(&self, request: &Invocation) -> io::Result<RawOutput> {
        self.scripts.lock().push(request.script.clone());
        let routes = self.routes.lock();
        let output = routes
            .iter()
            .find(|(marker, _)| request.script.contains(marker.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| RawOutput::failure(1, "Error: no fake route for script"));
        Ok(output)
    }
}

pub fn client_with(fake: &Arc<FakeOmniFocus>, ttl_ms: u64) -> OmniFocusClient {
    let config = BridgeConfig {
        cache: CacheTtls::uniform(ttl_ms),
        ..Default::default()
    };
    OmniFocusClient::with_target(fake.clone(), &config)
}

pub fn summary_json(inbox: u64) -> Value {
    json!({
        "inboxCount": inbox,
        "projectCount": 4,
        "tagCount": 6,
        "folderCount": 2,
        "availableTaskCount": 17,
        "dueSoonTaskCount": 1,
        "overdueTaskCount": 0,
        "flaggedTaskCount": 3
    })
}

pub fn task_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "note": "",
        "flagged": false,
        "completed": false,
        "dropped": false,
        "deferDate": null,
        "dueDate": null,
        "completionDate": null,
        "droppedDate": null,
        "estimatedMinutes": null,
        "containingProjectId": null,
        "containingProjectName": null,
        "parentTaskId": null,
        "tags": [],
        "hasChildren": false,
        "sequential": false,
        "completedByChildren": false,
        "inInbox": true,
        "repetitionRule": null
    })
}

pub fn project_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "note": "",
        "status": "active",
        "flagged": false,
        "completed": false,
        "deferDate": null,
        "dueDate": null,
        "completionDate": null,
        "estimatedMinutes": null,
        "containingFolderId": null,
        "containingFolderName": null,
        "tags": [],
        "sequential": false,
        "singleActionList": false,
        "taskCount": 3,
        "remainingTaskCount": 2,
        "lastReviewDate": null,
        "nextReviewDate": null,
        "reviewInterval": null
    })
}

pub fn tag_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": "active",
        "parentTagId": null,
        "allowsNextAction": true,
        "availableTaskCount": 2,
        "remainingTaskCount": 5
    })
}
