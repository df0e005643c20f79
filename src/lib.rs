//! OmniFocus MCP Library
//!
//! Exposes the OmniFocus database to MCP clients by generating OmniJS
//! scripts, running them one at a time through `osascript`, and caching
//! read results until a write touches them.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod omnifocus;

// Re-export commonly used types for convenience
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use mcp::OmniFocusMcpServer;
pub use omnifocus::{AutomationTarget, Executor, OmniFocusClient, RawOutput, ResponseCache};
