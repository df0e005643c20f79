//! OmniFocus automation bridge
//!
//! `scripts` builds OmniJS payloads, `executor` runs them one at a time
//! through `osascript`, `cache` keeps recent read results, and `client`
//! ties the three together for the MCP layer.

pub mod cache;
pub mod client;
pub mod executor;
pub mod models;
pub mod script;
pub mod scripts;

pub use cache::ResponseCache;
pub use client::{CacheDomain, Mutation, OmniFocusClient};
pub use executor::{AutomationTarget, Executor, Invocation, OsascriptTarget, RawOutput};
pub use script::{Helper, ScriptBuilder, ScriptPayload};
