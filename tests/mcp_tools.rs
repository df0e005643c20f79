//! Tool handlers driven against a fake OmniFocus.

mod common;

use common::*;
use omnifocus_mcp::mcp::{InvalidateCacheArgs, OmniFocusMcpServer};
use omnifocus_mcp::omnifocus::models::{ListTasksArgs, SetTaskTagsArgs, TagMode};
use omnifocus_mcp::omnifocus::RawOutput;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use serde_json::{json, Value};
use std::sync::Arc;

fn server(fake: &Arc<FakeOmniFocus>) -> OmniFocusMcpServer {
    OmniFocusMcpServer::new(Arc::new(client_with(fake, 30_000)))
}

fn body(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn list_tasks_returns_json_array() {
    let fake = FakeOmniFocus::new();
    fake.route_json(FILTER_TASKS, json!([task_json("t1", "Call Bob")]));
    let server = server(&fake);

    let result = server
        .list_tasks(Parameters(ListTasksArgs::default()))
        .await
        .unwrap();

    assert_ne!(result.is_error, Some(true));
    let value: Value = serde_json::from_str(&body(&result)).unwrap();
    assert_eq!(value[0]["id"], "t1");
    assert_eq!(value[0]["inInbox"], true);
}

#[tokio::test(start_paused = true)]
async fn permission_failure_is_an_error_result() {
    let fake = FakeOmniFocus::new();
    fake.route(
        SUMMARY,
        RawOutput::failure(1, "execution error: Not authorized to send Apple events to OmniFocus. (-1743)"),
    );
    let server = server(&fake);

    let result = server.get_database_summary().await.unwrap();

    assert_eq!(result.is_error, Some(true));
    assert!(body(&result).starts_with("[permission_denied]"));
}

#[tokio::test(start_paused = true)]
async fn blank_task_id_is_rejected_before_running() {
    let fake = FakeOmniFocus::new();
    let server = server(&fake);

    let result = server
        .set_task_tags(Parameters(SetTaskTagsArgs {
            task_id: String::new(),
            tag_names: vec![],
            mode: TagMode::Replace,
        }))
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(true));
    assert!(body(&result).starts_with("[invalid_argument]"));
    assert_eq!(fake.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalidate_cache_tool_reports_removed_entries() {
    let fake = FakeOmniFocus::new();
    fake.route_json(SUMMARY, summary_json(1));
    let server = server(&fake);

    server.get_database_summary().await.unwrap();
    let result = server
        .invalidate_cache(Parameters(InvalidateCacheArgs {
            prefix: Some("database:".into()),
        }))
        .await
        .unwrap();

    let value: Value = serde_json::from_str(&body(&result)).unwrap();
    assert_eq!(value["removed"], 1);

    server.get_database_summary().await.unwrap();
    assert_eq!(fake.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_limit_is_rejected_before_running() {
    let fake = FakeOmniFocus::new();
    fake.route_json(FILTER_TASKS, json!([]));
    let server = server(&fake);

    for limit in [0, 1001] {
        let result = server
            .list_tasks(Parameters(ListTasksArgs {
                limit: Some(limit),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(body(&result).starts_with("[invalid_argument]"), "{limit}");
    }
    assert_eq!(fake.calls(), 0);
}
