//! MCP server exposing the OmniFocus client as tools.
//!
//! Each tool validates its arguments, calls exactly one client method and
//! returns pretty-printed JSON. Failures come back as error results whose
//! text starts with the error kind code, e.g. `[not_running] ...`.

use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRouter},
    handler::server::wrapper::Parameters,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, ErrorData, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::BridgeResult;
use crate::omnifocus::models::*;
use crate::omnifocus::OmniFocusClient;

const INSTRUCTIONS: &str = "Tools for reading and changing the OmniFocus database on this Mac. \
OmniFocus must be running. Dates are ISO 8601. Reads are cached briefly; writes refresh \
the affected caches automatically.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateCacheArgs {
    /// Only drop entries whose key starts with this prefix, e.g. `tasks:`. Omit to clear everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvalidateCacheResult {
    pub removed: usize,
}

fn render<T: Serialize>(result: BridgeResult<T>) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).map_err(|e| {
                ErrorData::internal_error(format!("Failed to encode result: {e}"), None)
            })?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(err) => {
            warn!(kind = %err.kind(), "Tool call failed: {}", err);
            Ok(CallToolResult::error(vec![Content::text(err.user_message())]))
        }
    }
}

/// Validate `args`, then await `call`. The call is never polled when
/// validation fails.
async fn respond<A, T, F>(args: &A, call: F) -> Result<CallToolResult, ErrorData>
where
    A: Validate,
    T: Serialize,
    F: Future<Output = BridgeResult<T>>,
{
    match args.validate() {
        Ok(()) => render(call.await),
        Err(err) => render::<T>(Err(err)),
    }
}

#[derive(Clone)]
pub struct OmniFocusMcpServer {
    client: Arc<OmniFocusClient>,
    tool_router: ToolRouter<Self>,
}

#[rmcp::tool_router(router = tool_router)]
impl OmniFocusMcpServer {
    pub fn new(client: Arc<OmniFocusClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    pub fn client(&self) -> &OmniFocusClient {
        &self.client
    }

    /// Names of every registered tool
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    // ===== tasks =====

    #[tool(
        name = "list_tasks",
        description = "List tasks with optional filters (status, flags, project, tags, date ranges, text search) and pagination."
    )]
    pub async fn list_tasks(
        &self,
        Parameters(args): Parameters<ListTasksArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.list_tasks(&args)).await
    }

    #[tool(
        name = "get_task_count",
        description = "Count tasks matching the same filters as list_tasks, without fetching them."
    )]
    pub async fn get_task_count(
        &self,
        Parameters(args): Parameters<ListTasksArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.get_task_count(&args)).await
    }

    #[tool(
        name = "get_task",
        description = "Get one task by ID, optionally with its subtask tree (maxDepth 0 = unlimited)."
    )]
    pub async fn get_task(
        &self,
        Parameters(args): Parameters<GetTaskArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.get_task(&args)).await
    }

    #[tool(name = "get_inbox_tasks", description = "List available tasks in the inbox.")]
    pub async fn get_inbox_tasks(&self) -> Result<CallToolResult, ErrorData> {
        render(self.client.get_inbox_tasks().await)
    }

    #[tool(name = "get_flagged_tasks", description = "List available flagged tasks.")]
    pub async fn get_flagged_tasks(&self) -> Result<CallToolResult, ErrorData> {
        render(self.client.get_flagged_tasks().await)
    }

    #[tool(
        name = "get_today_completed_tasks",
        description = "List tasks completed since midnight today."
    )]
    pub async fn get_today_completed_tasks(&self) -> Result<CallToolResult, ErrorData> {
        render(self.client.get_today_completed_tasks().await)
    }

    #[tool(
        name = "create_task",
        description = "Create a task in the inbox or a project, with optional dates, tags, estimate and repetition."
    )]
    pub async fn create_task(
        &self,
        Parameters(args): Parameters<CreateTaskArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.create_task(&args)).await
    }

    #[tool(
        name = "update_task",
        description = "Update task fields. Omitted fields are unchanged; null clears a date, estimate or repetition."
    )]
    pub async fn update_task(
        &self,
        Parameters(args): Parameters<UpdateTaskArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.update_task(&args)).await
    }

    #[tool(name = "complete_task", description = "Mark a task complete.")]
    pub async fn complete_task(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.complete_task(&args)).await
    }

    #[tool(name = "uncomplete_task", description = "Mark a completed task incomplete again.")]
    pub async fn uncomplete_task(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.uncomplete_task(&args)).await
    }

    #[tool(name = "drop_task", description = "Drop a task without completing it.")]
    pub async fn drop_task(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.drop_task(&args)).await
    }

    #[tool(name = "delete_task", description = "Permanently delete a task.")]
    pub async fn delete_task(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.delete_task(&args)).await
    }

    #[tool(
        name = "move_tasks",
        description = "Move tasks under a parent task, into a project, or back to the inbox."
    )]
    pub async fn move_tasks(
        &self,
        Parameters(args): Parameters<MoveTasksArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.move_tasks(&args)).await
    }

    #[tool(
        name = "duplicate_tasks",
        description = "Duplicate tasks into a project or the inbox."
    )]
    pub async fn duplicate_tasks(
        &self,
        Parameters(args): Parameters<DuplicateTasksArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.duplicate_tasks(&args)).await
    }

    #[tool(
        name = "set_task_tags",
        description = "Replace, add or remove a task's tags. Missing tags are created for replace and add."
    )]
    pub async fn set_task_tags(
        &self,
        Parameters(args): Parameters<SetTaskTagsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.set_task_tags(&args)).await
    }

    #[tool(
        name = "add_task_notification",
        description = "Add a notification: absolute (at a date) or dueRelative (offset in seconds from the due date)."
    )]
    pub async fn add_task_notification(
        &self,
        Parameters(args): Parameters<AddTaskNotificationArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.add_task_notification(&args)).await
    }

    #[tool(name = "list_task_notifications", description = "List a task's notifications.")]
    pub async fn list_task_notifications(
        &self,
        Parameters(args): Parameters<TaskRefArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.list_task_notifications(&args)).await
    }

    #[tool(name = "remove_task_notification", description = "Remove one notification from a task.")]
    pub async fn remove_task_notification(
        &self,
        Parameters(args): Parameters<RemoveTaskNotificationArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.remove_task_notification(&args)).await
    }

    #[tool(name = "append_task_note", description = "Append text to the end of a task's note.")]
    pub async fn append_task_note(
        &self,
        Parameters(args): Parameters<AppendTaskNoteArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.append_task_note(&args)).await
    }

    #[tool(
        name = "convert_task_to_project",
        description = "Convert a task (and its subtasks) into a project."
    )]
    pub async fn convert_task_to_project(
        &self,
        Parameters(args): Parameters<TaskRefArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.convert_task_to_project(&args)).await
    }

    #[tool(
        name = "batch_create_tasks",
        description = "Create several tasks, with nested children, in one call."
    )]
    pub async fn batch_create_tasks(
        &self,
        Parameters(args): Parameters<BatchCreateTasksArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.batch_create_tasks(&args)).await
    }

    #[tool(
        name = "batch_delete_tasks",
        description = "Delete several tasks. Nothing is deleted if any ID is unknown."
    )]
    pub async fn batch_delete_tasks(
        &self,
        Parameters(args): Parameters<TaskIdsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.batch_delete_tasks(&args)).await
    }

    #[tool(
        name = "batch_complete_tasks",
        description = "Complete several tasks. Nothing is completed if any ID is unknown."
    )]
    pub async fn batch_complete_tasks(
        &self,
        Parameters(args): Parameters<TaskIdsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.batch_complete_tasks(&args)).await
    }

    // ===== projects =====

    #[tool(
        name = "list_projects",
        description = "List projects, optionally filtered by status, folder or text, with pagination."
    )]
    pub async fn list_projects(
        &self,
        Parameters(args): Parameters<ListProjectsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.list_projects(&args)).await
    }

    #[tool(name = "get_project", description = "Get a project by ID or exact name.")]
    pub async fn get_project(
        &self,
        Parameters(args): Parameters<ProjectRefArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.get_project(&args)).await
    }

    #[tool(
        name = "create_project",
        description = "Create a project, optionally inside a folder, with review interval and tags."
    )]
    pub async fn create_project(
        &self,
        Parameters(args): Parameters<CreateProjectArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.create_project(&args)).await
    }

    #[tool(
        name = "update_project",
        description = "Update project fields and status. Null clears a date."
    )]
    pub async fn update_project(
        &self,
        Parameters(args): Parameters<UpdateProjectArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.update_project(&args)).await
    }

    #[tool(name = "complete_project", description = "Mark a project done.")]
    pub async fn complete_project(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.complete_project(&args)).await
    }

    #[tool(name = "delete_project", description = "Permanently delete a project and its tasks.")]
    pub async fn delete_project(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.delete_project(&args)).await
    }

    #[tool(
        name = "get_review_queue",
        description = "List active projects whose next review date has passed."
    )]
    pub async fn get_review_queue(&self) -> Result<CallToolResult, ErrorData> {
        render(self.client.get_review_queue().await)
    }

    #[tool(
        name = "mark_reviewed",
        description = "Mark a project reviewed, advancing its next review date."
    )]
    pub async fn mark_reviewed(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.mark_reviewed(&args)).await
    }

    // ===== folders =====

    #[tool(name = "list_folders", description = "List all folders, optionally by status.")]
    pub async fn list_folders(
        &self,
        Parameters(args): Parameters<ListFoldersArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.list_folders(&args)).await
    }

    #[tool(
        name = "get_folder",
        description = "Get a folder with its child folders and projects."
    )]
    pub async fn get_folder(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.get_folder(&args)).await
    }

    #[tool(name = "create_folder", description = "Create a folder, optionally inside another folder.")]
    pub async fn create_folder(
        &self,
        Parameters(args): Parameters<CreateFolderArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.create_folder(&args)).await
    }

    #[tool(name = "update_folder", description = "Rename a folder or change its status.")]
    pub async fn update_folder(
        &self,
        Parameters(args): Parameters<UpdateFolderArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.update_folder(&args)).await
    }

    #[tool(name = "delete_folder", description = "Permanently delete a folder and its contents.")]
    pub async fn delete_folder(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.delete_folder(&args)).await
    }

    // ===== tags =====

    #[tool(name = "list_tags", description = "List all tags, optionally by status.")]
    pub async fn list_tags(
        &self,
        Parameters(args): Parameters<ListTagsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.list_tags(&args)).await
    }

    #[tool(name = "get_tag", description = "Get a tag by ID.")]
    pub async fn get_tag(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.get_tag(&args)).await
    }

    #[tool(name = "create_tag", description = "Create a tag, optionally nested under a parent tag.")]
    pub async fn create_tag(
        &self,
        Parameters(args): Parameters<CreateTagArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.create_tag(&args)).await
    }

    #[tool(name = "update_tag", description = "Rename a tag or change its status and next-action setting.")]
    pub async fn update_tag(
        &self,
        Parameters(args): Parameters<UpdateTagArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.update_tag(&args)).await
    }

    #[tool(name = "delete_tag", description = "Permanently delete a tag.")]
    pub async fn delete_tag(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.delete_tag(&args)).await
    }

    // ===== database =====

    #[tool(
        name = "get_database_summary",
        description = "Counts of inbox, projects, tags, folders and available, due-soon, overdue and flagged tasks."
    )]
    pub async fn get_database_summary(&self) -> Result<CallToolResult, ErrorData> {
        render(self.client.get_database_summary().await)
    }

    #[tool(
        name = "search",
        description = "Search task, project, folder and tag names (and task/project notes)."
    )]
    pub async fn search(
        &self,
        Parameters(args): Parameters<SearchArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(&args, self.client.search(&args)).await
    }

    #[tool(
        name = "invalidate_cache",
        description = "Drop cached read results, by key prefix or entirely."
    )]
    pub async fn invalidate_cache(
        &self,
        Parameters(args): Parameters<InvalidateCacheArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let removed = self.client.invalidate_cache(args.prefix.as_deref());
        render(Ok(InvalidateCacheResult { removed }))
    }

    /// Serve over stdio until the client disconnects.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(tools = self.tool_router.list_all().len(), "OmniFocus MCP server ready (stdio transport)");
        let transport = (tokio::io::stdin(), tokio::io::stdout());
        self.serve(transport).await?.waiting().await?;
        Ok(())
    }
}

impl ServerHandler for OmniFocusMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("OmniFocus MCP Server".to_string()),
                icons: None,
                website_url: None,
                description: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let tool_context = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::omnifocus::executor::{AutomationTarget, Invocation, RawOutput};
    use async_trait::async_trait;
    use std::io;

    struct FixedTarget(RawOutput);

    #[async_trait]
    impl AutomationTarget for FixedTarget {
        async fn evaluate(&self, _request: &Invocation) -> io::Result<RawOutput> {
            Ok(self.0.clone())
        }
    }

    fn server(output: RawOutput) -> OmniFocusMcpServer {
        let client = OmniFocusClient::with_target(Arc::new(FixedTarget(output)), &BridgeConfig::default());
        OmniFocusMcpServer::new(Arc::new(client))
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    #[test]
    fn registers_every_tool() {
        let names = server(RawOutput::success("{}")).tool_names();
        for expected in [
            "list_tasks",
            "get_task",
            "set_task_tags",
            "batch_complete_tasks",
            "get_review_queue",
            "get_folder",
            "delete_tag",
            "get_database_summary",
            "search",
            "invalidate_cache",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert_eq!(names.len(), 44);
    }

    #[tokio::test]
    async fn success_renders_pretty_json() {
        let server = server(RawOutput::success(r#"{"count": 4}"#));
        let result = server
            .get_task_count(Parameters(ListTasksArgs::default()))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        assert_eq!(text_of(&result), "{\n  \"count\": 4\n}");
    }

    #[tokio::test]
    async fn failure_keeps_error_kind() {
        let server = server(RawOutput::failure(1, "execution error: (-600)"));
        let result = server.get_database_summary().await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("[not_running]"));
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_omnifocus() {
        let server = server(RawOutput::failure(1, "should not run"));
        let result = server
            .create_task(Parameters(CreateTaskArgs {
                name: "Call Bob".into(),
                due_date: Some("tomorrow-ish".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("[invalid_argument]"));
    }
}
