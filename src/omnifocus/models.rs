//! Argument and result records for OmniFocus operations.
//!
//! Argument records double as MCP tool parameter schemas (serde + schemars).
//! Absent optional fields are never serialized, so the JSON embedded in a
//! script distinguishes "not given" from an explicit `null`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Deserialize a field present as `null` into `Some(None)` instead of `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ===== shared value types =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RepetitionMethod {
    Fixed,
    StartAfterCompletion,
    DueAfterCompletion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepetitionRule {
    /// ICS RRULE string, e.g. `FREQ=WEEKLY;INTERVAL=1`
    pub rule_string: String,
    /// Repetition method
    pub method: RepetitionMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInterval {
    /// Number of units between reviews
    pub steps: u32,
    /// Calendar unit: days, weeks, months or years
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatusFilter {
    Available,
    Remaining,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ProjectStatus {
    Active,
    OnHold,
    Done,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum FolderStatus {
    Active,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TagStatus {
    Active,
    OnHold,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum TagMode {
    Replace,
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Absolute,
    DueRelative,
}

// ===== argument records =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksArgs {
    /// Filter by completion status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Filter by flagged status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// Only show available (actionable) tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    /// Only show inbox tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_inbox: Option<bool>,
    /// Filter by project ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Filter by project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Filter by tag names (all must match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_names: Option<Vec<String>>,
    /// Tasks due after this ISO 8601 date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_after: Option<String>,
    /// Tasks due before this ISO 8601 date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_before: Option<String>,
    /// Tasks deferred after this ISO 8601 date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_after: Option<String>,
    /// Tasks deferred before this ISO 8601 date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_before: Option<String>,
    /// Case-insensitive text search in name and note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Filter by task status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatusFilter>,
    /// Maximum results, 1 to 1000 (default 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Skip this many results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdArgs {
    /// Object ID (OmniFocus primary key)
    pub id: String,
}

impl IdArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskArgs {
    /// The task ID
    pub id: String,
    /// Include the subtask tree (default false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_children: Option<bool>,
    /// Maximum subtask depth (0 = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskArgs {
    /// Task name
    pub name: String,
    /// Task note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Whether to flag the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// Defer date (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_date: Option<String>,
    /// Due date (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Estimated duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    /// Complete automatically when all children are completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_children: Option<bool>,
    /// Project ID to add the task to (default: inbox)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Project name to add the task to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Tag names to apply (created if missing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Repetition rule for recurring tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_rule: Option<RepetitionRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskArgs {
    /// The task ID to update
    pub id: String,
    /// New task name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New task note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// New flagged status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// New defer date (ISO 8601), or null to clear
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub defer_date: Option<Option<String>>,
    /// New due date (ISO 8601), or null to clear
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    /// New estimate in minutes, or null to clear
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<Option<u32>>,
    /// Whether subtasks must be completed in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential: Option<bool>,
    /// Complete automatically when all children are completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_children: Option<bool>,
    /// Repetition rule, or null to clear
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub repetition_rule: Option<Option<RepetitionRule>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveTasksArgs {
    /// Task IDs to move
    pub task_ids: Vec<String>,
    /// Destination project ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Destination project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Destination parent task ID (takes precedence over project)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateTasksArgs {
    /// Task IDs to duplicate
    pub task_ids: Vec<String>,
    /// Destination project ID (default: inbox)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Destination project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetTaskTagsArgs {
    /// The task ID
    pub task_id: String,
    /// Tag names
    pub tag_names: Vec<String>,
    /// replace: set exactly these tags; add: add to existing; remove: remove these
    pub mode: TagMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddTaskNotificationArgs {
    /// The task ID
    pub task_id: String,
    /// Notification type
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Fire date for absolute notifications (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_date: Option<String>,
    /// Offset in seconds from the due date for dueRelative notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_offset: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskRefArgs {
    /// The task ID
    pub task_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTaskNotificationArgs {
    /// The task ID
    pub task_id: String,
    /// The notification ID
    pub notification_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppendTaskNoteArgs {
    /// The task ID
    pub task_id: String,
    /// Text appended to the end of the note
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchTaskItem {
    /// Task name
    pub name: String,
    /// Task note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Whether to flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// Defer date (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_date: Option<String>,
    /// Due date (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Estimated duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    /// Complete automatically when all children are completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_children: Option<bool>,
    /// Tag names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Repetition rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_rule: Option<RepetitionRule>,
    /// Subtasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BatchTaskItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateTasksArgs {
    /// Tasks to create, optionally with nested children
    pub tasks: Vec<BatchTaskItem>,
    /// Destination project ID (default: inbox)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Destination project name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Destination parent task ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdsArgs {
    /// Task IDs; every ID is checked before any task is changed
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsArgs {
    /// Filter by project status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    /// Filter by containing folder ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// Filter by containing folder name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    /// Case-insensitive text search in name and note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Maximum results, 1 to 1000 (default 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Skip this many results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRefArgs {
    /// Project ID, or exact project name
    pub id_or_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectArgs {
    /// Project name
    pub name: String,
    /// Project note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Containing folder ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// Containing folder name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    /// Whether actions must be completed in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential: Option<bool>,
    /// Create as a single-action list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_action_list: Option<bool>,
    /// Complete automatically when all actions are completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_children: Option<bool>,
    /// Defer date (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_date: Option<String>,
    /// Due date (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Whether to flag the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// Tag names (created if missing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Review interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_interval: Option<ReviewInterval>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectArgs {
    /// The project ID
    pub id: String,
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    /// Whether actions must be completed in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential: Option<bool>,
    /// Single-action list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_action_list: Option<bool>,
    /// Complete automatically when all actions are completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_children: Option<bool>,
    /// New defer date (ISO 8601), or null to clear
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub defer_date: Option<Option<String>>,
    /// New due date (ISO 8601), or null to clear
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    /// New flagged status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    /// New review interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_interval: Option<ReviewInterval>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListFoldersArgs {
    /// Filter by folder status (default: all)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FolderStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderArgs {
    /// Folder name
    pub name: String,
    /// Parent folder ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    /// Parent folder name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFolderArgs {
    /// The folder ID
    pub id: String,
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FolderStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTagsArgs {
    /// Filter by tag status (default: all)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TagStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagArgs {
    /// Tag name
    pub name: String,
    /// Parent tag ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tag_id: Option<String>,
    /// Parent tag name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tag_name: Option<String>,
    /// Whether tasks with this tag can be next actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allows_next_action: Option<bool>,
    /// Initial status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TagStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagArgs {
    /// The tag ID
    pub id: String,
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether tasks with this tag can be next actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allows_next_action: Option<bool>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TagStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchArgs {
    /// Search query
    pub query: String,
    /// Maximum number of results, 1 to 200 (default 50)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

pub const DEFAULT_SEARCH_LIMIT: u32 = 50;
/// Largest page `list_tasks` and `list_projects` accept.
pub const MAX_LIST_LIMIT: u32 = 1000;
pub const MAX_SEARCH_LIMIT: u32 = 200;

// ===== result records =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub note: String,
    pub flagged: bool,
    pub completed: bool,
    pub dropped: bool,
    pub defer_date: Option<String>,
    pub due_date: Option<String>,
    pub completion_date: Option<String>,
    pub dropped_date: Option<String>,
    pub estimated_minutes: Option<u32>,
    pub containing_project_id: Option<String>,
    pub containing_project_name: Option<String>,
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
    pub has_children: bool,
    pub sequential: bool,
    #[serde(default)]
    pub completed_by_children: bool,
    pub in_inbox: bool,
    #[serde(default)]
    pub repetition_rule: Option<RepetitionRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTree {
    #[serde(flatten)]
    pub task: TaskRecord,
    #[serde(default)]
    pub children: Vec<TaskTree>,
}

/// `get_task` returns a flat record or a tree, depending on `includeChildren`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDetail {
    Tree(TaskTree),
    Flat(TaskRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub note: String,
    pub status: ProjectStatus,
    pub flagged: bool,
    pub completed: bool,
    pub defer_date: Option<String>,
    pub due_date: Option<String>,
    pub completion_date: Option<String>,
    pub estimated_minutes: Option<u32>,
    pub containing_folder_id: Option<String>,
    pub containing_folder_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
    pub sequential: bool,
    #[serde(default)]
    pub single_action_list: bool,
    pub task_count: u64,
    pub remaining_task_count: u64,
    pub last_review_date: Option<String>,
    pub next_review_date: Option<String>,
    pub review_interval: Option<ReviewInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    pub status: FolderStatus,
    pub parent_folder_id: Option<String>,
    pub project_count: u64,
    pub folder_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderTree {
    #[serde(flatten)]
    pub folder: FolderRecord,
    #[serde(default)]
    pub child_folders: Vec<FolderTree>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub id: String,
    pub name: String,
    pub status: TagStatus,
    pub parent_tag_id: Option<String>,
    pub allows_next_action: bool,
    pub available_task_count: u64,
    pub remaining_task_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNotificationRecord {
    pub id: String,
    pub kind: String,
    pub absolute_fire_date: Option<String>,
    pub relative_fire_offset: Option<f64>,
    pub next_fire_date: Option<String>,
    pub is_snoozed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub inbox_count: u64,
    pub project_count: u64,
    pub tag_count: u64,
    pub folder_count: u64,
    pub available_task_count: u64,
    pub due_soon_task_count: u64,
    pub overdue_task_count: u64,
    pub flagged_task_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCount {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub deleted: bool,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRemoved {
    pub removed: bool,
    pub task_id: String,
    pub notification_id: String,
}

// ===== validation =====

/// Argument checks run by the tool layer before anything reaches the client.
pub trait Validate {
    fn validate(&self) -> BridgeResult<()> {
        Ok(())
    }
}

/// Accepts RFC 3339 and the unzoned `YYYY-MM-DD[THH:MM[:SS]]` forms OmniJS
/// `new Date(...)` understands.
pub fn validate_date(field: &str, value: &str) -> BridgeResult<()> {
    let ok = DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    if ok {
        Ok(())
    } else {
        Err(BridgeError::invalid_argument(
            field,
            format!("'{value}' is not a valid ISO 8601 date"),
        ))
    }
}

fn validate_optional_date(field: &str, value: Option<&String>) -> BridgeResult<()> {
    match value {
        Some(value) => validate_date(field, value),
        None => Ok(()),
    }
}

fn validate_clearable_date(field: &str, value: &Option<Option<String>>) -> BridgeResult<()> {
    match value {
        Some(Some(value)) => validate_date(field, value),
        _ => Ok(()),
    }
}

fn require_non_empty(field: &str, value: &str) -> BridgeResult<()> {
    if value.trim().is_empty() {
        return Err(BridgeError::invalid_argument(field, "must not be empty"));
    }
    Ok(())
}

fn validate_limit(limit: Option<u32>, max: u32) -> BridgeResult<()> {
    match limit {
        Some(value) if value == 0 || value > max => Err(BridgeError::invalid_argument(
            "limit",
            format!("must be between 1 and {max}, got {value}"),
        )),
        _ => Ok(()),
    }
}

fn require_ids(field: &str, ids: &[String]) -> BridgeResult<()> {
    if ids.is_empty() {
        return Err(BridgeError::invalid_argument(field, "at least one ID is required"));
    }
    for id in ids {
        require_non_empty(field, id)?;
    }
    Ok(())
}

impl Validate for ListTasksArgs {
    fn validate(&self) -> BridgeResult<()> {
        validate_limit(self.limit, MAX_LIST_LIMIT)?;
        validate_optional_date("dueAfter", self.due_after.as_ref())?;
        validate_optional_date("dueBefore", self.due_before.as_ref())?;
        validate_optional_date("deferAfter", self.defer_after.as_ref())?;
        validate_optional_date("deferBefore", self.defer_before.as_ref())
    }
}

impl Validate for CreateTaskArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("name", &self.name)?;
        validate_optional_date("deferDate", self.defer_date.as_ref())?;
        validate_optional_date("dueDate", self.due_date.as_ref())
    }
}

impl Validate for UpdateTaskArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("id", &self.id)?;
        validate_clearable_date("deferDate", &self.defer_date)?;
        validate_clearable_date("dueDate", &self.due_date)
    }
}

impl Validate for AddTaskNotificationArgs {
    fn validate(&self) -> BridgeResult<()> {
        match self.kind {
            NotificationKind::Absolute => match &self.absolute_date {
                Some(date) => validate_date("absoluteDate", date),
                None => Err(BridgeError::invalid_argument(
                    "absoluteDate",
                    "required for absolute notifications",
                )),
            },
            NotificationKind::DueRelative => {
                if self.relative_offset.is_none() {
                    return Err(BridgeError::invalid_argument(
                        "relativeOffset",
                        "required for relative notifications",
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Validate for BatchTaskItem {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("name", &self.name)?;
        validate_optional_date("deferDate", self.defer_date.as_ref())?;
        validate_optional_date("dueDate", self.due_date.as_ref())?;
        for child in self.children.iter().flatten() {
            child.validate()?;
        }
        Ok(())
    }
}

impl Validate for BatchCreateTasksArgs {
    fn validate(&self) -> BridgeResult<()> {
        if self.tasks.is_empty() {
            return Err(BridgeError::invalid_argument("tasks", "at least one task is required"));
        }
        self.tasks.iter().try_for_each(Validate::validate)
    }
}

impl Validate for MoveTasksArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_ids("taskIds", &self.task_ids)
    }
}

impl Validate for DuplicateTasksArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_ids("taskIds", &self.task_ids)
    }
}

impl Validate for TaskIdsArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_ids("taskIds", &self.task_ids)
    }
}

impl Validate for CreateProjectArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("name", &self.name)?;
        validate_optional_date("deferDate", self.defer_date.as_ref())?;
        validate_optional_date("dueDate", self.due_date.as_ref())
    }
}

impl Validate for UpdateProjectArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("id", &self.id)?;
        validate_clearable_date("deferDate", &self.defer_date)?;
        validate_clearable_date("dueDate", &self.due_date)
    }
}

impl Validate for SearchArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("query", &self.query)?;
        validate_limit(self.limit, MAX_SEARCH_LIMIT)
    }
}

impl Validate for CreateFolderArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("name", &self.name)
    }
}

impl Validate for CreateTagArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("name", &self.name)
    }
}

impl Validate for IdArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("id", &self.id)
    }
}

impl Validate for GetTaskArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("id", &self.id)
    }
}

impl Validate for SetTaskTagsArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("taskId", &self.task_id)
    }
}

impl Validate for TaskRefArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("taskId", &self.task_id)
    }
}

impl Validate for RemoveTaskNotificationArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("taskId", &self.task_id)?;
        require_non_empty("notificationId", &self.notification_id)
    }
}

impl Validate for AppendTaskNoteArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("taskId", &self.task_id)
    }
}

impl Validate for ProjectRefArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("idOrName", &self.id_or_name)
    }
}

impl Validate for UpdateFolderArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("id", &self.id)
    }
}

impl Validate for UpdateTagArgs {
    fn validate(&self) -> BridgeResult<()> {
        require_non_empty("id", &self.id)
    }
}

impl Validate for ListProjectsArgs {
    fn validate(&self) -> BridgeResult<()> {
        validate_limit(self.limit, MAX_LIST_LIMIT)
    }
}
impl Validate for ListFoldersArgs {}
impl Validate for ListTagsArgs {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(None, true ; "absent")]
    #[test_case(Some(0), false ; "zero")]
    #[test_case(Some(1), true ; "one")]
    #[test_case(Some(1000), true ; "upper bound")]
    #[test_case(Some(1001), false ; "past upper bound")]
    fn list_limits_are_bounded(limit: Option<u32>, ok: bool) {
        let tasks = ListTasksArgs {
            limit,
            ..Default::default()
        };
        let projects = ListProjectsArgs {
            limit,
            ..Default::default()
        };
        assert_eq!(tasks.validate().is_ok(), ok);
        assert_eq!(projects.validate().is_ok(), ok);
        if !ok {
            let err = tasks.validate().unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
            assert!(err.to_string().contains("limit"));
        }
    }

    #[test_case(Some(0), false ; "zero")]
    #[test_case(Some(200), true ; "upper bound")]
    #[test_case(Some(201), false ; "past upper bound")]
    fn search_limit_is_bounded(limit: Option<u32>, ok: bool) {
        let args = SearchArgs {
            query: "bob".into(),
            limit,
        };
        assert_eq!(args.validate().is_ok(), ok);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let args = ListTasksArgs {
            flagged: Some(true),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&args).unwrap(), json!({"flagged": true}));
    }

    #[test]
    fn explicit_null_clears_field() {
        let args: UpdateTaskArgs =
            serde_json::from_value(json!({"id": "t1", "dueDate": null})).unwrap();
        assert_eq!(args.due_date, Some(None));
        assert_eq!(args.defer_date, None);
        assert_eq!(
            serde_json::to_value(&args).unwrap(),
            json!({"id": "t1", "dueDate": null})
        );
    }

    #[test]
    fn notification_kind_uses_type_key() {
        let args: AddTaskNotificationArgs = serde_json::from_value(json!({
            "taskId": "t1",
            "type": "dueRelative",
            "relativeOffset": -3600
        }))
        .unwrap();
        assert_eq!(args.kind, NotificationKind::DueRelative);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn dates_are_validated() {
        assert!(validate_date("dueDate", "2024-01-01T00:00:00Z").is_ok());
        assert!(validate_date("dueDate", "2024-01-01T09:30").is_ok());
        assert!(validate_date("dueDate", "2024-01-01").is_ok());
        let err = validate_date("dueDate", "next tuesday").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { ref field, .. } if field == "dueDate"));
    }

    #[test]
    fn absolute_notification_requires_date() {
        let args = AddTaskNotificationArgs {
            task_id: "t1".into(),
            kind: NotificationKind::Absolute,
            absolute_date: None,
            relative_offset: None,
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn batch_children_are_validated() {
        let args = BatchCreateTasksArgs {
            tasks: vec![BatchTaskItem {
                name: "parent".into(),
                children: Some(vec![BatchTaskItem {
                    name: "child".into(),
                    due_date: Some("soon".into()),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn task_tree_flattens_record() {
        let value = json!({
            "id": "t1", "name": "Parent", "note": "", "flagged": false,
            "completed": false, "dropped": false, "deferDate": null, "dueDate": null,
            "completionDate": null, "droppedDate": null, "estimatedMinutes": null,
            "containingProjectId": null, "containingProjectName": null,
            "parentTaskId": null, "tags": [], "hasChildren": true, "sequential": false,
            "completedByChildren": false, "inInbox": true, "repetitionRule": null,
            "children": []
        });
        let detail: TaskDetail = serde_json::from_value(value).unwrap();
        assert!(matches!(detail, TaskDetail::Tree(ref tree) if tree.task.id == "t1"));
    }
}
