//! OmniFocus client: cache-aside reads, invalidating writes.
//!
//! This is the only place that knows cache key shapes, per-domain TTLs and
//! which cached domains each write can make stale. Errors from the executor
//! pass through unchanged and never touch the cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::{BridgeConfig, CacheTtls};
use crate::error::{BridgeError, BridgeResult};
use crate::omnifocus::cache::ResponseCache;
use crate::omnifocus::executor::{decode_json, AutomationTarget, Executor};
use crate::omnifocus::models::*;
use crate::omnifocus::script::ScriptPayload;
use crate::omnifocus::scripts::{database, folders, projects, tags, tasks};

/// Top-level cache namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheDomain {
    Tasks,
    Projects,
    Folders,
    Tags,
    Database,
}

impl CacheDomain {
    pub const ALL: [CacheDomain; 5] = [
        CacheDomain::Tasks,
        CacheDomain::Projects,
        CacheDomain::Folders,
        CacheDomain::Tags,
        CacheDomain::Database,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            CacheDomain::Tasks => "tasks:",
            CacheDomain::Projects => "projects:",
            CacheDomain::Folders => "folders:",
            CacheDomain::Tags => "tags:",
            CacheDomain::Database => "database:",
        }
    }
}

/// Every operation that changes the OmniFocus database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    CreateTask,
    BatchCreateTasks,
    UpdateTask,
    CompleteTask,
    UncompleteTask,
    DropTask,
    DeleteTask,
    MoveTasks,
    DuplicateTasks,
    BatchDeleteTasks,
    BatchCompleteTasks,
    SetTaskTags,
    AddTaskNotification,
    RemoveTaskNotification,
    AppendTaskNote,
    ConvertTaskToProject,
    CreateProject,
    UpdateProject,
    CompleteProject,
    DeleteProject,
    MarkReviewed,
    CreateFolder,
    UpdateFolder,
    DeleteFolder,
    CreateTag,
    UpdateTag,
    DeleteTag,
}

impl Mutation {
    /// Cached domains a successful run of this mutation makes stale.
    pub fn invalidates(self) -> &'static [CacheDomain] {
        use CacheDomain::*;
        match self {
            // new tags may be created on the fly
            Mutation::CreateTask | Mutation::BatchCreateTasks => &[Tasks, Projects, Tags, Database],
            Mutation::UpdateTask
            | Mutation::CompleteTask
            | Mutation::UncompleteTask
            | Mutation::DropTask
            | Mutation::DeleteTask
            | Mutation::MoveTasks
            | Mutation::DuplicateTasks
            | Mutation::BatchDeleteTasks
            | Mutation::BatchCompleteTasks => &[Tasks, Projects, Database],
            Mutation::SetTaskTags => &[Tags, Tasks],
            Mutation::AddTaskNotification
            | Mutation::RemoveTaskNotification
            | Mutation::AppendTaskNote => &[Tasks],
            Mutation::ConvertTaskToProject => &[Tasks, Projects, Folders, Database],
            Mutation::CreateProject
            | Mutation::UpdateProject
            | Mutation::CompleteProject
            | Mutation::DeleteProject => &[Projects, Tasks, Folders, Database],
            Mutation::MarkReviewed => &[Projects],
            Mutation::CreateFolder | Mutation::UpdateFolder | Mutation::DeleteFolder => {
                &[Folders, Projects, Database]
            }
            Mutation::CreateTag | Mutation::UpdateTag | Mutation::DeleteTag => &[Tags, Tasks, Database],
        }
    }
}

/// `"{prefix}{operation}:{args as JSON}"`
pub fn cache_key<A: Serialize + ?Sized>(
    domain: CacheDomain,
    operation: &str,
    args: &A,
) -> BridgeResult<String> {
    let encoded = serde_json::to_string(args)
        .map_err(|e| BridgeError::invalid_argument("args", e.to_string()))?;
    Ok(format!("{}{}:{}", domain.prefix(), operation, encoded))
}

/// Key for reads that take no arguments, e.g. `database:summary`.
pub fn bare_cache_key(domain: CacheDomain, operation: &str) -> String {
    format!("{}{}", domain.prefix(), operation)
}

pub struct OmniFocusClient {
    executor: Executor,
    cache: ResponseCache<Value>,
    ttls: CacheTtls,
}

impl OmniFocusClient {
    pub fn new(executor: Executor, ttls: CacheTtls) -> Self {
        Self {
            executor,
            cache: ResponseCache::new(),
            ttls,
        }
    }

    /// Client backed by `osascript`.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(Executor::osascript(config.executor.clone()), config.cache.clone())
    }

    /// Client backed by an arbitrary automation target.
    pub fn with_target(target: Arc<dyn AutomationTarget>, config: &BridgeConfig) -> Self {
        Self::new(Executor::new(target, config.executor.clone()), config.cache.clone())
    }

    pub fn cache(&self) -> &ResponseCache<Value> {
        &self.cache
    }

    /// Drop cached entries under `prefix`, or everything when `None`.
    pub fn invalidate_cache(&self, prefix: Option<&str>) -> usize {
        match prefix {
            Some(prefix) => {
                let removed = self.cache.invalidate_prefix(prefix);
                debug!(prefix, removed, "Cache invalidated");
                removed
            }
            None => {
                let removed = self.cache.len();
                self.cache.invalidate_all();
                debug!(removed, "Cache cleared");
                removed
            }
        }
    }

    async fn cached<T, F>(&self, domain: CacheDomain, key: String, build: F) -> BridgeResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> BridgeResult<ScriptPayload>,
    {
        if let Some(value) = self.cache.get(&key) {
            trace!(key = %key, "Cache hit");
            return serde_json::from_value(value.clone())
                .map_err(|e| BridgeError::parse(e.to_string(), &value.to_string()));
        }
        debug!(key = %key, "Cache miss");

        let payload = build()?;
        let raw = self.executor.run(&payload).await?;
        let value: Value = decode_json(&raw)?;
        let typed = serde_json::from_value(value.clone())
            .map_err(|e| BridgeError::parse(e.to_string(), &raw))?;
        self.cache.set(key, value, self.ttls.for_domain(domain));
        Ok(typed)
    }

    async fn uncached<T: DeserializeOwned>(&self, payload: BridgeResult<ScriptPayload>) -> BridgeResult<T> {
        self.executor.run_json(&payload?).await
    }

    /// Invalidation follows a successful run even if decoding then fails,
    /// since OmniFocus has already changed.
    async fn write<T: DeserializeOwned>(
        &self,
        mutation: Mutation,
        payload: BridgeResult<ScriptPayload>,
    ) -> BridgeResult<T> {
        let raw = self.executor.run(&payload?).await?;
        for domain in mutation.invalidates() {
            let removed = self.cache.invalidate_prefix(domain.prefix());
            trace!(?mutation, prefix = domain.prefix(), removed, "Invalidated after write");
        }
        decode_json(&raw)
    }

    // ===== tasks =====

    pub async fn list_tasks(&self, args: &ListTasksArgs) -> BridgeResult<Vec<TaskRecord>> {
        let key = cache_key(CacheDomain::Tasks, "list", args)?;
        self.cached(CacheDomain::Tasks, key, || tasks::list_tasks(args)).await
    }

    pub async fn get_task_count(&self, args: &ListTasksArgs) -> BridgeResult<TaskCount> {
        let key = cache_key(CacheDomain::Tasks, "count", args)?;
        self.cached(CacheDomain::Tasks, key, || tasks::get_task_count(args)).await
    }

    pub async fn get_task(&self, args: &GetTaskArgs) -> BridgeResult<TaskDetail> {
        let key = cache_key(CacheDomain::Tasks, "get", args)?;
        self.cached(CacheDomain::Tasks, key, || tasks::get_task(args)).await
    }

    /// Available inbox tasks
    pub async fn get_inbox_tasks(&self) -> BridgeResult<Vec<TaskRecord>> {
        self.list_tasks(&ListTasksArgs {
            in_inbox: Some(true),
            task_status: Some(TaskStatusFilter::Available),
            ..Default::default()
        })
        .await
    }

    /// Available flagged tasks
    pub async fn get_flagged_tasks(&self) -> BridgeResult<Vec<TaskRecord>> {
        self.list_tasks(&ListTasksArgs {
            flagged: Some(true),
            task_status: Some(TaskStatusFilter::Available),
            ..Default::default()
        })
        .await
    }

    pub async fn list_task_notifications(
        &self,
        args: &TaskRefArgs,
    ) -> BridgeResult<Vec<TaskNotificationRecord>> {
        let key = cache_key(CacheDomain::Tasks, "notifications", args)?;
        self.cached(CacheDomain::Tasks, key, || tasks::list_task_notifications(args))
            .await
    }

    /// Not cached: the answer depends on the current day.
    pub async fn get_today_completed_tasks(&self) -> BridgeResult<Vec<TaskRecord>> {
        self.uncached(Ok(tasks::get_today_completed_tasks())).await
    }

    pub async fn create_task(&self, args: &CreateTaskArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::CreateTask, tasks::create_task(args)).await
    }

    pub async fn update_task(&self, args: &UpdateTaskArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::UpdateTask, tasks::update_task(args)).await
    }

    pub async fn complete_task(&self, args: &IdArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::CompleteTask, tasks::complete_task(args)).await
    }

    pub async fn uncomplete_task(&self, args: &IdArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::UncompleteTask, tasks::uncomplete_task(args)).await
    }

    pub async fn drop_task(&self, args: &IdArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::DropTask, tasks::drop_task(args)).await
    }

    pub async fn delete_task(&self, args: &IdArgs) -> BridgeResult<DeletedRecord> {
        self.write(Mutation::DeleteTask, tasks::delete_task(args)).await
    }

    pub async fn move_tasks(&self, args: &MoveTasksArgs) -> BridgeResult<Vec<TaskRecord>> {
        self.write(Mutation::MoveTasks, tasks::move_tasks(args)).await
    }

    pub async fn duplicate_tasks(&self, args: &DuplicateTasksArgs) -> BridgeResult<Vec<TaskRecord>> {
        self.write(Mutation::DuplicateTasks, tasks::duplicate_tasks(args)).await
    }

    pub async fn set_task_tags(&self, args: &SetTaskTagsArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::SetTaskTags, tasks::set_task_tags(args)).await
    }

    pub async fn add_task_notification(&self, args: &AddTaskNotificationArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::AddTaskNotification, tasks::add_task_notification(args))
            .await
    }

    pub async fn remove_task_notification(
        &self,
        args: &RemoveTaskNotificationArgs,
    ) -> BridgeResult<NotificationRemoved> {
        self.write(Mutation::RemoveTaskNotification, tasks::remove_task_notification(args))
            .await
    }

    pub async fn append_task_note(&self, args: &AppendTaskNoteArgs) -> BridgeResult<TaskRecord> {
        self.write(Mutation::AppendTaskNote, tasks::append_task_note(args)).await
    }

    pub async fn convert_task_to_project(&self, args: &TaskRefArgs) -> BridgeResult<ProjectRecord> {
        self.write(Mutation::ConvertTaskToProject, tasks::convert_task_to_project(args))
            .await
    }

    pub async fn batch_create_tasks(&self, args: &BatchCreateTasksArgs) -> BridgeResult<Vec<TaskRecord>> {
        self.write(Mutation::BatchCreateTasks, tasks::batch_create_tasks(args))
            .await
    }

    pub async fn batch_delete_tasks(&self, args: &TaskIdsArgs) -> BridgeResult<Vec<DeletedRecord>> {
        self.write(Mutation::BatchDeleteTasks, tasks::batch_delete_tasks(args))
            .await
    }

    pub async fn batch_complete_tasks(&self, args: &TaskIdsArgs) -> BridgeResult<Vec<TaskRecord>> {
        self.write(Mutation::BatchCompleteTasks, tasks::batch_complete_tasks(args))
            .await
    }

    // ===== projects =====

    pub async fn list_projects(&self, args: &ListProjectsArgs) -> BridgeResult<Vec<ProjectRecord>> {
        let key = cache_key(CacheDomain::Projects, "list", args)?;
        self.cached(CacheDomain::Projects, key, || projects::list_projects(args))
            .await
    }

    pub async fn get_project(&self, args: &ProjectRefArgs) -> BridgeResult<ProjectRecord> {
        let key = cache_key(CacheDomain::Projects, "get", args)?;
        self.cached(CacheDomain::Projects, key, || projects::get_project(args))
            .await
    }

    /// Not cached: projects become due for review as time passes.
    pub async fn get_review_queue(&self) -> BridgeResult<Vec<ProjectRecord>> {
        self.uncached(Ok(projects::get_review_queue())).await
    }

    pub async fn create_project(&self, args: &CreateProjectArgs) -> BridgeResult<ProjectRecord> {
        self.write(Mutation::CreateProject, projects::create_project(args))
            .await
    }

    pub async fn update_project(&self, args: &UpdateProjectArgs) -> BridgeResult<ProjectRecord> {
        self.write(Mutation::UpdateProject, projects::update_project(args))
            .await
    }

    pub async fn complete_project(&self, args: &IdArgs) -> BridgeResult<ProjectRecord> {
        self.write(Mutation::CompleteProject, projects::complete_project(args))
            .await
    }

    pub async fn delete_project(&self, args: &IdArgs) -> BridgeResult<DeletedRecord> {
        self.write(Mutation::DeleteProject, projects::delete_project(args))
            .await
    }

    pub async fn mark_reviewed(&self, args: &IdArgs) -> BridgeResult<ProjectRecord> {
        self.write(Mutation::MarkReviewed, projects::mark_reviewed(args)).await
    }

    // ===== folders =====

    pub async fn list_folders(&self, args: &ListFoldersArgs) -> BridgeResult<Vec<FolderRecord>> {
        let key = cache_key(CacheDomain::Folders, "list", args)?;
        self.cached(CacheDomain::Folders, key, || folders::list_folders(args))
            .await
    }

    pub async fn get_folder(&self, args: &IdArgs) -> BridgeResult<FolderTree> {
        let key = cache_key(CacheDomain::Folders, "get", args)?;
        self.cached(CacheDomain::Folders, key, || folders::get_folder(args)).await
    }

    pub async fn create_folder(&self, args: &CreateFolderArgs) -> BridgeResult<FolderRecord> {
        self.write(Mutation::CreateFolder, folders::create_folder(args)).await
    }

    pub async fn update_folder(&self, args: &UpdateFolderArgs) -> BridgeResult<FolderRecord> {
        self.write(Mutation::UpdateFolder, folders::update_folder(args)).await
    }

    pub async fn delete_folder(&self, args: &IdArgs) -> BridgeResult<DeletedRecord> {
        self.write(Mutation::DeleteFolder, folders::delete_folder(args)).await
    }

    // ===== tags =====

    pub async fn list_tags(&self, args: &ListTagsArgs) -> BridgeResult<Vec<TagRecord>> {
        let key = cache_key(CacheDomain::Tags, "list", args)?;
        self.cached(CacheDomain::Tags, key, || tags::list_tags(args)).await
    }

    pub async fn get_tag(&self, args: &IdArgs) -> BridgeResult<TagRecord> {
        let key = cache_key(CacheDomain::Tags, "get", args)?;
        self.cached(CacheDomain::Tags, key, || tags::get_tag(args)).await
    }

    pub async fn create_tag(&self, args: &CreateTagArgs) -> BridgeResult<TagRecord> {
        self.write(Mutation::CreateTag, tags::create_tag(args)).await
    }

    pub async fn update_tag(&self, args: &UpdateTagArgs) -> BridgeResult<TagRecord> {
        self.write(Mutation::UpdateTag, tags::update_tag(args)).await
    }

    pub async fn delete_tag(&self, args: &IdArgs) -> BridgeResult<DeletedRecord> {
        self.write(Mutation::DeleteTag, tags::delete_tag(args)).await
    }

    // ===== database =====

    pub async fn get_database_summary(&self) -> BridgeResult<DatabaseSummary> {
        let key = bare_cache_key(CacheDomain::Database, "summary");
        self.cached(CacheDomain::Database, key, || Ok(database::database_summary()))
            .await
    }

    /// Not cached: results cut across every domain.
    pub async fn search(&self, args: &SearchArgs) -> BridgeResult<Vec<SearchHit>> {
        self.uncached(database::search(args)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_embed_prefix_operation_and_args() {
        let args = ListTasksArgs {
            flagged: Some(true),
            ..Default::default()
        };
        assert_eq!(
            cache_key(CacheDomain::Tasks, "list", &args).unwrap(),
            "tasks:list:{\"flagged\":true}"
        );
        assert_eq!(bare_cache_key(CacheDomain::Database, "summary"), "database:summary");
    }

    #[test]
    fn field_order_in_request_does_not_split_keys() {
        let a: ListTasksArgs = serde_json::from_str(r#"{"flagged":true,"limit":5}"#).unwrap();
        let b: ListTasksArgs = serde_json::from_str(r#"{"limit":5,"flagged":true}"#).unwrap();
        assert_eq!(
            cache_key(CacheDomain::Tasks, "list", &a).unwrap(),
            cache_key(CacheDomain::Tasks, "list", &b).unwrap()
        );
    }

    #[test]
    fn retagging_spares_database() {
        let domains = Mutation::SetTaskTags.invalidates();
        assert!(domains.contains(&CacheDomain::Tags));
        assert!(domains.contains(&CacheDomain::Tasks));
        assert!(!domains.contains(&CacheDomain::Database));
    }

    #[test]
    fn project_writes_reach_folders_and_database() {
        for mutation in [
            Mutation::CreateProject,
            Mutation::UpdateProject,
            Mutation::CompleteProject,
            Mutation::DeleteProject,
        ] {
            let domains = mutation.invalidates();
            assert!(domains.contains(&CacheDomain::Folders), "{mutation:?}");
            assert!(domains.contains(&CacheDomain::Database), "{mutation:?}");
        }
    }

    #[test]
    fn prefixes_do_not_overlap() {
        for a in CacheDomain::ALL {
            for b in CacheDomain::ALL {
                if a != b {
                    assert!(!a.prefix().starts_with(b.prefix()));
                }
            }
        }
    }
}
