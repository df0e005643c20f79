//! Task scripts

use crate::error::BridgeResult;
use crate::omnifocus::models::{
    AddTaskNotificationArgs, AppendTaskNoteArgs, BatchCreateTasksArgs, CreateTaskArgs,
    DuplicateTasksArgs, GetTaskArgs, IdArgs, ListTasksArgs, MoveTasksArgs,
    RemoveTaskNotificationArgs, SetTaskTagsArgs, TaskIdsArgs, TaskRefArgs, UpdateTaskArgs,
};
use crate::omnifocus::script::{Helper, ScriptBuilder, ScriptPayload};

pub fn list_tasks(args: &ListTasksArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::SerializeTask, Helper::TaskFilter])
        .body(
            r#"
var offset = args.offset || 0;
var limit = args.limit || 100;
var tasks = filterTasks(args).slice(offset, offset + limit);
return JSON.stringify(tasks.map(serializeTask));
"#,
        )
        .build())
}

/// Same filter as [`list_tasks`] without serializing any task.
pub fn get_task_count(args: &ListTasksArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::TaskFilter)
        .body("return JSON.stringify({ count: filterTasks(args).length });")
        .build())
}

pub fn get_task(args: &GetTaskArgs) -> BridgeResult<ScriptPayload> {
    let builder = ScriptBuilder::new().args(args)?.helper(Helper::ById);
    let builder = if args.include_children.unwrap_or(false) {
        builder.helper(Helper::SerializeTaskWithChildren).body(
            r#"
var task = byId(flattenedTasks, args.id);
if (!task) throw new Error("Task not found: " + args.id);
return JSON.stringify(serializeTaskWithChildren(task, 0, args.maxDepth || 0));
"#,
        )
    } else {
        builder.helper(Helper::SerializeTask).body(
            r#"
var task = byId(flattenedTasks, args.id);
if (!task) throw new Error("Task not found: " + args.id);
return JSON.stringify(serializeTask(task));
"#,
        )
    };
    Ok(builder.build())
}

pub fn create_task(args: &CreateTaskArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[
            Helper::FindProject,
            Helper::FindOrCreateTag,
            Helper::RepetitionRule,
            Helper::SerializeTask,
        ])
        .body(
            r#"
var project = findProject(args.projectId, args.projectName);
var task = new Task(args.name, project ? project.ending : inbox.ending);
if (args.note !== undefined) task.note = args.note;
if (args.flagged !== undefined) task.flagged = args.flagged;
if (args.deferDate) task.deferDate = new Date(args.deferDate);
if (args.dueDate) task.dueDate = new Date(args.dueDate);
if (args.estimatedMinutes !== undefined) task.estimatedMinutes = args.estimatedMinutes;
if (args.completedByChildren !== undefined) task.completedByChildren = args.completedByChildren;
if (args.repetitionRule) task.repetitionRule = repetitionRule(args.repetitionRule);
(args.tags || []).forEach(function(name) { task.addTag(findOrCreateTag(name)); });
return JSON.stringify(serializeTask(task));
"#,
        )
        .build())
}

/// Fields absent from `args` are left untouched; explicit nulls clear.
pub fn update_task(args: &UpdateTaskArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::RepetitionRule, Helper::SerializeTask])
        .body(
            r#"
var task = byId(flattenedTasks, args.id);
if (!task) throw new Error("Task not found: " + args.id);
if (args.name !== undefined) task.name = args.name;
if (args.note !== undefined) task.note = args.note;
if (args.flagged !== undefined) task.flagged = args.flagged;
if (args.deferDate !== undefined) task.deferDate = args.deferDate ? new Date(args.deferDate) : null;
if (args.dueDate !== undefined) task.dueDate = args.dueDate ? new Date(args.dueDate) : null;
if (args.estimatedMinutes !== undefined) task.estimatedMinutes = args.estimatedMinutes;
if (args.sequential !== undefined) task.sequential = args.sequential;
if (args.completedByChildren !== undefined) task.completedByChildren = args.completedByChildren;
if (args.repetitionRule !== undefined) {
  task.repetitionRule = args.repetitionRule === null ? null : repetitionRule(args.repetitionRule);
}
return JSON.stringify(serializeTask(task));
"#,
        )
        .build())
}

fn single_task_action(args: &IdArgs, action: &str) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeTask])
        .body(format!(
            r#"
var task = byId(flattenedTasks, args.id);
if (!task) throw new Error("Task not found: " + args.id);
{action}
return JSON.stringify(serializeTask(task));
"#
        ))
        .build())
}

pub fn complete_task(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    single_task_action(args, "task.markComplete();")
}

pub fn uncomplete_task(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    single_task_action(args, "task.markIncomplete();")
}

pub fn drop_task(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    single_task_action(args, "task.drop(false);")
}

pub fn delete_task(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::ById)
        .body(
            r#"
var task = byId(flattenedTasks, args.id);
if (!task) throw new Error("Task not found: " + args.id);
deleteObject(task);
return JSON.stringify({ deleted: true, id: args.id });
"#,
        )
        .build())
}

pub fn move_tasks(args: &MoveTasksArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::FindProject, Helper::SerializeTask])
        .body(
            r#"
var tasks = args.taskIds.map(function(id) {
  var t = byId(flattenedTasks, id);
  if (!t) throw new Error("Task not found: " + id);
  return t;
});
var destination;
if (args.parentTaskId) {
  var parent = byId(flattenedTasks, args.parentTaskId);
  if (!parent) throw new Error("Parent task not found: " + args.parentTaskId);
  destination = parent.ending;
} else {
  var project = findProject(args.projectId, args.projectName);
  destination = project ? project.ending : inbox.ending;
}
moveTasks(tasks, destination);
return JSON.stringify(tasks.map(serializeTask));
"#,
        )
        .build())
}

pub fn duplicate_tasks(args: &DuplicateTasksArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::FindProject, Helper::SerializeTask])
        .body(
            r#"
var tasks = args.taskIds.map(function(id) {
  var t = byId(flattenedTasks, id);
  if (!t) throw new Error("Task not found: " + id);
  return t;
});
var project = findProject(args.projectId, args.projectName);
var copies = duplicateTasks(tasks, project ? project.ending : inbox.ending);
return JSON.stringify(copies.map(serializeTask));
"#,
        )
        .build())
}

/// `remove` only looks tags up; it never creates one.
pub fn set_task_tags(args: &SetTaskTagsArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::FindOrCreateTag, Helper::SerializeTask])
        .body(
            r#"
var task = byId(flattenedTasks, args.taskId);
if (!task) throw new Error("Task not found: " + args.taskId);
if (args.mode === "replace") {
  task.clearTags();
  args.tagNames.forEach(function(name) { task.addTag(findOrCreateTag(name)); });
} else if (args.mode === "add") {
  args.tagNames.forEach(function(name) { task.addTag(findOrCreateTag(name)); });
} else if (args.mode === "remove") {
  args.tagNames.forEach(function(name) {
    var existing = findTag(name);
    if (existing) task.removeTag(existing);
  });
}
return JSON.stringify(serializeTask(task));
"#,
        )
        .build())
}

pub fn add_task_notification(args: &AddTaskNotificationArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeTask])
        .body(
            r#"
var task = byId(flattenedTasks, args.taskId);
if (!task) throw new Error("Task not found: " + args.taskId);
if (args.type === "absolute") {
  if (!args.absoluteDate) throw new Error("absoluteDate is required for absolute notifications");
  task.addNotification(new Date(args.absoluteDate));
} else if (args.type === "dueRelative") {
  if (args.relativeOffset === undefined) throw new Error("relativeOffset is required for dueRelative notifications");
  if (!task.effectiveDueDate) throw new Error("Task has no due date: " + args.taskId);
  task.addNotification(args.relativeOffset);
}
return JSON.stringify(serializeTask(task));
"#,
        )
        .build())
}

pub fn list_task_notifications(args: &TaskRefArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeTaskNotification])
        .body(
            r#"
var task = byId(flattenedTasks, args.taskId);
if (!task) throw new Error("Task not found: " + args.taskId);
return JSON.stringify(task.notifications.map(serializeTaskNotification));
"#,
        )
        .build())
}

pub fn remove_task_notification(args: &RemoveTaskNotificationArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::ById)
        .body(
            r#"
var task = byId(flattenedTasks, args.taskId);
if (!task) throw new Error("Task not found: " + args.taskId);
var notification = byId(task.notifications, args.notificationId);
if (!notification) throw new Error("Notification not found: " + args.notificationId);
task.removeNotification(notification);
return JSON.stringify({ removed: true, taskId: args.taskId, notificationId: args.notificationId });
"#,
        )
        .build())
}

pub fn append_task_note(args: &AppendTaskNoteArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeTask])
        .body(
            r#"
var task = byId(flattenedTasks, args.taskId);
if (!task) throw new Error("Task not found: " + args.taskId);
task.appendStringToNote(args.text);
return JSON.stringify(serializeTask(task));
"#,
        )
        .build())
}

pub fn convert_task_to_project(args: &TaskRefArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeProject])
        .body(
            r#"
var task = byId(flattenedTasks, args.taskId);
if (!task) throw new Error("Task not found: " + args.taskId);
var converted = convertTasksToProjects([task], library.ending);
if (converted.length === 0) throw new Error("Failed to convert task to project: " + args.taskId);
return JSON.stringify(serializeProject(converted[0]));
"#,
        )
        .build())
}

/// Tasks completed since local midnight.
pub fn get_today_completed_tasks() -> ScriptPayload {
    ScriptBuilder::new()
        .helper(Helper::SerializeTask)
        .body(
            r#"
var now = new Date();
var startOfDay = new Date(now.getFullYear(), now.getMonth(), now.getDate());
var done = flattenedTasks.filter(function(t) {
  return t.taskStatus === Task.Status.Completed && t.completionDate && t.completionDate >= startOfDay;
});
return JSON.stringify(done.map(serializeTask));
"#,
        )
        .build()
}

pub fn batch_create_tasks(args: &BatchCreateTasksArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[
            Helper::FindProject,
            Helper::FindOrCreateTag,
            Helper::RepetitionRule,
            Helper::SerializeTask,
        ])
        .body(
            r#"
var destination;
if (args.parentTaskId) {
  var parent = byId(flattenedTasks, args.parentTaskId);
  if (!parent) throw new Error("Parent task not found: " + args.parentTaskId);
  destination = parent.ending;
} else {
  var project = findProject(args.projectId, args.projectName);
  destination = project ? project.ending : inbox.ending;
}
function createItem(item, location) {
  var task = new Task(item.name, location);
  if (item.note !== undefined) task.note = item.note;
  if (item.flagged !== undefined) task.flagged = item.flagged;
  if (item.deferDate) task.deferDate = new Date(item.deferDate);
  if (item.dueDate) task.dueDate = new Date(item.dueDate);
  if (item.estimatedMinutes !== undefined) task.estimatedMinutes = item.estimatedMinutes;
  if (item.completedByChildren !== undefined) task.completedByChildren = item.completedByChildren;
  if (item.repetitionRule) task.repetitionRule = repetitionRule(item.repetitionRule);
  (item.tags || []).forEach(function(name) { task.addTag(findOrCreateTag(name)); });
  (item.children || []).forEach(function(child) { createItem(child, task.ending); });
  return task;
}
var created = args.tasks.map(function(item) { return createItem(item, destination); });
return JSON.stringify(created.map(serializeTask));
"#,
        )
        .build())
}

/// Resolves every id before deleting anything.
pub fn batch_delete_tasks(args: &TaskIdsArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::ById)
        .body(
            r#"
var targets = args.taskIds.map(function(id) {
  var t = byId(flattenedTasks, id);
  if (!t) throw new Error("Task not found: " + id);
  return t;
});
var results = targets.map(function(task, i) {
  deleteObject(task);
  return { deleted: true, id: args.taskIds[i] };
});
return JSON.stringify(results);
"#,
        )
        .build())
}

/// Resolves every id before completing anything.
pub fn batch_complete_tasks(args: &TaskIdsArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeTask])
        .body(
            r#"
var targets = args.taskIds.map(function(id) {
  var t = byId(flattenedTasks, id);
  if (!t) throw new Error("Task not found: " + id);
  return t;
});
var results = targets.map(function(task) {
  task.markComplete();
  return serializeTask(task);
});
return JSON.stringify(results);
"#,
        )
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omnifocus::models::TagMode;

    #[test]
    fn count_script_does_not_serialize_tasks() {
        let payload = get_task_count(&ListTasksArgs::default()).unwrap();
        assert!(payload.as_str().contains("function filterTasks("));
        assert!(!payload.as_str().contains("serializeTask"));
    }

    #[test]
    fn list_paginates_with_default_limit() {
        let payload = list_tasks(&ListTasksArgs::default()).unwrap();
        assert!(payload.as_str().contains("args.limit || 100"));
        assert!(payload.as_str().contains("(t.note || \"\")"));
    }

    #[test]
    fn subtree_requested_only_when_asked() {
        let flat = get_task(&GetTaskArgs {
            id: "a".into(),
            include_children: None,
            max_depth: None,
        })
        .unwrap();
        assert!(!flat.as_str().contains("serializeTaskWithChildren"));

        let tree = get_task(&GetTaskArgs {
            id: "a".into(),
            include_children: Some(true),
            max_depth: Some(2),
        })
        .unwrap();
        assert!(tree.as_str().contains("serializeTaskWithChildren(task, 0, args.maxDepth || 0)"));
    }

    #[test]
    fn remove_mode_never_creates_tags() {
        let payload = set_task_tags(&SetTaskTagsArgs {
            task_id: "t".into(),
            tag_names: vec!["x".into()],
            mode: TagMode::Remove,
        })
        .unwrap();
        let text = payload.as_str();
        let remove_branch = &text[text.find("args.mode === \"remove\"").unwrap()..];
        assert!(!remove_branch.contains("findOrCreateTag"));
        assert!(remove_branch.contains("findTag(name)"));
    }

    #[test]
    fn batch_ops_resolve_all_ids_before_mutating() {
        let args = TaskIdsArgs {
            task_ids: vec!["a".into(), "b".into()],
        };
        for payload in [batch_delete_tasks(&args).unwrap(), batch_complete_tasks(&args).unwrap()] {
            let text = payload.as_str();
            let lookup = text.find("throw new Error(\"Task not found: \" + id)").unwrap();
            let mutate = text
                .find("deleteObject(task)")
                .or_else(|| text.find("task.markComplete()"))
                .unwrap();
            assert!(lookup < mutate);
        }
    }

    #[test]
    fn single_actions_share_lookup() {
        let args = IdArgs::new("abc");
        assert!(complete_task(&args).unwrap().as_str().contains("task.markComplete();"));
        assert!(uncomplete_task(&args).unwrap().as_str().contains("task.markIncomplete();"));
        assert!(drop_task(&args).unwrap().as_str().contains("task.drop(false);"));
    }

    #[test]
    fn today_completed_takes_no_args() {
        assert!(!get_today_completed_tasks().as_str().contains("var args"));
    }
}
