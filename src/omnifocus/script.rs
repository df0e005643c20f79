//! OmniJS script assembly
//!
//! Every payload has the same shape:
//!
//! ```text
//! (() => {
//!   var args = JSON.parse("<args JSON, encoded again as a string literal>");
//!   <helper functions, dependencies first, each once>
//!   <operation body, ending in `return JSON.stringify(...)`>
//! })()
//! ```
//!
//! Argument values only ever reach the script through the `JSON.parse`
//! literal, so no value can change the structure of the script.

use serde::Serialize;
use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// A named OmniJS fragment that operation bodies can rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    IsoDate,
    ById,
    FindProject,
    FindFolder,
    SerializeTask,
    SerializeTaskWithChildren,
    SerializeProject,
    SerializeFolder,
    SerializeFolderWithChildren,
    SerializeTag,
    SerializeTaskNotification,
    FindOrCreateTag,
    TaskFilter,
    RepetitionRule,
    ProjectStatus,
    TagStatus,
}

impl Helper {
    /// Helpers that must appear before this one.
    pub fn dependencies(self) -> &'static [Helper] {
        match self {
            Helper::IsoDate
            | Helper::ById
            | Helper::TaskFilter
            | Helper::FindOrCreateTag
            | Helper::RepetitionRule
            | Helper::ProjectStatus
            | Helper::TagStatus => &[],
            Helper::FindProject | Helper::FindFolder => &[Helper::ById],
            Helper::SerializeTask => &[Helper::IsoDate],
            Helper::SerializeTaskWithChildren => &[Helper::SerializeTask],
            Helper::SerializeProject => &[Helper::IsoDate],
            Helper::SerializeFolder | Helper::SerializeTag => &[],
            Helper::SerializeFolderWithChildren => {
                &[Helper::SerializeFolder, Helper::SerializeProject]
            }
            Helper::SerializeTaskNotification => &[Helper::IsoDate],
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Helper::IsoDate => ISO_DATE,
            Helper::ById => BY_ID,
            Helper::FindProject => FIND_PROJECT,
            Helper::FindFolder => FIND_FOLDER,
            Helper::SerializeTask => SERIALIZE_TASK,
            Helper::SerializeTaskWithChildren => SERIALIZE_TASK_WITH_CHILDREN,
            Helper::SerializeProject => SERIALIZE_PROJECT,
            Helper::SerializeFolder => SERIALIZE_FOLDER,
            Helper::SerializeFolderWithChildren => SERIALIZE_FOLDER_WITH_CHILDREN,
            Helper::SerializeTag => SERIALIZE_TAG,
            Helper::SerializeTaskNotification => SERIALIZE_TASK_NOTIFICATION,
            Helper::FindOrCreateTag => FIND_OR_CREATE_TAG,
            Helper::TaskFilter => TASK_FILTER,
            Helper::RepetitionRule => REPETITION_RULE,
            Helper::ProjectStatus => PROJECT_STATUS,
            Helper::TagStatus => TAG_STATUS,
        }
    }
}

/// Complete OmniJS program text, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPayload(String);

impl ScriptPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScriptPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct ScriptBuilder {
    args_literal: Option<String>,
    helpers: Vec<Helper>,
    body: String,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed `args` as `var args = JSON.parse("...")`.
    pub fn args<T: Serialize + ?Sized>(mut self, args: &T) -> BridgeResult<Self> {
        let json = serde_json::to_string(args)
            .map_err(|e| BridgeError::invalid_argument("args", e.to_string()))?;
        self.args_literal = Some(js_string_literal(&json)?);
        Ok(self)
    }

    /// Include a helper and its dependencies. Repeats are ignored.
    pub fn helper(mut self, helper: Helper) -> Self {
        self.include(helper);
        self
    }

    pub fn helpers(mut self, helpers: &[Helper]) -> Self {
        for helper in helpers {
            self.include(*helper);
        }
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> ScriptPayload {
        let mut out = String::from("(() => {\n");
        if let Some(literal) = &self.args_literal {
            out.push_str("  var args = JSON.parse(");
            out.push_str(literal);
            out.push_str(");\n");
        }
        for helper in &self.helpers {
            push_indented(&mut out, helper.source());
        }
        push_indented(&mut out, &self.body);
        out.push_str("})()");
        ScriptPayload(out)
    }

    fn include(&mut self, helper: Helper) {
        if self.helpers.contains(&helper) {
            return;
        }
        for dep in helper.dependencies() {
            self.include(*dep);
        }
        self.helpers.push(helper);
    }
}

/// Encode `text` as a JavaScript string literal.
///
/// JSON string syntax is a subset of JS string syntax once U+2028 and
/// U+2029 are escaped.
pub fn js_string_literal(text: &str) -> BridgeResult<String> {
    let literal = serde_json::to_string(text)
        .map_err(|e| BridgeError::invalid_argument("args", e.to_string()))?;
    Ok(literal.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029"))
}

fn push_indented(out: &mut String, source: &str) {
    for line in source.trim_matches('\n').lines() {
        if !line.is_empty() {
            out.push_str("  ");
            out.push_str(line);
        }
        out.push('\n');
    }
}

// ===== helper sources =====

const ISO_DATE: &str = r#"
function isoDate(d) {
  return d ? d.toISOString() : null;
}
"#;

const BY_ID: &str = r#"
function byId(collection, id) {
  for (var i = 0; i < collection.length; i++) {
    if (collection[i].id && collection[i].id.primaryKey === id) return collection[i];
  }
  return null;
}
"#;

const FIND_PROJECT: &str = r#"
function findProject(projectId, projectName) {
  if (projectId) {
    var keyed = byId(flattenedProjects, projectId);
    if (!keyed) throw new Error("Project not found: " + projectId);
    return keyed;
  }
  if (projectName) {
    var named = flattenedProjects.filter(function(p) { return p.name === projectName; });
    if (named.length === 0) throw new Error("Project not found: " + projectName);
    return named[0];
  }
  return null;
}
"#;

const FIND_FOLDER: &str = r#"
function findFolder(folderId, folderName) {
  if (folderId) {
    var keyed = byId(flattenedFolders, folderId);
    if (!keyed) throw new Error("Folder not found: " + folderId);
    return keyed;
  }
  if (folderName) {
    var named = flattenedFolders.filter(function(f) { return f.name === folderName; });
    if (named.length === 0) throw new Error("Folder not found: " + folderName);
    return named[0];
  }
  return null;
}
"#;

const SERIALIZE_TASK: &str = r#"
function serializeTask(task) {
  var rule = null;
  if (task.repetitionRule) {
    var method = "fixed";
    if (task.repetitionRule.method === Task.RepetitionMethod.StartAfterCompletion) method = "startAfterCompletion";
    else if (task.repetitionRule.method === Task.RepetitionMethod.DueAfterCompletion) method = "dueAfterCompletion";
    rule = { ruleString: task.repetitionRule.ruleString, method: method };
  }
  return {
    id: task.id.primaryKey,
    name: task.name,
    note: task.note || "",
    flagged: task.flagged,
    completed: task.taskStatus === Task.Status.Completed,
    dropped: task.taskStatus === Task.Status.Dropped,
    deferDate: isoDate(task.deferDate),
    dueDate: isoDate(task.dueDate),
    completionDate: isoDate(task.completionDate),
    droppedDate: isoDate(task.droppedDate),
    estimatedMinutes: task.estimatedMinutes,
    containingProjectId: task.containingProject ? task.containingProject.id.primaryKey : null,
    containingProjectName: task.containingProject ? task.containingProject.name : null,
    parentTaskId: task.parent && task.parent.id ? task.parent.id.primaryKey : null,
    tags: task.tags.map(function(t) { return { id: t.id.primaryKey, name: t.name }; }),
    hasChildren: task.hasChildren,
    sequential: task.sequential,
    completedByChildren: task.completedByChildren,
    inInbox: task.inInbox,
    repetitionRule: rule
  };
}
"#;

const SERIALIZE_TASK_WITH_CHILDREN: &str = r#"
function serializeTaskWithChildren(task, depth, maxDepth) {
  var result = serializeTask(task);
  if (task.hasChildren && (maxDepth === 0 || depth < maxDepth)) {
    result.children = task.children.map(function(child) {
      return serializeTaskWithChildren(child, depth + 1, maxDepth);
    });
  } else {
    result.children = [];
  }
  return result;
}
"#;

const SERIALIZE_PROJECT: &str = r#"
function serializeProject(project) {
  var status = "active";
  if (project.status === Project.Status.OnHold) status = "onHold";
  else if (project.status === Project.Status.Done) status = "done";
  else if (project.status === Project.Status.Dropped) status = "dropped";
  var interval = null;
  if (project.reviewInterval) {
    interval = { steps: project.reviewInterval.steps, unit: project.reviewInterval.unit + "" };
  }
  var all = project.flattenedTasks;
  var remaining = all.filter(function(t) {
    return t.taskStatus === Task.Status.Available || t.taskStatus === Task.Status.Blocked;
  });
  return {
    id: project.id.primaryKey,
    name: project.name,
    note: project.note || "",
    status: status,
    flagged: project.flagged,
    completed: project.status === Project.Status.Done,
    deferDate: isoDate(project.deferDate),
    dueDate: isoDate(project.dueDate),
    completionDate: isoDate(project.completionDate),
    estimatedMinutes: project.estimatedMinutes,
    containingFolderId: project.parentFolder ? project.parentFolder.id.primaryKey : null,
    containingFolderName: project.parentFolder ? project.parentFolder.name : null,
    tags: project.task.tags.map(function(t) { return { id: t.id.primaryKey, name: t.name }; }),
    sequential: project.sequential,
    singleActionList: project.containsSingletonActions,
    taskCount: all.length,
    remainingTaskCount: remaining.length,
    lastReviewDate: isoDate(project.lastReviewDate),
    nextReviewDate: isoDate(project.nextReviewDate),
    reviewInterval: interval
  };
}
"#;

const SERIALIZE_FOLDER: &str = r#"
function serializeFolder(folder) {
  return {
    id: folder.id.primaryKey,
    name: folder.name,
    status: folder.status === Folder.Status.Dropped ? "dropped" : "active",
    parentFolderId: folder.parent && folder.parent.constructor === Folder ? folder.parent.id.primaryKey : null,
    projectCount: folder.flattenedProjects.length,
    folderCount: folder.folders.length
  };
}
"#;

const SERIALIZE_FOLDER_WITH_CHILDREN: &str = r#"
function serializeFolderWithChildren(folder) {
  var result = serializeFolder(folder);
  result.childFolders = folder.folders.map(serializeFolderWithChildren);
  result.projects = folder.projects.map(serializeProject);
  return result;
}
"#;

const SERIALIZE_TAG: &str = r#"
function serializeTag(tag) {
  var status = "active";
  if (tag.status === Tag.Status.OnHold) status = "onHold";
  else if (tag.status === Tag.Status.Dropped) status = "dropped";
  return {
    id: tag.id.primaryKey,
    name: tag.name,
    status: status,
    parentTagId: tag.parent && tag.parent.constructor === Tag ? tag.parent.id.primaryKey : null,
    allowsNextAction: tag.allowsNextAction,
    availableTaskCount: tag.availableTasks.length,
    remainingTaskCount: tag.remainingTasks.length
  };
}
"#;

const SERIALIZE_TASK_NOTIFICATION: &str = r#"
function serializeTaskNotification(notification) {
  var kind = "unknown";
  if (notification.kind === Task.Notification.Kind.Absolute) kind = "absolute";
  else if (notification.kind === Task.Notification.Kind.DueRelative) kind = "dueRelative";
  return {
    id: notification.id.primaryKey,
    kind: kind,
    absoluteFireDate: kind === "absolute" ? isoDate(notification.absoluteFireDate) : null,
    relativeFireOffset: kind === "dueRelative" ? notification.relativeFireOffset : null,
    nextFireDate: isoDate(notification.nextFireDate),
    isSnoozed: notification.isSnoozed
  };
}
"#;

const FIND_OR_CREATE_TAG: &str = r#"
var tagsByName = {};
flattenedTags.forEach(function(t) { tagsByName[t.name] = t; });
function findTag(name) {
  return tagsByName[name] || null;
}
function findOrCreateTag(name) {
  if (tagsByName[name]) return tagsByName[name];
  var created = new Tag(name, tags.ending);
  tagsByName[name] = created;
  return created;
}
"#;

const TASK_FILTER: &str = r#"
function filterTasks(args) {
  var source = args.inInbox ? inbox : flattenedTasks;
  var dueAfter = args.dueAfter ? new Date(args.dueAfter) : null;
  var dueBefore = args.dueBefore ? new Date(args.dueBefore) : null;
  var deferAfter = args.deferAfter ? new Date(args.deferAfter) : null;
  var deferBefore = args.deferBefore ? new Date(args.deferBefore) : null;
  var query = args.search ? args.search.toLowerCase() : null;
  return source.filter(function(t) {
    var status = t.taskStatus;
    if (args.taskStatus === "available") {
      if (status !== Task.Status.Available) return false;
    } else if (args.taskStatus === "remaining") {
      if (status !== Task.Status.Available && status !== Task.Status.Blocked) return false;
    } else if (args.taskStatus === "completed") {
      if (status !== Task.Status.Completed) return false;
    } else if (args.taskStatus === "dropped") {
      if (status !== Task.Status.Dropped) return false;
    } else if (args.completed === true) {
      if (status !== Task.Status.Completed) return false;
    } else if (args.completed === false) {
      if (status === Task.Status.Completed || status === Task.Status.Dropped) return false;
    }
    if (args.flagged === true && !t.flagged) return false;
    if (args.flagged === false && t.flagged) return false;
    if (args.available === true && status !== Task.Status.Available) return false;
    if (args.projectId && (!t.containingProject || t.containingProject.id.primaryKey !== args.projectId)) return false;
    if (args.projectName && (!t.containingProject || t.containingProject.name !== args.projectName)) return false;
    if (args.tagNames && args.tagNames.length > 0) {
      var names = t.tags.map(function(tg) { return tg.name; });
      for (var i = 0; i < args.tagNames.length; i++) {
        if (names.indexOf(args.tagNames[i]) === -1) return false;
      }
    }
    if (dueAfter && (!t.dueDate || t.dueDate < dueAfter)) return false;
    if (dueBefore && (!t.dueDate || t.dueDate > dueBefore)) return false;
    if (deferAfter && (!t.deferDate || t.deferDate < deferAfter)) return false;
    if (deferBefore && (!t.deferDate || t.deferDate > deferBefore)) return false;
    if (query && t.name.toLowerCase().indexOf(query) === -1 && (t.note || "").toLowerCase().indexOf(query) === -1) return false;
    return true;
  });
}
"#;

const REPETITION_RULE: &str = r#"
function repetitionRule(rule) {
  var method = Task.RepetitionMethod.Fixed;
  if (rule.method === "startAfterCompletion") method = Task.RepetitionMethod.StartAfterCompletion;
  else if (rule.method === "dueAfterCompletion") method = Task.RepetitionMethod.DueAfterCompletion;
  return new Task.RepetitionRule(rule.ruleString, method);
}
"#;

const PROJECT_STATUS: &str = r#"
function projectStatus(name) {
  if (name === "onHold") return Project.Status.OnHold;
  if (name === "done") return Project.Status.Done;
  if (name === "dropped") return Project.Status.Dropped;
  return Project.Status.Active;
}
"#;

const TAG_STATUS: &str = r#"
function tagStatus(name) {
  if (name === "onHold") return Tag.Status.OnHold;
  if (name === "dropped") return Tag.Status.Dropped;
  return Tag.Status.Active;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Decode the `JSON.parse` literal back into the embedded value.
    fn embedded_args(payload: &ScriptPayload) -> Value {
        let line = payload
            .as_str()
            .lines()
            .find(|l| l.trim_start().starts_with("var args = JSON.parse("))
            .expect("args line");
        let literal = line
            .trim_start()
            .trim_start_matches("var args = JSON.parse(")
            .trim_end_matches(");");
        let json: String = serde_json::from_str(literal).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn hostile_values_round_trip_through_literal() {
        let args = json!({
            "name": "\"); deleteObject(flattenedTasks[0]); (\"",
            "note": "line1\nline2 `${inbox}` </script> \\ '",
            "sep": "a\u{2028}b\u{2029}c"
        });
        let payload = ScriptBuilder::new()
            .args(&args)
            .unwrap()
            .body("return JSON.stringify(args);")
            .build();

        assert_eq!(embedded_args(&payload), args);
        assert_eq!(payload.as_str().lines().count(), 4);
        assert!(!payload.as_str().contains('\u{2028}'));
        assert!(!payload.as_str().contains("deleteObject(flattenedTasks[0]); (\""));
    }

    #[test]
    fn output_is_closed_iife() {
        let payload = ScriptBuilder::new()
            .body("return JSON.stringify(1);")
            .build();
        assert!(payload.as_str().starts_with("(() => {\n"));
        assert!(payload.as_str().ends_with("})()"));
        assert!(!payload.as_str().contains("var args"));
    }

    #[test]
    fn helpers_included_once_dependencies_first() {
        let payload = ScriptBuilder::new()
            .helper(Helper::SerializeTaskWithChildren)
            .helper(Helper::SerializeTask)
            .helper(Helper::SerializeTaskWithChildren)
            .body("return JSON.stringify([]);")
            .build();
        let text = payload.as_str();

        assert_eq!(text.matches("function serializeTask(").count(), 1);
        assert_eq!(text.matches("function isoDate(").count(), 1);
        let iso = text.find("function isoDate(").unwrap();
        let base = text.find("function serializeTask(").unwrap();
        let tree = text.find("function serializeTaskWithChildren(").unwrap();
        assert!(iso < base && base < tree);
    }

    #[test]
    fn same_input_same_bytes() {
        let build = || {
            ScriptBuilder::new()
                .args(&json!({"id": "abc", "flagged": true}))
                .unwrap()
                .helpers(&[Helper::ById, Helper::SerializeFolderWithChildren])
                .body("return JSON.stringify(null);")
                .build()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn every_helper_emits_its_own_definition() {
        let all = [
            (Helper::IsoDate, "function isoDate("),
            (Helper::ById, "function byId("),
            (Helper::FindProject, "function findProject("),
            (Helper::FindFolder, "function findFolder("),
            (Helper::SerializeTask, "function serializeTask("),
            (Helper::SerializeTaskWithChildren, "function serializeTaskWithChildren("),
            (Helper::SerializeProject, "function serializeProject("),
            (Helper::SerializeFolder, "function serializeFolder("),
            (Helper::SerializeFolderWithChildren, "function serializeFolderWithChildren("),
            (Helper::SerializeTag, "function serializeTag("),
            (Helper::SerializeTaskNotification, "function serializeTaskNotification("),
            (Helper::FindOrCreateTag, "function findOrCreateTag("),
            (Helper::TaskFilter, "function filterTasks("),
            (Helper::RepetitionRule, "function repetitionRule("),
            (Helper::ProjectStatus, "function projectStatus("),
            (Helper::TagStatus, "function tagStatus("),
        ];
        for (helper, definition) in all {
            assert!(helper.source().contains(definition), "{helper:?}");
        }
    }

    #[test]
    fn by_id_skips_objects_without_identifier() {
        assert!(Helper::ById
            .source()
            .contains("collection[i].id && collection[i].id.primaryKey === id"));
    }

    #[test]
    fn subtree_helper_honors_max_depth() {
        let source = Helper::SerializeTaskWithChildren.source();
        assert!(source.contains("maxDepth === 0"));
        assert!(source.contains("depth < maxDepth"));
        assert!(source.contains("result.children = []"));
        assert!(source.contains("task.hasChildren"));
    }
}
