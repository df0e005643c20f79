//! Project scripts

use crate::error::BridgeResult;
use crate::omnifocus::models::{
    CreateProjectArgs, IdArgs, ListProjectsArgs, ProjectRefArgs, UpdateProjectArgs,
};
use crate::omnifocus::script::{Helper, ScriptBuilder, ScriptPayload};

pub fn list_projects(args: &ListProjectsArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ProjectStatus, Helper::SerializeProject])
        .body(
            r#"
var wanted = args.status ? projectStatus(args.status) : null;
var query = args.search ? args.search.toLowerCase() : null;
var projects = flattenedProjects.filter(function(p) {
  if (wanted !== null && p.status !== wanted) return false;
  if (args.folderId && (!p.parentFolder || p.parentFolder.id.primaryKey !== args.folderId)) return false;
  if (args.folderName && (!p.parentFolder || p.parentFolder.name !== args.folderName)) return false;
  if (query && p.name.toLowerCase().indexOf(query) === -1 && (p.note || "").toLowerCase().indexOf(query) === -1) return false;
  return true;
});
var offset = args.offset || 0;
var limit = args.limit || 100;
return JSON.stringify(projects.slice(offset, offset + limit).map(serializeProject));
"#,
        )
        .build())
}

/// Looks the project up by primary key first, then by exact name.
pub fn get_project(args: &ProjectRefArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeProject])
        .body(
            r#"
var project = byId(flattenedProjects, args.idOrName);
if (!project) {
  var named = flattenedProjects.filter(function(p) { return p.name === args.idOrName; });
  if (named.length > 0) project = named[0];
}
if (!project) throw new Error("Project not found: " + args.idOrName);
return JSON.stringify(serializeProject(project));
"#,
        )
        .build())
}

pub fn create_project(args: &CreateProjectArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[
            Helper::FindFolder,
            Helper::FindOrCreateTag,
            Helper::SerializeProject,
        ])
        .body(
            r#"
var folder = findFolder(args.folderId, args.folderName);
var project = new Project(args.name, folder ? folder.ending : library.ending);
if (args.note !== undefined) project.note = args.note;
if (args.sequential !== undefined) project.sequential = args.sequential;
if (args.singleActionList !== undefined) project.containsSingletonActions = args.singleActionList;
if (args.completedByChildren !== undefined) project.completedByChildren = args.completedByChildren;
if (args.deferDate) project.deferDate = new Date(args.deferDate);
if (args.dueDate) project.dueDate = new Date(args.dueDate);
if (args.flagged !== undefined) project.flagged = args.flagged;
if (args.reviewInterval) {
  var interval = project.reviewInterval;
  interval.steps = args.reviewInterval.steps;
  interval.unit = args.reviewInterval.unit;
  project.reviewInterval = interval;
}
(args.tags || []).forEach(function(name) { project.task.addTag(findOrCreateTag(name)); });
return JSON.stringify(serializeProject(project));
"#,
        )
        .build())
}

pub fn update_project(args: &UpdateProjectArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::ProjectStatus, Helper::SerializeProject])
        .body(
            r#"
var project = byId(flattenedProjects, args.id);
if (!project) throw new Error("Project not found: " + args.id);
if (args.name !== undefined) project.name = args.name;
if (args.note !== undefined) project.note = args.note;
if (args.status !== undefined) project.status = projectStatus(args.status);
if (args.sequential !== undefined) project.sequential = args.sequential;
if (args.singleActionList !== undefined) project.containsSingletonActions = args.singleActionList;
if (args.completedByChildren !== undefined) project.completedByChildren = args.completedByChildren;
if (args.deferDate !== undefined) project.deferDate = args.deferDate ? new Date(args.deferDate) : null;
if (args.dueDate !== undefined) project.dueDate = args.dueDate ? new Date(args.dueDate) : null;
if (args.flagged !== undefined) project.flagged = args.flagged;
if (args.reviewInterval) {
  var interval = project.reviewInterval;
  interval.steps = args.reviewInterval.steps;
  interval.unit = args.reviewInterval.unit;
  project.reviewInterval = interval;
}
return JSON.stringify(serializeProject(project));
"#,
        )
        .build())
}

pub fn complete_project(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeProject])
        .body(
            r#"
var project = byId(flattenedProjects, args.id);
if (!project) throw new Error("Project not found: " + args.id);
project.markComplete();
return JSON.stringify(serializeProject(project));
"#,
        )
        .build())
}

pub fn delete_project(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::ById)
        .body(
            r#"
var project = byId(flattenedProjects, args.id);
if (!project) throw new Error("Project not found: " + args.id);
deleteObject(project);
return JSON.stringify({ deleted: true, id: args.id });
"#,
        )
        .build())
}

/// Active projects whose next review date has passed.
pub fn get_review_queue() -> ScriptPayload {
    ScriptBuilder::new()
        .helper(Helper::SerializeProject)
        .body(
            r#"
var now = new Date();
var due = flattenedProjects.filter(function(p) {
  return p.status === Project.Status.Active && p.nextReviewDate && p.nextReviewDate <= now;
});
return JSON.stringify(due.map(serializeProject));
"#,
        )
        .build()
}

pub fn mark_reviewed(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeProject])
        .body(
            r#"
var project = byId(flattenedProjects, args.id);
if (!project) throw new Error("Project not found: " + args.id);
project.markReviewed();
return JSON.stringify(serializeProject(project));
"#,
        )
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omnifocus::models::ProjectStatus;

    #[test]
    fn status_filter_maps_names() {
        let payload = list_projects(&ListProjectsArgs {
            status: Some(ProjectStatus::OnHold),
            ..Default::default()
        })
        .unwrap();
        let text = payload.as_str();
        assert!(text.contains("function projectStatus(name)"));
        assert!(text.contains("\\\"status\\\":\\\"onHold\\\""));
        assert!(text.contains("args.limit || 100"));
    }

    #[test]
    fn update_project_includes_status_helper_once() {
        let text = update_project(&UpdateProjectArgs {
            id: "p1".into(),
            status: Some(ProjectStatus::Dropped),
            ..Default::default()
        })
        .unwrap()
        .to_string();
        assert_eq!(text.matches("function projectStatus(name)").count(), 1);
        assert!(text.find("function projectStatus(name)").unwrap() < text.find("var project =").unwrap());
    }

    #[test]
    fn get_project_falls_back_to_name() {
        let payload = get_project(&ProjectRefArgs {
            id_or_name: "Errands".into(),
        })
        .unwrap();
        let text = payload.as_str();
        let by_key = text.find("byId(flattenedProjects, args.idOrName)").unwrap();
        let by_name = text.find("p.name === args.idOrName").unwrap();
        assert!(by_key < by_name);
    }

    #[test]
    fn create_project_defaults_to_library() {
        let payload = create_project(&CreateProjectArgs {
            name: "Garden".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(payload.as_str().contains("folder ? folder.ending : library.ending"));
    }

    #[test]
    fn review_queue_filters_active_overdue() {
        let text = get_review_queue().to_string();
        assert!(text.contains("p.nextReviewDate <= now"));
        assert!(!text.contains("var args"));
    }
}
