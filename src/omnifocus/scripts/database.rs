//! Whole-database scripts

use crate::error::BridgeResult;
use crate::omnifocus::models::{SearchArgs, DEFAULT_SEARCH_LIMIT};
use crate::omnifocus::script::{ScriptBuilder, ScriptPayload};
use serde::Serialize;

/// Aggregate counts; "due soon" means within the next three days.
pub fn database_summary() -> ScriptPayload {
    ScriptBuilder::new()
        .body(
            r#"
var now = new Date();
var soon = new Date(now.getTime() + 3 * 24 * 60 * 60 * 1000);
var available = flattenedTasks.filter(function(t) { return t.taskStatus === Task.Status.Available; });
return JSON.stringify({
  inboxCount: inbox.filter(function(t) { return t.taskStatus === Task.Status.Available; }).length,
  projectCount: flattenedProjects.filter(function(p) { return p.status === Project.Status.Active; }).length,
  tagCount: flattenedTags.length,
  folderCount: flattenedFolders.length,
  availableTaskCount: available.length,
  dueSoonTaskCount: available.filter(function(t) { return t.dueDate && t.dueDate >= now && t.dueDate <= soon; }).length,
  overdueTaskCount: available.filter(function(t) { return t.dueDate && t.dueDate < now; }).length,
  flaggedTaskCount: available.filter(function(t) { return t.flagged; }).length
});
"#,
        )
        .build()
}

#[derive(Serialize)]
struct SearchScriptArgs<'a> {
    query: &'a str,
    limit: u32,
}

/// Case-insensitive search over tasks, projects, folders and tags, in that
/// order, stopping at `limit` hits. Notes are cut to 200 characters.
pub fn search(args: &SearchArgs) -> BridgeResult<ScriptPayload> {
    let embedded = SearchScriptArgs {
        query: &args.query,
        limit: args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
    };
    Ok(ScriptBuilder::new()
        .args(&embedded)?
        .body(
            r#"
var query = args.query.toLowerCase();
var results = [];
function matches(text) {
  return (text || "").toLowerCase().indexOf(query) !== -1;
}
function scan(collection, type, withNote) {
  for (var i = 0; i < collection.length && results.length < args.limit; i++) {
    var item = collection[i];
    if (matches(item.name) || (withNote && matches(item.note))) {
      var hit = { type: type, id: item.id.primaryKey, name: item.name };
      if (withNote) hit.note = (item.note || "").substring(0, 200);
      results.push(hit);
    }
  }
}
scan(flattenedTasks, "task", true);
scan(flattenedProjects, "project", true);
scan(flattenedFolders, "folder", false);
scan(flattenedTags, "tag", false);
return JSON.stringify(results);
"#,
        )
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_embeds_default_limit() {
        let text = search(&SearchArgs {
            query: "milk".into(),
            limit: None,
        })
        .unwrap()
        .to_string();
        assert!(text.contains("\\\"limit\\\":50"));
        assert!(text.contains("substring(0, 200)"));
    }

    #[test]
    fn summary_has_every_count() {
        let text = database_summary().to_string();
        for field in [
            "inboxCount",
            "projectCount",
            "tagCount",
            "folderCount",
            "availableTaskCount",
            "dueSoonTaskCount",
            "overdueTaskCount",
            "flaggedTaskCount",
        ] {
            assert!(text.contains(field), "{field}");
        }
    }
}
