//! Tag scripts

use crate::error::BridgeResult;
use crate::omnifocus::models::{CreateTagArgs, IdArgs, ListTagsArgs, UpdateTagArgs};
use crate::omnifocus::script::{Helper, ScriptBuilder, ScriptPayload};

pub fn list_tags(args: &ListTagsArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::SerializeTag)
        .body(
            r#"
var result = flattenedTags.map(serializeTag);
if (args.status) result = result.filter(function(t) { return t.status === args.status; });
return JSON.stringify(result);
"#,
        )
        .build())
}

pub fn get_tag(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeTag])
        .body(
            r#"
var tag = byId(flattenedTags, args.id);
if (!tag) throw new Error("Tag not found: " + args.id);
return JSON.stringify(serializeTag(tag));
"#,
        )
        .build())
}

pub fn create_tag(args: &CreateTagArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::TagStatus, Helper::SerializeTag])
        .body(
            r#"
var parent = null;
if (args.parentTagId) {
  parent = byId(flattenedTags, args.parentTagId);
  if (!parent) throw new Error("Tag not found: " + args.parentTagId);
} else if (args.parentTagName) {
  var named = flattenedTags.filter(function(t) { return t.name === args.parentTagName; });
  if (named.length === 0) throw new Error("Tag not found: " + args.parentTagName);
  parent = named[0];
}
var tag = new Tag(args.name, parent ? parent.ending : tags.ending);
if (args.allowsNextAction !== undefined) tag.allowsNextAction = args.allowsNextAction;
if (args.status !== undefined) tag.status = tagStatus(args.status);
return JSON.stringify(serializeTag(tag));
"#,
        )
        .build())
}

pub fn update_tag(args: &UpdateTagArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::TagStatus, Helper::SerializeTag])
        .body(
            r#"
var tag = byId(flattenedTags, args.id);
if (!tag) throw new Error("Tag not found: " + args.id);
if (args.name !== undefined) tag.name = args.name;
if (args.allowsNextAction !== undefined) tag.allowsNextAction = args.allowsNextAction;
if (args.status !== undefined) tag.status = tagStatus(args.status);
return JSON.stringify(serializeTag(tag));
"#,
        )
        .build())
}

pub fn delete_tag(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::ById)
        .body(
            r#"
var tag = byId(flattenedTags, args.id);
if (!tag) throw new Error("Tag not found: " + args.id);
deleteObject(tag);
return JSON.stringify({ deleted: true, id: args.id });
"#,
        )
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_tag_resolves_parent_by_id_then_name() {
        let text = create_tag(&CreateTagArgs {
            name: "Calls".into(),
            parent_tag_name: Some("Contexts".into()),
            ..Default::default()
        })
        .unwrap()
        .to_string();
        let by_id = text.find("byId(flattenedTags, args.parentTagId)").unwrap();
        let by_name = text.find("t.name === args.parentTagName").unwrap();
        assert!(by_id < by_name);
        assert!(text.contains("parent ? parent.ending : tags.ending"));
    }

    #[test]
    fn status_mapping_comes_from_helper_library() {
        for text in [
            create_tag(&CreateTagArgs {
                name: "Calls".into(),
                ..Default::default()
            })
            .unwrap()
            .to_string(),
            update_tag(&UpdateTagArgs {
                id: "tg1".into(),
                ..Default::default()
            })
            .unwrap()
            .to_string(),
        ] {
            assert_eq!(text.matches("function tagStatus(name)").count(), 1);
            let helper = text.find("function tagStatus(name)").unwrap();
            let body = text.find("tag.status = tagStatus(args.status)").unwrap();
            assert!(helper < body);
        }
    }

    #[test]
    fn delete_tag_reports_id() {
        let text = delete_tag(&IdArgs::new("tg1")).unwrap().to_string();
        assert!(text.contains("{ deleted: true, id: args.id }"));
    }
}
