//! Folder scripts

use crate::error::BridgeResult;
use crate::omnifocus::models::{CreateFolderArgs, IdArgs, ListFoldersArgs, UpdateFolderArgs};
use crate::omnifocus::script::{Helper, ScriptBuilder, ScriptPayload};

pub fn list_folders(args: &ListFoldersArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::SerializeFolder)
        .body(
            r#"
var folders = flattenedFolders.map(serializeFolder);
if (args.status) folders = folders.filter(function(f) { return f.status === args.status; });
return JSON.stringify(folders);
"#,
        )
        .build())
}

/// The folder with its child folders and projects, recursively.
pub fn get_folder(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeFolderWithChildren])
        .body(
            r#"
var folder = byId(flattenedFolders, args.id);
if (!folder) throw new Error("Folder not found: " + args.id);
return JSON.stringify(serializeFolderWithChildren(folder));
"#,
        )
        .build())
}

pub fn create_folder(args: &CreateFolderArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::FindFolder, Helper::SerializeFolder])
        .body(
            r#"
var parent = findFolder(args.parentFolderId, args.parentFolderName);
var folder = new Folder(args.name, parent ? parent.ending : library.ending);
return JSON.stringify(serializeFolder(folder));
"#,
        )
        .build())
}

pub fn update_folder(args: &UpdateFolderArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helpers(&[Helper::ById, Helper::SerializeFolder])
        .body(
            r#"
var folder = byId(flattenedFolders, args.id);
if (!folder) throw new Error("Folder not found: " + args.id);
if (args.name !== undefined) folder.name = args.name;
if (args.status === "active") folder.status = Folder.Status.Active;
else if (args.status === "dropped") folder.status = Folder.Status.Dropped;
return JSON.stringify(serializeFolder(folder));
"#,
        )
        .build())
}

pub fn delete_folder(args: &IdArgs) -> BridgeResult<ScriptPayload> {
    Ok(ScriptBuilder::new()
        .args(args)?
        .helper(Helper::ById)
        .body(
            r#"
var folder = byId(flattenedFolders, args.id);
if (!folder) throw new Error("Folder not found: " + args.id);
deleteObject(folder);
return JSON.stringify({ deleted: true, id: args.id });
"#,
        )
        .build())
}
