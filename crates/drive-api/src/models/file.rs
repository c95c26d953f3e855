//! File models.

use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file or folder as returned by the API.
///
/// Only the fields requested through the `fields` parameter are populated; everything is
/// defaulted so partial responses still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Opaque file identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// MIME type.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Parent folder ids. Empty for the root and for objects that are not visible to the caller.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Whether the object is in the trash.
    #[serde(default)]
    pub trashed: bool,
    /// Shared drive containing the object, if any.
    #[serde(default)]
    pub drive_id: Option<String>,
    /// Browser link to the object.
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl File {
    /// Whether this object is a folder.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// The first parent, which is the only one on modern Drive.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Metadata body of a `files.create` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest<'a> {
    /// Name of the new object.
    pub name: &'a str,
    /// MIME type; set to [`FOLDER_MIME_TYPE`] to create a folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'a str>,
    /// Parent folder ids.
    pub parents: Vec<&'a str>,
}
