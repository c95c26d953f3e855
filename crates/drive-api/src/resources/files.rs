//! Files resource.

use std::sync::Arc;

use bytes::{BufMut as _, Bytes, BytesMut};
use http::{HeaderValue, Method};

use crate::client::{DriveClient, Endpoint};
use crate::error::DriveError;
use crate::http_client::HttpClient;
use crate::models::{CreateFileRequest, FOLDER_MIME_TYPE, File, FileList};
use crate::pagination::PageStream;
use crate::query::Query;

/// Fields requested for single-object responses.
const FILE_FIELDS: &str = "id, name, mimeType, parents, trashed, driveId, webViewLink";

/// Fields requested for list responses.
const LIST_FIELDS: &str =
    "nextPageToken, incompleteSearch, files(id, name, mimeType, parents, trashed, driveId)";

const MULTIPART_BOUNDARY: &str = "docsort-multipart-6f1d0c2ab9e74c55";
const MULTIPART_CONTENT_TYPE: &str =
    "multipart/related; boundary=docsort-multipart-6f1d0c2ab9e74c55";

/// Parameters of a `files.list` call.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Search query.
    pub query: Option<Query>,
    /// Maximum number of files per page. The server default applies when unset.
    pub page_size: Option<u32>,
    /// Search every drive the caller can see, including shared drives.
    pub all_drives: bool,
}

impl ListParams {
    /// List everything matching `query` in the caller's own drive.
    #[must_use]
    pub fn query(query: Query) -> Self {
        Self {
            query: Some(query),
            ..Self::default()
        }
    }

    /// Extend the search to shared drives.
    #[must_use]
    pub fn all_drives(mut self) -> Self {
        self.all_drives = true;
        self
    }

    /// Limit the page size.
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("fields".to_owned(), LIST_FIELDS.to_owned())];
        if let Some(ref q) = self.query {
            pairs.push(("q".to_owned(), q.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("pageSize".to_owned(), size.to_string()));
        }
        if self.all_drives {
            pairs.push(("corpora".to_owned(), "allDrives".to_owned()));
            pairs.push(("includeItemsFromAllDrives".to_owned(), "true".to_owned()));
            pairs.push(("supportsAllDrives".to_owned(), "true".to_owned()));
        } else {
            pairs.push(("spaces".to_owned(), "drive".to_owned()));
        }
        pairs
    }
}

/// A file to upload with [`FilesResource::upload`].
#[derive(Debug, Clone)]
pub struct Upload<'a> {
    /// Name of the new file.
    pub name: &'a str,
    /// Folder to upload into.
    pub parent: &'a str,
    /// MIME type of the content.
    pub mime_type: &'a str,
    /// File content.
    pub data: Bytes,
}

/// Operations on files and folders.
pub struct FilesResource<'c, C: HttpClient> {
    client: &'c DriveClient<C>,
}

impl<'c, C: HttpClient> FilesResource<'c, C> {
    pub(crate) fn new(client: &'c DriveClient<C>) -> Self {
        Self { client }
    }

    /// Fetch a single page of results.
    pub async fn list(&self, params: &ListParams) -> Result<FileList, DriveError> {
        let pairs = params.to_pairs();
        let query: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.client
            .inner
            .request(Method::GET, "/files", &query, None::<&()>)
            .await
    }

    /// Return a [`PageStream`] over every file matching `params`.
    #[must_use]
    pub fn list_all(&self, params: &ListParams) -> PageStream<C, FileList> {
        PageStream::new(
            Arc::clone(&self.client.inner),
            "/files".to_owned(),
            params.to_pairs(),
        )
    }

    /// Get a file's metadata by id.
    pub async fn get(&self, file_id: &str) -> Result<File, DriveError> {
        let path = format!("/files/{file_id}");
        self.client
            .inner
            .request(
                Method::GET,
                &path,
                &[("fields", FILE_FIELDS), ("supportsAllDrives", "true")],
                None::<&()>,
            )
            .await
    }

    /// Create a folder named `name` under `parent_id`.
    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<File, DriveError> {
        let body = CreateFileRequest {
            name,
            mime_type: Some(FOLDER_MIME_TYPE),
            parents: vec![parent_id],
        };
        self.client
            .inner
            .request(
                Method::POST,
                "/files",
                &[("fields", FILE_FIELDS), ("supportsAllDrives", "true")],
                Some(&body),
            )
            .await
    }

    /// Upload a file's metadata and content in one multipart request.
    pub async fn upload(&self, upload: Upload<'_>) -> Result<File, DriveError> {
        let inner = &self.client.inner;
        let url = inner.url(
            Endpoint::Upload,
            "/files",
            &[
                ("uploadType", "multipart"),
                ("fields", FILE_FIELDS),
                ("supportsAllDrives", "true"),
            ],
        )?;
        let metadata = CreateFileRequest {
            name: upload.name,
            mime_type: None,
            parents: vec![upload.parent],
        };
        let body = multipart_body(&metadata, upload.mime_type, &upload.data)?;
        let raw = inner
            .send_raw(
                Method::POST,
                url,
                Some(HeaderValue::from_static(MULTIPART_CONTENT_TYPE)),
                Some(body),
            )
            .await?;
        serde_json::from_slice(&raw).map_err(DriveError::Decode)
    }
}

fn multipart_body(
    metadata: &CreateFileRequest<'_>,
    mime_type: &str,
    data: &[u8],
) -> Result<Bytes, DriveError> {
    let json = serde_json::to_vec(metadata).map_err(DriveError::Encode)?;
    let mut buf = BytesMut::with_capacity(json.len() + data.len() + 256);
    buf.put_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    buf.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    buf.put_slice(&json);
    buf.put_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    buf.put_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    buf.put_slice(data);
    buf.put_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_drive_listing_restricts_spaces() {
        let pairs = ListParams::query(Query::new().not_trashed()).to_pairs();
        assert!(pairs.contains(&("spaces".to_owned(), "drive".to_owned())));
        assert!(!pairs.iter().any(|(k, _)| k == "corpora"));
    }

    #[test]
    fn all_drives_listing_sets_corpora() {
        let pairs = ListParams::default().all_drives().page_size(5).to_pairs();
        assert!(pairs.contains(&("corpora".to_owned(), "allDrives".to_owned())));
        assert!(pairs.contains(&("pageSize".to_owned(), "5".to_owned())));
    }

    #[test]
    fn content_type_names_the_body_boundary() {
        assert!(MULTIPART_CONTENT_TYPE.ends_with(MULTIPART_BOUNDARY));
    }

    #[test]
    fn multipart_body_has_both_parts() {
        let metadata = CreateFileRequest {
            name: "a.pdf",
            mime_type: None,
            parents: vec!["p1"],
        };
        let body = multipart_body(&metadata, "application/pdf", b"%PDF").unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with(&format!("--{MULTIPART_BOUNDARY}\r\n")));
        assert!(text.contains(r#"{"name":"a.pdf","parents":["p1"]}"#));
        assert!(text.contains("Content-Type: application/pdf\r\n\r\n%PDF"));
        assert!(text.ends_with(&format!("--{MULTIPART_BOUNDARY}--\r\n")));
    }
}
