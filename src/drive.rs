//! [`RemoteStorage`] on top of the Drive REST client.

use bytes::Bytes;
use drive_api::models::{File, FileList};
use drive_api::{Drive, DriveError, ListParams, Query, Upload};
use secrecy::ExposeSecret as _;
use tracing::{debug, instrument, trace, warn};

use docsort::cache::key::RemoteId;
use docsort::remote::{RemoteError, RemoteNode, RemoteStorage};

use crate::app_config::DriveConfig;

/// Drive-backed remote. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct DriveRemote {
    client: Drive,
}

impl DriveRemote {
    pub fn new(config: &DriveConfig) -> Result<Self, RemoteError> {
        let client = Drive::builder(config.access_token.expose_secret())
            .base_url(&config.api_url)
            .upload_url(&config.upload_url)
            .timeout(config.request_timeout())
            .build()
            .map_err(into_remote)?;
        Ok(Self { client })
    }

    /// Whether a non-trashed file named `name` already sits directly in `folder`.
    #[instrument(name = "DriveRemote::file_exists", skip(self))]
    pub async fn file_exists(&self, folder: &RemoteId, name: &str) -> Result<bool, RemoteError> {
        let query = Query::new()
            .name_eq(name)
            .in_parent(folder.as_str())
            .not_trashed();
        let page = self
            .client
            .files()
            .list(&ListParams::query(query).all_drives().page_size(1))
            .await
            .map_err(into_remote)?;
        conclusive(page, name).map(|files| !files.is_empty())
    }

    /// Upload `data` as a new file named `name` inside `folder`.
    #[instrument(name = "DriveRemote::upload_file", skip(self, data), fields(bytes = data.len()))]
    pub async fn upload_file(
        &self,
        folder: &RemoteId,
        name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<RemoteId, RemoteError> {
        let file = self
            .client
            .files()
            .upload(Upload {
                name,
                parent: folder.as_str(),
                mime_type,
                data,
            })
            .await
            .map_err(into_remote)?;
        debug!(id = %file.id, "Uploaded file.");
        Ok(RemoteId::from(file.id))
    }
}

impl RemoteStorage for DriveRemote {
    #[instrument(name = "DriveRemote::find_child_by_name", skip(self))]
    async fn find_child_by_name(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<Option<RemoteNode>, RemoteError> {
        let query = Query::new()
            .folders()
            .name_eq(name)
            .in_parent(parent.as_str())
            .not_trashed();
        let page = self
            .client
            .files()
            .list(&ListParams::query(query).all_drives().page_size(1))
            .await
            .map_err(into_remote)?;
        Ok(conclusive(page, name)?.into_iter().next().map(to_node))
    }

    #[instrument(name = "DriveRemote::create_container", skip(self))]
    async fn create_container(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteNode, RemoteError> {
        let file = self
            .client
            .files()
            .create_folder(name, parent.as_str())
            .await
            .map_err(into_remote)?;
        Ok(to_node(file))
    }

    async fn get_node(&self, id: &RemoteId) -> Result<RemoteNode, RemoteError> {
        trace!(%id, "Probing node.");
        match self.client.files().get(id.as_str()).await {
            Ok(file) => Ok(to_node(file)),
            Err(e) if e.is_not_found() => Err(RemoteError::NotFound { id: id.clone() }),
            Err(e) => Err(into_remote(e)),
        }
    }

    #[instrument(name = "DriveRemote::list_all_containers_named", skip(self))]
    async fn list_all_containers_named(&self, name: &str) -> Result<Vec<RemoteNode>, RemoteError> {
        let query = Query::new().folders().name_eq(name).not_trashed();
        let files = self
            .client
            .files()
            .list_all(&ListParams::query(query).all_drives().page_size(5))
            .collect()
            .await
            .map_err(into_remote)?;
        Ok(files.into_iter().map(to_node).collect())
    }
}

/// The files of a one-page search, unless Drive skipped some corpora and found nothing.
///
/// A hit is usable either way. An empty incomplete result must not be read as "absent", or a
/// folder that lives on an unsearched shared drive would be created a second time.
fn conclusive(page: FileList, name: &str) -> Result<Vec<File>, RemoteError> {
    if page.files.is_empty() && page.incomplete_search {
        warn!(name, "Drive search was incomplete and found nothing.");
        return Err(RemoteError::IncompleteSearch {
            name: name.to_owned(),
        });
    }
    Ok(page.files)
}

fn to_node(file: File) -> RemoteNode {
    let parent = file.parent().map(RemoteId::from);
    RemoteNode {
        id: RemoteId::from(file.id),
        name: file.name,
        parent,
        trashed: file.trashed,
    }
}

fn into_remote(e: DriveError) -> RemoteError {
    match e {
        DriveError::Api {
            status, message, ..
        } => RemoteError::Api {
            status: status.as_u16(),
            message,
        },
        DriveError::Decode(source) => RemoteError::Decode(source.to_string()),
        other => RemoteError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_incomplete_search_is_not_a_miss() {
        let page = FileList {
            incomplete_search: true,
            ..FileList::default()
        };
        assert_eq!(
            conclusive(page, "IZVODI"),
            Err(RemoteError::IncompleteSearch {
                name: "IZVODI".to_owned()
            })
        );
    }

    #[test]
    fn incomplete_search_with_a_hit_is_usable() {
        let page = FileList {
            files: vec![File {
                id: "f1".to_owned(),
                ..File::default()
            }],
            incomplete_search: true,
            ..FileList::default()
        };
        assert_eq!(conclusive(page, "IZVODI").unwrap().len(), 1);
    }

    #[test]
    fn node_takes_the_first_parent() {
        let node = to_node(File {
            id: "f1".to_owned(),
            name: "2025".to_owned(),
            parents: vec!["p1".to_owned(), "p2".to_owned()],
            trashed: true,
            ..File::default()
        });
        assert_eq!(node.id, RemoteId::from("f1"));
        assert_eq!(node.parent, Some(RemoteId::from("p1")));
        assert!(node.trashed);
    }
}
