//! Pagination types.

use serde::Deserialize;

use super::File;

/// Trait for paginated response types.
pub trait Paginated {
    /// The individual item type within a page.
    type Item;

    /// Returns the items from this page.
    fn items(self) -> Vec<Self::Item>;

    /// Returns the token for the next page, if any. `None` means this was the last page.
    fn next_page_token(&self) -> Option<&str>;
}

/// One page of a `files.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    /// Files on this page.
    #[serde(default)]
    pub files: Vec<File>,
    /// Token for the next page.
    pub next_page_token: Option<String>,
    /// Whether the search could not cover every corpus (e.g. too many shared drives).
    #[serde(default)]
    pub incomplete_search: bool,
}

impl Paginated for FileList {
    type Item = File;

    fn items(self) -> Vec<File> {
        self.files
    }

    fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }
}
