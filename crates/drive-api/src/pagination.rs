//! Page-token pagination support.

use std::collections::VecDeque;
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;

use crate::client::ClientInner;
use crate::error::DriveError;
use crate::http_client::HttpClient;
use crate::models::Paginated;

/// An async page stream that lazily fetches pages from a paginated endpoint.
///
/// Owns all its state (via `Arc`) so there are no lifetime parameters.
pub struct PageStream<C: HttpClient, Page: Paginated + DeserializeOwned> {
    inner: Arc<ClientInner<C>>,
    path: String,
    query: Vec<(String, String)>,
    page_token: Option<String>,
    buffer: VecDeque<Page::Item>,
    done: bool,
}

impl<C: HttpClient, Page: Paginated + DeserializeOwned> PageStream<C, Page> {
    pub(crate) fn new(inner: Arc<ClientInner<C>>, path: String, query: Vec<(String, String)>) -> Self {
        Self {
            inner,
            path,
            query,
            page_token: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Fetch the next individual item, requesting new pages as needed.
    ///
    /// Returns `Ok(None)` when all pages have been exhausted.
    pub async fn next(&mut self) -> Result<Option<Page::Item>, DriveError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            let Some(page) = self.next_page().await? else {
                return Ok(None);
            };
            // Drive may return an empty page with a continuation token, so keep going.
            self.buffer = VecDeque::from(page.items());
        }
    }

    /// Collect all remaining items into a `Vec`.
    pub async fn collect(mut self) -> Result<Vec<Page::Item>, DriveError> {
        let mut all = Vec::new();
        while let Some(item) = self.next().await? {
            all.push(item);
        }
        Ok(all)
    }

    /// Fetch the next full page.
    ///
    /// Returns `Ok(None)` when all pages have been exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page>, DriveError> {
        if self.done {
            return Ok(None);
        }
        let page = self.fetch_page().await?;
        self.page_token = page.next_page_token().map(ToOwned::to_owned);
        self.done = self.page_token.is_none();
        Ok(Some(page))
    }

    async fn fetch_page(&self) -> Result<Page, DriveError> {
        let mut query: Vec<(&str, &str)> = self
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        if let Some(ref token) = self.page_token {
            query.push(("pageToken", token));
        }

        self.inner
            .request(Method::GET, &self.path, &query, None::<&()>)
            .await
    }
}
