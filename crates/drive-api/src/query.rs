//! Builder for the `q` search parameter of `files.list`.

use std::fmt;

use crate::models::FOLDER_MIME_TYPE;

/// A conjunction of search clauses.
///
/// ```
/// use drive_api::Query;
///
/// let q = Query::new().folders().not_trashed().name_eq("it's");
/// assert_eq!(
///     q.to_string(),
///     "mimeType = 'application/vnd.google-apps.folder' and trashed = false and name = 'it\\'s'"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    clauses: Vec<String>,
}

impl Query {
    /// An empty query, matching everything visible to the caller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only folders.
    #[must_use]
    pub fn folders(self) -> Self {
        self.clause(format!("mimeType = '{FOLDER_MIME_TYPE}'"))
    }

    /// Only objects that are not in the trash.
    #[must_use]
    pub fn not_trashed(self) -> Self {
        self.clause("trashed = false".to_owned())
    }

    /// Objects whose name is exactly `name`.
    #[must_use]
    pub fn name_eq(self, name: &str) -> Self {
        self.clause(format!("name = '{}'", escape(name)))
    }

    /// Direct children of `parent_id`.
    #[must_use]
    pub fn in_parent(self, parent_id: &str) -> Self {
        self.clause(format!("'{}' in parents", escape(parent_id)))
    }

    fn clause(mut self, clause: String) -> Self {
        self.clauses.push(clause);
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" and "))
    }
}

/// Escape a string literal for use inside single quotes in a query.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
