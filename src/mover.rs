//! Picking statements out of the downloads directory and archiving them.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::app_config::OrganiserConfig;
use crate::extract::{self, Category, DocumentDate, DocumentKind, ExtractError};

/// File names matching this are treated as bank statements.
pub const DEFAULT_PATTERN: &str = r"Izvod br\. \d+";

/// Appended to every renamed statement.
pub const DEFAULT_SUFFIX: &str = "4SOLUTIONS";

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to list {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0:?} does not have a pdf or xml extension")]
    UnsupportedFile(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A downloaded file whose name matched the statement pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub file_name: String,
    /// The part of the name that matched, e.g. `Izvod br. 42`.
    pub statement: String,
}

/// Everything needed to file one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDetails {
    pub source: PathBuf,
    pub new_name: String,
    pub category: Category,
    pub date: DocumentDate,
    /// Extension without the dot, as it appeared on disk.
    pub extension: String,
    pub kind: DocumentKind,
}

impl FileDetails {
    /// Logical remote folder: `<root>/<year>/<CATEGORY>/<EXT>`.
    pub fn remote_path(&self, root: &str) -> String {
        format!(
            "{root}/{}/{}/{}",
            self.date.year,
            self.category.as_str().to_uppercase(),
            self.extension.to_uppercase()
        )
    }
}

/// `<statement> (<category>) (<dd.mm.yyyy>) - <suffix>.<ext>`
pub fn new_name(
    statement: &str,
    category: Category,
    date: DocumentDate,
    suffix: &str,
    extension: &str,
) -> String {
    format!("{statement} ({category}) ({date}) - {suffix}.{extension}")
}

pub struct Mover {
    pattern: Regex,
    suffix: String,
    downloads_dir: PathBuf,
    archive_dir: PathBuf,
}

impl Mover {
    pub fn new(config: &OrganiserConfig) -> Result<Self, MoveError> {
        Ok(Self {
            pattern: Regex::new(&config.file_pattern)?,
            suffix: config.suffix.clone(),
            downloads_dir: config.downloads_dir.clone(),
            archive_dir: config.archive_dir.clone(),
        })
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Regular files directly in the downloads directory whose names match the pattern.
    pub async fn scan(&self) -> Result<Vec<Candidate>, MoveError> {
        let scan_err = |source| MoveError::Scan {
            path: self.downloads_dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.downloads_dir)
            .await
            .map_err(scan_err)?;

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(statement) = self.pattern.find(&file_name) else {
                trace!(file_name, "Skipping non-matching file.");
                continue;
            };
            let statement = statement.as_str().to_owned();
            // Follows symlinks, like the file will be read later.
            match tokio::fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            candidates.push(Candidate {
                path: entry.path(),
                file_name,
                statement,
            });
        }
        candidates.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        debug!(count = candidates.len(), "Found statements.");
        Ok(candidates)
    }

    /// Work out the category, date and new name of a candidate.
    pub async fn details(&self, candidate: &Candidate) -> Result<FileDetails, MoveError> {
        let extension = candidate
            .path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = DocumentKind::from_extension(&extension)
            .ok_or_else(|| MoveError::UnsupportedFile(candidate.file_name.clone()))?;
        let category = Category::from_file_name(&candidate.file_name);
        let date = extract::extract_date(&candidate.path, category).await?;

        Ok(FileDetails {
            source: candidate.path.clone(),
            new_name: new_name(&candidate.statement, category, date, &self.suffix, &extension),
            category,
            date,
            extension,
            kind,
        })
    }

    /// Local archive location: `<archive>/<year>/<CATEGORY>/<ext>/<new name>`.
    pub fn archive_path(&self, details: &FileDetails) -> PathBuf {
        self.archive_dir
            .join(details.date.year.to_string())
            .join(details.category.as_str().to_uppercase())
            .join(&details.extension)
            .join(&details.new_name)
    }

    /// Move the statement into the archive, creating directories as needed.
    pub async fn relocate(&self, details: &FileDetails) -> Result<PathBuf, MoveError> {
        let to = self.archive_path(details);
        docsort::io::move_file(&details.source, &to)
            .await
            .map_err(|source| MoveError::Relocate {
                from: details.source.clone(),
                to: to.clone(),
                source,
            })?;
        Ok(to)
    }
}
