//! Statement date extraction.
//!
//! Dinar statements are downloaded as `...-Realizovani...` files; everything else is treated
//! as a foreign-currency statement. XML statements carry the date as the `DatumIzvoda`
//! attribute of their `Zaglavlje` header. PDF statements print it somewhere after the
//! "Dinarsko knjigovodstvo" or "Devizno knjigovodstvo" heading, depending on the category.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

static XML_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{2})\.(\d{2})\.(\d{4})\s*$")
        .unwrap_or_else(|e| unreachable!("static regex is valid: {e}"))
});

static DINAR_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Dinarsko knjigovodstvo[\s\S]*?(\d{2})\.(\d{2})\.(\d{4})")
        .unwrap_or_else(|e| unreachable!("static regex is valid: {e}"))
});

static FOREIGN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Devizno knjigovodstvo[\s\S]*?(\d{2})\.(\d{2})\.(\d{4})")
        .unwrap_or_else(|e| unreachable!("static regex is valid: {e}"))
});

/// Which ledger a statement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Dinar (local currency) ledger.
    Dinarski,
    /// Foreign currency ledger.
    Devizni,
}

impl Category {
    /// Derive the category from the downloaded file name.
    pub fn from_file_name(name: &str) -> Self {
        if name.contains("-Realizovani") {
            Self::Dinarski
        } else {
            Self::Devizni
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dinarski => "dinarski",
            Self::Devizni => "devizni",
        }
    }

    fn pdf_date(self) -> &'static Regex {
        match self {
            Self::Dinarski => &DINAR_DATE,
            Self::Devizni => &FOREIGN_DATE,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar date printed on a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentDate {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl DocumentDate {
    fn from_captures(caps: &regex::Captures<'_>) -> Option<Self> {
        let day: u8 = caps.get(1)?.as_str().parse().ok()?;
        let month: u8 = caps.get(2)?.as_str().parse().ok()?;
        let year: u16 = caps.get(3)?.as_str().parse().ok()?;
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { day, month, year })
    }
}

impl fmt::Display for DocumentDate {
    /// `dd.mm.yyyy`, as printed on the statements.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:04}", self.day, self.month, self.year)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no statement date found in {file}")]
    DateNotFound { file: String },

    #[error("unsupported document type {extension:?}, expected pdf or xml")]
    UnsupportedCategory { extension: String },

    #[error("failed to read document: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to extract PDF text: {0}")]
    Pdf(String),
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Xml,
}

impl DocumentKind {
    /// Case-insensitive lookup by extension, without the leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("xml") {
            Some(Self::Xml)
        } else {
            None
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Xml => "application/xml",
        }
    }
}

/// Read the statement at `path` and find its date.
#[instrument(skip(path), fields(path = %path.display()))]
pub async fn extract_date(path: &Path, category: Category) -> Result<DocumentDate, ExtractError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = DocumentKind::from_extension(&extension)
        .ok_or(ExtractError::UnsupportedCategory { extension })?;
    let file = path.display().to_string();

    let bytes = tokio::fs::read(path).await?;
    let date = match kind {
        DocumentKind::Xml => date_from_xml(&String::from_utf8_lossy(&bytes)),
        DocumentKind::Pdf => {
            let text = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| ExtractError::Pdf(e.to_string()))?
            .map_err(ExtractError::Pdf)?;
            date_from_pdf_text(&text, category)
        }
    };

    let date = date.ok_or(ExtractError::DateNotFound { file })?;
    debug!(%date, "Found statement date.");
    Ok(date)
}

/// The `DatumIzvoda` attribute of the first `Zaglavlje` element.
///
/// Malformed documents have no date.
pub fn date_from_xml(xml: &str) -> Option<DocumentDate> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "Statement is not well-formed XML.");
            return None;
        }
    };
    let value = doc
        .descendants()
        .find(|node| node.has_tag_name("Zaglavlje"))?
        .attribute("DatumIzvoda")?;
    XML_DATE
        .captures(value)
        .and_then(|caps| DocumentDate::from_captures(&caps))
}

/// The first date following the ledger heading for `category`.
pub fn date_from_pdf_text(text: &str, category: Category) -> Option<DocumentDate> {
    category
        .pdf_date()
        .captures(text)
        .and_then(|caps| DocumentDate::from_captures(&caps))
}
