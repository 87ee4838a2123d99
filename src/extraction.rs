//! Text extraction seam between uploaded bytes and the enrichment pipeline.
//!
//! Binary office formats are recognised but not decoded here; an extractor for them plugs in
//! behind [`TextExtractor`].

use std::path::Path;
use thiserror::Error;

const UTF8_BOM: char = '\u{feff}';

/// Document formats recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Anything else, treated as UTF-8 text.
    PlainText,
}

impl FileKind {
    /// Classify a file by its extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            _ => Self::PlainText,
        }
    }

    /// Short label used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "text",
        }
    }
}

/// Reasons a document yields no usable text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The file decoded to nothing but whitespace.
    #[error("document contains no text")]
    Empty,
    /// No extractor is available for this format.
    #[error("unsupported document type: {0}")]
    UnsupportedKind(String),
    /// The bytes are not valid UTF-8.
    #[error("document is not valid UTF-8 text")]
    InvalidEncoding,
}

/// Turns raw document bytes into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract the text content of `bytes`, interpreted as `kind`.
    fn extract_text(&self, bytes: &[u8], kind: FileKind) -> Result<String, ExtractionError>;
}

/// Extractor for UTF-8 text files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8], kind: FileKind) -> Result<String, ExtractionError> {
        if kind != FileKind::PlainText {
            return Err(ExtractionError::UnsupportedKind(kind.as_str().to_string()));
        }
        let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::InvalidEncoding)?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text.to_string())
    }
}
