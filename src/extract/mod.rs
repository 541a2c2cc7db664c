//! Text extraction from user-selected files.
//!
//! # Dispatch
//!
//! ```text
//! path ──DocumentKind::from_path──▶ Image     ─▶ ocr::extract_text     (decode + OCR)
//!                                   Pdf       ─▶ pdf::extract_text     (pdf-extract, per page)
//!                                   Document  ─▶ docx::extract_text    (zip + quick-xml)
//!                                   PlainText ─▶ text::extract_text    (UTF-8 read)
//!                                   Unsupported ─▶ Extracted::Unsupported
//! ```
//!
//! The kind is resolved once from the file extension when the file is picked;
//! content is never sniffed.  An empty result is a value
//! ([`Extracted::NoTextFound`]), not an error.  Only I/O and decoding
//! failures surface as [`ExtractError`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use doc_narrator::config::OcrConfig;
//! use doc_narrator::extract::{extract, DocumentKind};
//!
//! let path = std::path::Path::new("report.pdf");
//! let kind = DocumentKind::from_path(path);
//! match extract(path, kind, &OcrConfig::default()) {
//!     Ok(extracted) => println!("{}", extracted.into_text()),
//!     Err(e) => println!("Error: {e}"),
//! }
//! ```

pub mod docx;
pub mod ocr;
pub mod pdf;
pub mod text;

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::config::OcrConfig;

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

/// The closed set of file kinds the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `.jpg` / `.png`: text is recovered with OCR.
    Image,
    /// `.pdf`
    Pdf,
    /// `.docx` (Office Open XML word-processing document).
    Document,
    /// `.txt`, read as UTF-8.
    PlainText,
    /// Any other extension, or none at all.
    Unsupported,
}

impl DocumentKind {
    /// Extensions offered by the file picker, grouped as in the picker's
    /// filter list.
    pub const IMAGE_EXTENSIONS: &'static [&'static str] = &["jpg", "png"];
    pub const PDF_EXTENSIONS: &'static [&'static str] = &["pdf"];
    pub const DOCUMENT_EXTENSIONS: &'static [&'static str] = &["docx"];
    pub const TEXT_EXTENSIONS: &'static [&'static str] = &["txt"];
    pub const ALL_EXTENSIONS: &'static [&'static str] = &["jpg", "png", "pdf", "docx", "txt"];

    /// Resolve the kind from the (case-insensitive) file extension.
    ///
    /// ```
    /// use doc_narrator::extract::DocumentKind;
    /// use std::path::Path;
    ///
    /// assert_eq!(DocumentKind::from_path(Path::new("scan.PNG")), DocumentKind::Image);
    /// assert_eq!(DocumentKind::from_path(Path::new("notes.txt")), DocumentKind::PlainText);
    /// assert_eq!(DocumentKind::from_path(Path::new("sheet.xlsx")), DocumentKind::Unsupported);
    /// ```
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("jpg" | "png") => Self::Image,
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Document,
            Some("txt") => Self::PlainText,
            _ => Self::Unsupported,
        }
    }

    /// Short format tag used in the "no text found" messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Pdf => "PDF",
            Self::Document => "DOCX",
            Self::PlainText => "TXT",
            Self::Unsupported => "FILE",
        }
    }
}

// ---------------------------------------------------------------------------
// Extracted
// ---------------------------------------------------------------------------

/// Successful outcome of an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// Text recovered from the file, already trimmed.
    Text(String),
    /// The file was read but held no text.
    NoTextFound(DocumentKind),
    /// The extension is not one the extractor handles.
    Unsupported,
}

impl Extracted {
    /// Wrap trimmed `text`, mapping an empty string to
    /// [`Extracted::NoTextFound`] for `kind`.
    pub(crate) fn or_no_text(text: &str, kind: DocumentKind) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::NoTextFound(kind)
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// The string shown to the user in the extracted-text pane.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Extracted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::NoTextFound(kind) => write!(f, "No text found in {}!", kind.label()),
            Self::Unsupported => f.write_str("Unsupported file format!"),
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractError
// ---------------------------------------------------------------------------

/// I/O and decoding failures.  The UI renders these as `Error: <message>`.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be opened or read (includes invalid UTF-8 in a
    /// plain-text file).
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The PDF could not be parsed.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// The DOCX archive or its `word/document.xml` part is malformed.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    /// The image could not be decoded.
    #[error("cannot decode image: {0}")]
    Image(String),

    /// The OCR engine failed to initialise or to recognise the image.
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// The binary was built without the `ocr` feature.
    #[error("OCR support is not available in this build (enable the `ocr` feature)")]
    OcrUnavailable,
}

impl ExtractError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

/// Extract text from `path`, treating it as `kind`.
///
/// `ocr_config` is only consulted for [`DocumentKind::Image`].
pub fn extract(
    path: &Path,
    kind: DocumentKind,
    ocr_config: &OcrConfig,
) -> Result<Extracted, ExtractError> {
    log::debug!("extract: {} as {:?}", path.display(), kind);

    match kind {
        DocumentKind::Image => ocr::extract_text(path, ocr_config).map(Extracted::Text),
        DocumentKind::Pdf => pdf::extract_text(path),
        DocumentKind::Document => docx::extract_text(path),
        DocumentKind::PlainText => text::extract_text(path),
        DocumentKind::Unsupported => Ok(Extracted::Unsupported),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
