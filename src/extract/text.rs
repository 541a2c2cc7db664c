//! Plain-text files, read as UTF-8.

use std::path::Path;

use super::{DocumentKind, ExtractError, Extracted};

/// Read `path` as UTF-8 and return its trimmed content.
///
/// Invalid UTF-8 surfaces as [`ExtractError::Io`] (`InvalidData`).
pub fn extract_text(path: &Path) -> Result<Extracted, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    Ok(Extracted::or_no_text(&content, DocumentKind::PlainText))
}
