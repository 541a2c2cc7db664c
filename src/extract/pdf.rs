//! PDF files via `pdf-extract`, one page at a time.
//!
//! `pdf-extract` panics on some malformed inputs instead of returning an
//! error, so the call is wrapped in `catch_unwind` and a panic is reported as
//! [`ExtractError::Pdf`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use super::{DocumentKind, ExtractError, Extracted};

/// Extract the text of every page of `path`, in page order.
///
/// Pages without text are skipped; each remaining page is followed by a
/// newline and the joined result is trimmed.  A document where no page yields
/// text maps to [`Extracted::NoTextFound`].
pub fn extract_text(path: &Path) -> Result<Extracted, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    let pages = pages_from_mem(&bytes)?;

    log::debug!("pdf: {} page(s) in {}", pages.len(), path.display());

    Ok(join_pages(&pages))
}

fn pages_from_mem(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    match catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked on malformed input".into())),
    }
}

fn join_pages(pages: &[String]) -> Extracted {
    let mut text = String::new();
    for page in pages.iter().filter(|p| !p.trim().is_empty()) {
        text.push_str(page);
        text.push('\n');
    }
    Extracted::or_no_text(&text, DocumentKind::Pdf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
