//! Images (`.jpg` / `.png`): decode, then optical character recognition.
//!
//! Decoding always happens (so a corrupt image is reported as such).  The
//! recognition step needs the `ocr` feature, which links Tesseract; without
//! it the extractor returns [`ExtractError::OcrUnavailable`].

use std::path::Path;

use ::image::{DynamicImage, ImageError};

use super::ExtractError;
use crate::config::OcrConfig;

/// Decode `path` and return the trimmed OCR output.
///
/// An image without recognisable text yields an empty string, not an error.
pub fn extract_text(path: &Path, config: &OcrConfig) -> Result<String, ExtractError> {
    let img = decode(path)?;
    log::debug!(
        "ocr: decoded {}x{} image from {}",
        img.width(),
        img.height(),
        path.display()
    );

    let text = recognize(&img, config)?;
    Ok(text.trim().to_string())
}

fn decode(path: &Path) -> Result<DynamicImage, ExtractError> {
    ::image::open(path).map_err(|e| match e {
        ImageError::IoError(io) => ExtractError::io(path, io),
        other => ExtractError::Image(other.to_string()),
    })
}

/// Run Tesseract over a grayscale copy of `img`.
///
/// Tesseract reads from a file, so the preprocessed image is written to a
/// scratch PNG that is removed when it goes out of scope.
#[cfg(feature = "ocr")]
fn recognize(img: &DynamicImage, config: &OcrConfig) -> Result<String, ExtractError> {
    use tesseract::Tesseract;

    let gray = img.grayscale();

    let scratch = tempfile::Builder::new()
        .prefix("doc-narrator-ocr-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| ExtractError::Ocr(format!("cannot create scratch file: {e}")))?;
    gray.save(scratch.path())
        .map_err(|e| ExtractError::Ocr(format!("cannot write scratch image: {e}")))?;

    let scratch_path = scratch
        .path()
        .to_str()
        .ok_or_else(|| ExtractError::Ocr("scratch path is not valid UTF-8".into()))?;

    Tesseract::new(config.datapath.as_deref(), Some(config.language.as_str()))
        .map_err(|e| ExtractError::Ocr(e.to_string()))?
        .set_image(scratch_path)
        .map_err(|e| ExtractError::Ocr(e.to_string()))?
        .get_text()
        .map_err(|e| ExtractError::Ocr(e.to_string()))
}

#[cfg(not(feature = "ocr"))]
fn recognize(_img: &DynamicImage, _config: &OcrConfig) -> Result<String, ExtractError> {
    Err(ExtractError::OcrUnavailable)
}
