//! Word documents (`.docx`): the paragraphs of `word/document.xml`.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml` as
//! WordprocessingML.  Paragraphs are `<w:p>` elements and their visible text
//! sits in `<w:t>` runs, with `<w:tab/>` and `<w:br/>` standing in for tabs
//! and line breaks.
//!
//! Text boxes (`<w:txbxContent>`) nest whole paragraphs inside a run of the
//! surrounding paragraph.  They are skipped, so only body paragraphs are
//! read.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{DocumentKind, ExtractError, Extracted};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract paragraph texts from `path`, joined with `\n` in document order.
pub fn extract_text(path: &Path) -> Result<Extracted, ExtractError> {
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Docx(format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::io(path, e))?;

    let paragraphs = paragraphs(&xml)?;
    log::debug!("docx: {} paragraph(s) in {}", paragraphs.len(), path.display());

    Ok(Extracted::or_no_text(&paragraphs.join("\n"), DocumentKind::Document))
}

/// Walk WordprocessingML and collect the text of each top-level paragraph.
fn paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_text = false;
    // Nesting depth of text boxes; everything inside one is ignored.
    let mut text_box = 0usize;

    loop {
        match reader.read_event().map_err(|e| docx_err(&reader, e))? {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"txbxContent" => text_box += 1,
            Event::End(e) if e.local_name().as_ref() == b"txbxContent" => {
                text_box = text_box.saturating_sub(1);
            }
            _ if text_box > 0 => {}
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    if depth == 0 {
                        current.clear();
                    }
                    depth += 1;
                }
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) if depth > 0 => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"p" => paragraphs.push(String::new()),
            Event::Text(t) if in_text => {
                let chunk = std::str::from_utf8(&t).map_err(|e| ExtractError::Docx(e.to_string()))?;
                current.push_str(chunk);
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(c) = r.resolve_char_ref().map_err(|e| docx_err(&reader, e))? {
                    current.push(c);
                } else {
                    let name = std::str::from_utf8(&r).map_err(|e| ExtractError::Docx(e.to_string()))?;
                    let resolved = quick_xml::escape::resolve_predefined_entity(name)
                        .ok_or_else(|| ExtractError::Docx(format!("unknown entity &{name};")))?;
                    current.push_str(resolved);
                }
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn docx_err(reader: &Reader<&[u8]>, e: quick_xml::Error) -> ExtractError {
    ExtractError::Docx(format!(
        "{DOCUMENT_PART} at byte {}: {e}",
        reader.buffer_position()
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
