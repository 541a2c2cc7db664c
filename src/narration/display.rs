//! Display surface capability and the in-memory surface behind the summary
//! pane.
//!
//! The narration thread never touches widgets.  It posts
//! [`NarrationEvent`]s; the UI thread feeds them to [`apply_event`], which
//! drives any [`DisplaySurface`].  [`TextSurface`] is the implementation the
//! egui summary view renders from.

use std::collections::BTreeMap;

use egui::text::{LayoutJob, TextFormat};
use egui::{Color32, FontId};

use super::controller::NarrationEvent;

/// Tag name used for the sentence currently being spoken.
pub const HIGHLIGHT_TAG: &str = "highlight";

// ---------------------------------------------------------------------------
// Tag types
// ---------------------------------------------------------------------------

/// Visual style attached to a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagStyle {
    /// Background colour as RGB.
    pub background: [u8; 3],
}

impl TagStyle {
    pub fn background(rgb: [u8; 3]) -> Self {
        Self { background: rgb }
    }
}

/// Half-open byte range `[start, end)` over the displayed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
}

// ---------------------------------------------------------------------------
// DisplaySurface trait
// ---------------------------------------------------------------------------

/// A scrollable text presentation that supports named, styled ranges.
///
/// Offsets are byte offsets into the displayed text.
pub trait DisplaySurface {
    /// Remove all text and tags.
    fn clear(&mut self);

    /// Append `text` at the end.
    fn insert_text(&mut self, text: &str);

    /// Byte offset of the first occurrence of `needle`, searching from the
    /// start.
    fn search(&self, needle: &str) -> Option<usize>;

    /// Attach tag `name` to `[start, end)`, replacing any previous range for
    /// that tag.
    fn apply_tag(&mut self, name: &str, start: usize, end: usize, style: TagStyle);

    /// Detach tag `name` everywhere.
    fn remove_tag(&mut self, name: &str);

    /// Bring `offset` into view.
    fn scroll_to(&mut self, offset: usize);
}

/// Apply one narration event to `surface`.
///
/// A `Sentence` clears the previous highlight, then highlights and scrolls to
/// the first occurrence of the sentence.  A sentence that cannot be found is
/// spoken without a highlight.
pub fn apply_event(surface: &mut dyn DisplaySurface, event: &NarrationEvent, style: TagStyle) {
    match event {
        NarrationEvent::ClearHighlight => surface.remove_tag(HIGHLIGHT_TAG),
        NarrationEvent::Sentence { text, .. } => {
            surface.remove_tag(HIGHLIGHT_TAG);
            match surface.search(text) {
                Some(start) => {
                    surface.apply_tag(HIGHLIGHT_TAG, start, start + text.len(), style);
                    surface.scroll_to(start);
                }
                None => log::debug!("display: sentence not found in summary: {text:?}"),
            }
        }
        NarrationEvent::Finished { .. } => {}
    }
}

// ---------------------------------------------------------------------------
// TextSurface
// ---------------------------------------------------------------------------

/// In-memory [`DisplaySurface`].
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    text: String,
    tags: BTreeMap<String, (HighlightSpan, TagStyle)>,
    scroll_target: Option<usize>,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole content, dropping tags and any pending scroll.
    pub fn set_text(&mut self, text: &str) {
        self.clear();
        self.insert_text(text);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Range currently covered by tag `name`.
    pub fn tag_span(&self, name: &str) -> Option<HighlightSpan> {
        self.tags.get(name).map(|(span, _)| *span)
    }

    /// The pending scroll request, consumed by the view once honoured.
    pub fn take_scroll_target(&mut self) -> Option<usize> {
        self.scroll_target.take()
    }

    /// Build an egui layout job with every tagged range painted in its
    /// background colour.
    pub fn layout_job(&self, font_id: FontId, color: Color32, wrap_width: f32) -> LayoutJob {
        let mut spans: Vec<(HighlightSpan, TagStyle)> = self.tags.values().copied().collect();
        spans.sort_by_key(|(span, _)| span.start);

        let plain = TextFormat {
            font_id,
            color,
            ..Default::default()
        };

        let mut job = LayoutJob::default();
        job.wrap.max_width = wrap_width;

        let mut cursor = 0;
        for (span, style) in spans {
            // Overlapping tags are drawn only where they start after the
            // previous one ends.
            if span.start < cursor {
                continue;
            }
            job.append(&self.text[cursor..span.start], 0.0, plain.clone());
            let [r, g, b] = style.background;
            job.append(
                &self.text[span.start..span.end],
                0.0,
                TextFormat {
                    background: Color32::from_rgb(r, g, b),
                    color: Color32::BLACK,
                    ..plain.clone()
                },
            );
            cursor = span.end;
        }
        job.append(&self.text[cursor..], 0.0, plain);
        job
    }

    fn is_valid_range(&self, start: usize, end: usize) -> bool {
        start <= end
            && end <= self.text.len()
            && self.text.is_char_boundary(start)
            && self.text.is_char_boundary(end)
    }
}

impl DisplaySurface for TextSurface {
    fn clear(&mut self) {
        self.text.clear();
        self.tags.clear();
        self.scroll_target = None;
    }

    fn insert_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn search(&self, needle: &str) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        self.text.find(needle)
    }

    fn apply_tag(&mut self, name: &str, start: usize, end: usize, style: TagStyle) {
        if !self.is_valid_range(start, end) {
            log::warn!("display: ignoring tag {name:?} over invalid range {start}..{end}");
            return;
        }
        self.tags
            .insert(name.to_string(), (HighlightSpan { start, end }, style));
    }

    fn remove_tag(&mut self, name: &str) {
        self.tags.remove(name);
    }

    fn scroll_to(&mut self, offset: usize) {
        self.scroll_target = Some(offset.min(self.text.len()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const YELLOW: TagStyle = TagStyle {
        background: [255, 255, 0],
    };

    fn surface(text: &str) -> TextSurface {
        let mut s = TextSurface::new();
        s.set_text(text);
        s
    }

    fn sentence(index: usize, text: &str) -> NarrationEvent {
        NarrationEvent::Sentence {
            session: 1,
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn search_finds_first_occurrence() {
        let s = surface("Go. Stop. Go.");
        assert_eq!(s.search("Go."), Some(0));
        assert_eq!(s.search("Stop."), Some(4));
        assert_eq!(s.search("Missing."), None);
        assert_eq!(s.search(""), None);
    }

    #[test]
    fn sentence_event_highlights_and_scrolls() {
        let mut s = surface("First one. Second one.");
        apply_event(&mut s, &sentence(1, "Second one."), YELLOW);

        assert_eq!(
            s.tag_span(HIGHLIGHT_TAG),
            Some(HighlightSpan { start: 11, end: 22 })
        );
        assert_eq!(s.take_scroll_target(), Some(11));
        assert_eq!(s.take_scroll_target(), None);
    }

    #[test]
    fn next_sentence_replaces_previous_highlight() {
        let mut s = surface("First one. Second one.");
        apply_event(&mut s, &sentence(0, "First one."), YELLOW);
        apply_event(&mut s, &sentence(1, "Second one."), YELLOW);

        assert_eq!(s.tag_span(HIGHLIGHT_TAG).map(|h| h.start), Some(11));
    }

    #[test]
    fn wrapped_summary_sentences_are_found_whole() {
        use crate::summarize::{split_sentences, summarize, SummaryMode};

        let extracted = "The quick brown fox jumps over\nthe lazy dog near the river.\n\
                         It was a sunny day and\neveryone was happy.\nThe end came\nsoon after.";
        let summary = summarize(extracted, SummaryMode::Primary);
        let mut s = surface(&summary);

        let spoken = split_sentences(&summary);
        assert_eq!(spoken.len(), 2);
        for (index, text) in spoken.iter().enumerate() {
            apply_event(&mut s, &sentence(index, text), YELLOW);
            let span = s.tag_span(HIGHLIGHT_TAG).expect("highlighted");
            assert_eq!(&summary[span.start..span.end], *text);
        }
    }

    #[test]
    fn unknown_sentence_leaves_no_highlight() {
        let mut s = surface("First one. Second one.");
        apply_event(&mut s, &sentence(0, "First one."), YELLOW);
        apply_event(&mut s, &sentence(1, "Not displayed."), YELLOW);

        assert_eq!(s.tag_span(HIGHLIGHT_TAG), None);
    }

    #[test]
    fn clear_highlight_event_removes_tag() {
        let mut s = surface("Only.");
        apply_event(&mut s, &sentence(0, "Only."), YELLOW);
        apply_event(&mut s, &NarrationEvent::ClearHighlight, YELLOW);
        assert_eq!(s.tag_span(HIGHLIGHT_TAG), None);
        assert_eq!(s.text(), "Only.");
    }

    #[test]
    fn set_text_drops_tags() {
        let mut s = surface("Old text.");
        apply_event(&mut s, &sentence(0, "Old text."), YELLOW);
        s.set_text("New text.");
        assert_eq!(s.tag_span(HIGHLIGHT_TAG), None);
        assert_eq!(s.take_scroll_target(), None);
    }

    #[test]
    fn invalid_ranges_are_ignored() {
        let mut s = surface("héllo");
        s.apply_tag("x", 2, 3, YELLOW); // inside 'é'
        s.apply_tag("y", 3, 99, YELLOW);
        assert_eq!(s.tag_span("x"), None);
        assert_eq!(s.tag_span("y"), None);
    }

    #[test]
    fn layout_job_covers_whole_text() {
        let mut s = surface("Alpha. Beta. Gamma.");
        apply_event(&mut s, &sentence(1, "Beta."), YELLOW);

        let job = s.layout_job(FontId::default(), Color32::WHITE, 300.0);
        assert_eq!(job.text, "Alpha. Beta. Gamma.");
        assert_eq!(job.sections.len(), 3);
        assert_eq!(job.sections[1].byte_range, 7..12);
        assert_eq!(
            job.sections[1].format.background,
            Color32::from_rgb(255, 255, 0)
        );
    }
}
