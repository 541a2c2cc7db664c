//! Extractive summarisation by sentence truncation.
//!
//! A summary is the leading run of sentences of the extracted text.  Two
//! truncation modes exist:
//!
//! | Mode        | Sentences kept              |
//! |-------------|-----------------------------|
//! | `Primary`   | `max(2, n / 3)`, at most `n` |
//! | `Alternate` | `max(3, n / 2)`, at most `n` |
//!
//! The narration module re-tokenizes the summary with [`split_sentences`] so
//! both sides agree on sentence boundaries.

pub mod sentences;

pub use sentences::split_sentences;

// ---------------------------------------------------------------------------
// SummaryMode
// ---------------------------------------------------------------------------

/// Which truncation rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryMode {
    /// Run automatically after each file load.
    #[default]
    Primary,
    /// "Re-summarize": a looser truncation producing a longer summary.
    Alternate,
}

impl SummaryMode {
    /// Number of leading sentences kept out of `sentence_count`.
    ///
    /// ```
    /// use doc_narrator::summarize::SummaryMode;
    ///
    /// assert_eq!(SummaryMode::Primary.keep(9), 3);
    /// assert_eq!(SummaryMode::Alternate.keep(9), 4);
    /// assert_eq!(SummaryMode::Primary.keep(1), 1);
    /// assert_eq!(SummaryMode::Alternate.keep(0), 0);
    /// ```
    pub fn keep(self, sentence_count: usize) -> usize {
        let (floor, divisor) = match self {
            SummaryMode::Primary => (2, 3),
            SummaryMode::Alternate => (3, 2),
        };
        (sentence_count / divisor).max(floor).min(sentence_count)
    }
}

// ---------------------------------------------------------------------------
// summarize
// ---------------------------------------------------------------------------

/// Keep the leading sentences of `text` according to `mode`, joined by a
/// single space.
pub fn summarize(text: &str, mode: SummaryMode) -> String {
    let sentences = split_sentences(text);
    let keep = mode.keep(sentences.len());
    log::debug!(
        "summarize: {:?} keeps {keep} of {} sentence(s)",
        mode,
        sentences.len()
    );
    sentences[..keep].join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
