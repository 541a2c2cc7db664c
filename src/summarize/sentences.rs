//! Sentence tokenization on top of Unicode sentence boundaries (UAX #29).
//!
//! UAX #29 breaks after every line separator and after any full stop that
//! precedes an upper-case word.  Text from PDFs and OCR is hard-wrapped and
//! full of titles like "Dr.", so raw boundaries are merged back together:
//!
//! * a boundary caused by a lone line break, where the text before it has no
//!   terminal punctuation, joins the two lines into one sentence;
//! * a boundary right after a known abbreviation or a single-letter initial
//!   is dropped;
//! * a blank line always ends the sentence (paragraph break).
//!
//! Sentences are slices of the input, so a wrapped sentence keeps its inner
//! line break.

use unicode_segmentation::UnicodeSegmentation;

/// Characters that end a sentence.
const TERMINALS: &[char] = &['.', '!', '?', '…', '。', '！', '？', '‼', '⁇', '⁈', '⁉'];

/// Closing quotes and brackets allowed after the terminal punctuation.
const CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '”', '’', '»', '」', '』'];

/// Opening quotes and brackets stripped before matching an abbreviation.
const OPENERS: &[char] = &['"', '\'', '(', '[', '{', '“', '‘', '«'];

/// Abbreviations after which a full stop does not end a sentence, lower-case.
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "rev.", "gen.", "col.",
    "capt.", "lt.", "sgt.", "gov.", "sen.", "rep.", "hon.", "vs.", "e.g.", "i.e.", "cf.",
    "approx.", "fig.", "figs.", "vol.", "pp.", "ch.", "sec.", "dept.", "inc.",
    "ltd.", "corp.", "co.", "jan.", "feb.", "mar.", "apr.", "jun.", "jul.", "aug.", "sep.",
    "sept.", "oct.", "nov.", "dec.", "a.m.", "p.m.", "u.s.", "u.k.",
];

/// Split `text` into trimmed, non-empty sentences in reading order.
///
/// ```
/// use doc_narrator::summarize::split_sentences;
///
/// let s = split_sentences("It rained. We stayed in! Did you?");
/// assert_eq!(s, vec!["It rained.", "We stayed in!", "Did you?"]);
///
/// let s = split_sentences("Dr. Smith met Mr. Jones. They talked.");
/// assert_eq!(s, vec!["Dr. Smith met Mr. Jones.", "They talked."]);
/// ```
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    // Byte range of the sentence being assembled.
    let mut pending: Option<(usize, usize)> = None;

    let mut flush = |pending: &mut Option<(usize, usize)>| {
        if let Some((start, end)) = pending.take() {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
        }
    };

    for (offset, segment) in text.split_sentence_bound_indices() {
        if segment.trim().is_empty() {
            // A whitespace-only segment is a blank line.
            flush(&mut pending);
            continue;
        }

        let start = pending.map_or(offset, |(start, _)| start);
        pending = Some((start, offset + segment.len()));

        if !continues_past(segment) {
            flush(&mut pending);
        }
    }
    flush(&mut pending);

    sentences
}

/// Whether the boundary at the end of `segment` should be ignored.
fn continues_past(segment: &str) -> bool {
    let body = segment.trim_end();
    let trailing = &segment[body.len()..];

    if ends_with_abbreviation(body) {
        return true;
    }

    let line_breaks = trailing.matches('\n').count() + trailing.matches('\r').count()
        - trailing.matches("\r\n").count();
    line_breaks == 1 && !ends_with_terminal(body)
}

fn ends_with_terminal(body: &str) -> bool {
    body.trim_end_matches(CLOSERS).ends_with(TERMINALS)
}

fn ends_with_abbreviation(body: &str) -> bool {
    let Some(word) = body.split_whitespace().next_back() else {
        return false;
    };
    let word = word.trim_start_matches(OPENERS);

    // Initials such as the "J." in "J. Smith".
    let mut chars = word.chars();
    if let (Some(first), Some('.'), None) = (chars.next(), chars.next(), chars.next()) {
        if first.is_uppercase() {
            return true;
        }
    }

    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_inputs_have_no_sentences() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences(" \n\n\t").is_empty());
    }

    #[test]
    fn trailing_text_without_punctuation_is_a_sentence() {
        assert_eq!(
            split_sentences("A full stop. and then some lower case. No end"),
            vec!["A full stop. and then some lower case.", "No end"]
        );
    }

    #[test]
    fn hard_wrapped_lines_form_one_sentence() {
        let text = "The quick brown fox jumps over\nthe lazy dog near the river.\n\
                    It was a sunny day and\neveryone was happy.\nThe end came\nsoon after.";
        assert_eq!(
            split_sentences(text),
            vec![
                "The quick brown fox jumps over\nthe lazy dog near the river.",
                "It was a sunny day and\neveryone was happy.",
                "The end came\nsoon after.",
            ]
        );
    }

    #[test]
    fn crlf_wrapped_lines_are_joined() {
        assert_eq!(
            split_sentences("Scanned pages wrap\r\nin odd places.\r\nNext one."),
            vec!["Scanned pages wrap\r\nin odd places.", "Next one."]
        );
    }

    #[test]
    fn blank_line_ends_an_unpunctuated_heading() {
        assert_eq!(
            split_sentences("Introduction\n\nThis paper starts here.\nIt ends here."),
            vec!["Introduction", "This paper starts here.", "It ends here."]
        );
    }

    #[test]
    fn abbreviations_do_not_end_sentences() {
        assert_eq!(
            split_sentences("Dr. Smith met Mr. Jones. They talked."),
            vec!["Dr. Smith met Mr. Jones.", "They talked."]
        );
        assert_eq!(
            split_sentences("See Fig. 3 for details. Then read Vol. II of the series."),
            vec!["See Fig. 3 for details.", "Then read Vol. II of the series."]
        );
    }

    #[test]
    fn initials_do_not_end_sentences() {
        assert_eq!(
            split_sentences("The novel is by J. R. Tolkien. It is long."),
            vec!["The novel is by J. R. Tolkien.", "It is long."]
        );
    }

    #[test]
    fn abbreviation_at_a_line_break_is_joined() {
        assert_eq!(
            split_sentences("We met Prof.\nAdams at noon. Lunch followed."),
            vec!["We met Prof.\nAdams at noon.", "Lunch followed."]
        );
    }

    #[test]
    fn quoted_terminal_still_ends_sentence() {
        assert_eq!(
            split_sentences("He said \"stop.\"\nShe left."),
            vec!["He said \"stop.\"", "She left."]
        );
    }

    #[test]
    fn sentences_borrow_from_input() {
        let text = String::from("One. Two.");
        let sentences = split_sentences(&text);
        let base = text.as_ptr() as usize;
        let second = sentences[1].as_ptr() as usize;
        assert_eq!(second - base, 5);
    }

    #[test]
    fn splitting_a_joined_summary_is_stable() {
        let text = "Alpha runs\nacross lines. Beta is short. Gamma too.";
        let first = split_sentences(text);
        let rejoined = first.join(" ");
        assert_eq!(split_sentences(&rejoined), first);
    }

    #[test]
    fn non_latin_punctuation() {
        assert_eq!(
            split_sentences("今日は晴れです。明日は雨です。"),
            vec!["今日は晴れです。", "明日は雨です。"]
        );
    }
}
