//! Removal of private reasoning spans from raw model output.

use std::sync::LazyLock;

use regex::Regex;

pub const REASONING_OPEN: &str = "<think>";
pub const REASONING_CLOSE: &str = "</think>";

/// Non-greedy, spans newlines.
static REASONING_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("reasoning pattern compiles"));

/// Strip every `<think>…</think>` span, then trim surrounding whitespace.
///
/// Removal repeats until no complete span is left, so markers spliced
/// together by an earlier pass are removed too and the result is a fixed
/// point. An unmatched opening marker is kept as-is.
pub fn strip_reasoning(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped = REASONING_SPAN.replace_all(&current, "");
        if stripped.len() == current.len() {
            return current.trim().to_string();
        }
        current = stripped.into_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_markers_only_trims() {
        assert_eq!(strip_reasoning("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn removes_single_multiline_span() {
        let raw = "<think>\nThe report says male.\nNYHA 2.\n</think>\n\n{\"sex\": \"male\"}";
        assert_eq!(strip_reasoning(raw), "{\"sex\": \"male\"}");
    }

    #[test]
    fn removes_multiple_spans_non_greedily() {
        let raw = "<think>a</think>{\"x\":<think>b</think> 1}";
        assert_eq!(strip_reasoning(raw), "{\"x\": 1}");
    }

    #[test]
    fn keeps_content_between_spans() {
        let raw = "<think>one</think>keep<think>two</think>";
        assert_eq!(strip_reasoning(raw), "keep");
    }

    #[test]
    fn unclosed_marker_is_left_alone() {
        let raw = "<think>still reasoning {\"x\": 1}";
        assert_eq!(strip_reasoning(raw), raw);
    }

    #[test]
    fn spliced_markers_are_removed() {
        let raw = "<thi<think>x</think>nk>hidden</think>{\"a\":1}";
        assert_eq!(strip_reasoning(raw), "{\"a\":1}");
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert_eq!(strip_reasoning(""), "");
        assert_eq!(strip_reasoning(" \n\t "), "");
        assert_eq!(strip_reasoning("<think></think>"), "");
    }

    #[test]
    fn idempotent_on_typical_output() {
        for raw in [
            "<think>x</think>\n{\"a\": true}\n",
            "  plain prose answer ",
            "<think>a\nb</think>  <think>c</think>{}",
            "<thi<think>x</think>nk>hidden</think>{\"a\":1}",
            "<<think></think>think>a</think>b",
        ] {
            let once = strip_reasoning(raw);
            assert_eq!(strip_reasoning(&once), once);
        }
    }
}
