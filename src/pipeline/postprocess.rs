//! Deterministic cleanup on both sides of the AI extraction call.
//!
//! * [`clean_extracted_text`] tidies pdfium's raw page text before it is
//!   saved and sent to the model: CRLF line endings, zero-width characters and
//!   runs of blank lines only cost tokens.
//! * [`extract_json_object`] recovers the JSON object from a model reply that
//!   wrapped it in prose or Markdown fences despite being told not to.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule sees `\n` only;
//! blank-line collapsing runs after per-line trimming so whitespace-only lines
//! count as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all raw-text cleanup rules in order:
///
/// 1. Normalise line endings (CRLF / CR → LF) and form feeds to newlines
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Trim the whole text
pub fn clean_extracted_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// The span from the first `{` to the last `}` of a model reply, if any.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc\u{000C}d"), "a\nb\nc\nd");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "com\u{00AD}bus\u{200B}tion\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "combustion");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("  flame   \nwax  "), "  flame\nwax");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_clean_extracted_text_full_pipeline() {
        let input = "\u{FEFF}Combustion and Flame\r\n\r\n   \r\n\r\n\r\n\r\nWe use fuels   \r\n";
        assert_eq!(
            clean_extracted_text(input),
            "Combustion and Flame\n\n\nWe use fuels"
        );
    }

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"content\": [{\"type\": \"topic\"}]}\n```\nDone.";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"content\": [{\"type\": \"topic\"}]}")
        );
    }

    #[test]
    fn test_extract_json_missing_or_inverted() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} then {"), None);
        assert_eq!(extract_json_object("{}"), Some("{}"));
    }
}
