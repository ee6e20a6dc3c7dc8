//! Post-processing: deterministic cleanup of generated prose.
//!
//! Models occasionally wrap answers in code fences, prefix them with a
//! label ("TLDR:", "Answer:"), use CRLF line endings or leave zero-width
//! characters behind. None of that belongs in the prompts of later chain
//! steps or in the written file, so every completion passes through here.
//!
//! Rule order matters: fences are stripped before line endings are
//! normalised (the fence regex expects `\n`), and the final-newline pass
//! runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cleanup for a completion that feeds the next chain step.
///
/// Same rules as [`clean_generated`] but trimmed, without a final newline.
pub fn clean_intermediate(input: &str) -> String {
    let s = strip_code_fences(input.trim());
    let s = normalise_line_endings(&s);
    let s = strip_leading_label(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    remove_invisible_chars(&s).trim().to_string()
}

/// Cleanup for the final related-work section written to disk.
///
/// Rules (in order):
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip a leading answer label
/// 4. Trim trailing whitespace per line
/// 5. Collapse runs of blank lines to one
/// 6. Strip invisible Unicode
/// 7. End with exactly one newline
pub fn clean_generated(input: &str) -> String {
    ensure_final_newline(&clean_intermediate(input))
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip a leading answer label ─────────────────────────────────────

static RE_LEADING_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?(?:tl;?dr|answer|output|response)(?:\*\*)?\s*:\s*(?:\*\*)?\s*")
        .unwrap()
});

fn strip_leading_label(input: &str) -> String {
    RE_LEADING_LABEL.replace(input, "").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse blank-line runs ─────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 7: Ensure a single final newline ────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_code_fences("```text\nPrior work.\n```"), "Prior work.");
        assert_eq!(strip_code_fences("```\nA\nB\n```"), "A\nB");
        assert_eq!(strip_code_fences("No fences"), "No fences");
    }

    #[test]
    fn test_inner_fence_kept() {
        let input = "Text before\n```\ncode\n```";
        assert_eq!(strip_code_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_leading_label() {
        assert_eq!(strip_leading_label("TLDR: We do X."), "We do X.");
        assert_eq!(strip_leading_label("tl;dr:We do X."), "We do X.");
        assert_eq!(strip_leading_label("**Answer:** Y"), "Y");
        assert_eq!(
            strip_leading_label("Output layers are discussed."),
            "Output layers are discussed."
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(
            remove_invisible_chars("rela\u{200B}ted\u{FEFF} work\u{00AD}s"),
            "related works"
        );
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_clean_generated_full_pipeline() {
        let input = "```markdown\r\nTLDR: Prior work   \r\n\r\n\r\n\r\nstudied X.\r\n```";
        assert_eq!(clean_generated(input), "Prior work\n\nstudied X.\n");
    }

    #[test]
    fn test_clean_intermediate_has_no_final_newline() {
        assert_eq!(clean_intermediate("  Facets: A \n\n"), "Facets: A");
    }
}
