//! Deterministic cleanup of text returned by the vision model.
//!
//! Two entry points:
//!
//! * [`strip_code_fences`]: unwrap a ```` ```json ... ``` ```` block around
//!   an answer that was asked to be bare JSON.
//! * [`clean_recognized_text`]: tidy transcribed page text without
//!   touching its content.
//!
//! ## Rule Order
//!
//! Fences go first so later rules see the real text; line endings are
//! normalised before any per-line rule.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tidy transcribed page text.
///
/// Rules (applied in order):
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse long runs of spaces inside a line
/// 6. Collapse 3+ consecutive blank lines down to 1
/// 7. Trim leading and trailing blank lines
pub fn clean_recognized_text(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_space_runs(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").unwrap());

/// Remove a single outer code fence, with or without a language tag.
pub fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse runs of spaces ──────────────────────────────────────────
//
// Column-aligned receipts come back padded with dozens of spaces. Runs of
// six or more are squeezed to four so columns stay visibly separated.

static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{6,}").unwrap());

fn collapse_space_runs(input: &str) -> String {
    RE_SPACE_RUN.replace_all(input, "    ").to_string()
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}
