//! Lightweight markdown → plain text for the PDF body.
//!
//! The PDF layout has a single body font, so headings and emphasis are
//! stripped and list bullets become a glyph. Rules run in a fixed order and
//! each one is a pure `&str → String` pass:
//!
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Strip `###` heading markers
//! 3. Strip `##` heading markers
//! 4. Strip `#` heading markers
//! 5. Unwrap `**bold**`
//! 6. Unwrap `*italic*`
//! 7. Replace `- ` list markers with `• `
//! 8. Collapse runs of blank lines to a single blank line
//! 9. Trim the result
//!
//! Anything else (tables, links, code fences) passes through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Bullet glyph that replaces `- ` list markers.
pub const BULLET: &str = "• ";

/// Apply every rule in order.
pub fn markdown_to_plain(markdown: &str) -> String {
    RULES
        .iter()
        .fold(markdown.to_string(), |text, rule| rule(&text))
}

type Rule = fn(&str) -> String;

const RULES: [Rule; 9] = [
    normalise_line_endings,
    strip_h3,
    strip_h2,
    strip_h1,
    unwrap_bold,
    unwrap_italic,
    replace_bullets,
    collapse_blank_lines,
    trim,
];

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rules 2-4: Heading markers ───────────────────────────────────────────────

static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^###[ \t]+").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##[ \t]+").unwrap());
static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#[ \t]+").unwrap());

fn strip_h3(input: &str) -> String {
    RE_H3.replace_all(input, "").into_owned()
}

fn strip_h2(input: &str) -> String {
    RE_H2.replace_all(input, "").into_owned()
}

fn strip_h1(input: &str) -> String {
    RE_H1.replace_all(input, "").into_owned()
}

// ── Rules 5-6: Emphasis ──────────────────────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());

fn unwrap_bold(input: &str) -> String {
    RE_BOLD.replace_all(input, "$1").into_owned()
}

fn unwrap_italic(input: &str) -> String {
    RE_ITALIC.replace_all(input, "$1").into_owned()
}

// ── Rule 7: List bullets ─────────────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- ").unwrap());

fn replace_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, BULLET).into_owned()
}

// ── Rule 8: Blank lines ──────────────────────────────────────────────────────

// A line holding only spaces or tabs counts as blank.
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

// ── Rule 9: Trim ─────────────────────────────────────────────────────────────

fn trim(input: &str) -> String {
    input.trim().to_string()
}
