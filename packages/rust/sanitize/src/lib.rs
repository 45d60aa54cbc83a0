//! Text sanitizer for context and response text.
//!
//! [`sanitize`] runs a fixed sequence of removal passes, each a function
//! `&str -> String`. Order matters: code blocks go first so their content can't
//! match the later patterns. The sequence is repeated until the text stops
//! changing, which makes `sanitize` idempotent even when a removal splices two
//! fragments into a new match.

use std::sync::LazyLock;

use regex::Regex;

/// Remove code blocks, URLs, date literals, and Windows paths from `text`.
///
/// Everything outside the removed spans is left byte-for-byte intact;
/// surrounding whitespace is not collapsed.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = run_passes(&current);
        // Every pass only deletes, so a change always shrinks the text.
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

/// Replace line breaks with single spaces.
///
/// Applied to reply and archive text before [`sanitize`], so every record is
/// single-line prose.
pub fn flatten_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn run_passes(text: &str) -> String {
    let mut result = strip_code_blocks(text);
    result = strip_urls(&result);
    result = strip_dates(&result);
    result = strip_windows_paths(&result);
    result
}

// ---------------------------------------------------------------------------
// Pass 1: Fenced code blocks
// ---------------------------------------------------------------------------

fn strip_code_blocks(text: &str) -> String {
    static CODE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"```[\s\S]*?```").expect("valid regex"));

    CODE_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: URL-like tokens
// ---------------------------------------------------------------------------

/// `http://…`, `https://…`, or a bare `://…`, up to the next whitespace.
fn strip_urls(text: &str) -> String {
    static URL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)(?:https?)?://\S+").expect("valid regex"));

    URL_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Date literals
// ---------------------------------------------------------------------------

/// `D/M/YYYY` or `D-M-YYYY` with one consistent separator.
fn strip_dates(text: &str) -> String {
    static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\b[0-9]{1,2}/[0-9]{1,2}/[0-9]{4}\b|\b[0-9]{1,2}-[0-9]{1,2}-[0-9]{4}\b")
            .expect("valid regex")
    });

    DATE_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Windows paths
// ---------------------------------------------------------------------------

/// Two-level `X:\segment\segment`; segments stop at whitespace.
fn strip_windows_paths(text: &str) -> String {
    static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\b[A-Za-z]:\\[^\\\s]+\\[^\\\s]+\b").expect("valid regex")
    });

    PATH_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
