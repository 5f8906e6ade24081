use regex::Regex;
use std::sync::OnceLock;

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Collapse runs of whitespace and trim. Everything else is read as written.
pub fn normalize_text(text: &str) -> String {
    whitespace_pattern().replace_all(text, " ").trim().to_string()
}
