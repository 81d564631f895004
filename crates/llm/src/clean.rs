use once_cell::sync::Lazy;
use regex::Regex;

const MAX_CLEAN_LENGTH: usize = 50_000;
const TRUNCATION_MARKER: &str = "... [TRUNCATED]";

static STRIP_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg|path|meta|link|head)\b[^>]*>.*?</\1>|<(meta|link)\b[^>]*/?>")
        .expect("valid regex")
});
static HIDDEN_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<([a-z0-9]+)\b[^>]*style\s*=\s*["'][^"']*display\s*:\s*none[^"']*["'][^>]*>.*?</\1>"#).expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip non-content markup and compress whitespace before handing HTML to
/// the LLM, trimming token usage without losing visible job data.
///
/// Mirrors the original crawler's `clean_html`: scripts/styles/head/hidden
/// elements removed, runs of whitespace collapsed to a single space,
/// truncated to `max_length` characters with an explicit marker so the
/// model knows the document was cut.
pub fn clean_html(raw_html: &str, max_length: usize) -> String {
    let without_hidden = HIDDEN_ELEMENT.replace_all(raw_html, "");
    let without_tags = STRIP_TAGS.replace_all(&without_hidden, "");
    let collapsed = WHITESPACE.replace_all(&without_tags, " ");
    let trimmed = collapsed.trim();

    if trimmed.chars().count() > max_length {
        let truncated: String = trimmed.chars().take(max_length).collect();
        format!("{truncated}{TRUNCATION_MARKER}")
    } else {
        trimmed.to_string()
    }
}

pub fn clean_html_default(raw_html: &str) -> String {
    clean_html(raw_html, MAX_CLEAN_LENGTH)
}
