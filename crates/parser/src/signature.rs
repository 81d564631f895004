use once_cell::sync::Lazy;
use scraper::{Html, Selector};

const SIGNATURE_ELEMENT_LIMIT: usize = 200;

static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("*").expect("valid selector"));

/// A structural fingerprint of a page's DOM: tag names and class lists for
/// the first 200 elements in document order, hashed with MD5.
///
/// Invariant to text content, whitespace, attribute order, and the order
/// of tokens within a `class` attribute; sensitive to tag/class structure.
/// Pages that share a layout (e.g. paginated job lists on the same site)
/// produce the same signature, which is what makes the selector cache
/// worth having.
pub fn compute_page_signature(html: &str) -> String {
    let document = Html::parse_document(html);

    let parts: Vec<String> = document
        .select(&ANY_ELEMENT)
        .take(SIGNATURE_ELEMENT_LIMIT)
        .map(|el| {
            let mut classes: Vec<&str> = el.value().classes().collect();
            classes.sort_unstable();
            format!("{}:{}", el.value().name(), classes.join("."))
        })
        .collect();

    let signature = parts.join("|");
    format!("{:x}", md5::compute(signature.as_bytes()))
}
