//! Sanitizing rendered HTML and turning it into markdown for the model.

use std::sync::OnceLock;

use scraper::{Html, Selector};

/// Elements that never carry review content. `noscript` bodies come back as
/// escaped markup from a scripting parser, so they go too.
const NON_CONTENT_SELECTOR: &str = "header, footer, script, style, noscript";

fn non_content() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse(NON_CONTENT_SELECTOR).expect("static selector"))
}

/// Remove navigation chrome, scripts and style blocks from `html`.
///
/// Parsing is best effort and never fails. Input with nothing to remove is
/// returned byte for byte, so running this on its own output is a no-op.
pub fn sanitize(html: &str) -> String {
    let mut doc = Html::parse_document(html);
    let doomed: Vec<_> = doc.select(non_content()).map(|el| el.id()).collect();
    if doomed.is_empty() {
        return html.to_string();
    }
    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
    doc.html()
}

/// Convert sanitized HTML into markdown, keeping link targets inline.
pub fn textualize(html: &str) -> std::io::Result<String> {
    htmd::convert(html)
}

/// Sanitize then textualize a freshly rendered page.
pub fn html_to_markdown(raw_html: &str) -> std::io::Result<String> {
    textualize(&sanitize(raw_html))
}
