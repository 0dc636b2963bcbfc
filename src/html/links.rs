use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::core::error::{Error, ErrorKind, Result};

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Parse an absolute HTTP(S) URL and normalize it into a location: scheme and
/// host lowercased by the parser, fragment dropped.
pub fn normalize(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !is_http(&url) {
        return Err(Error::new(
            ErrorKind::InvalidUrl,
            format!("not an http(s) url: {raw}"),
        ));
    }
    url.set_fragment(None);
    Ok(url)
}

/// Every `href` in the page, resolved against `base`, fragment dropped,
/// restricted to http/https, in source order. Unresolvable values are
/// silently skipped.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let mut links = Vec::new();

    for caps in HREF.captures_iter(html) {
        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();

        if let Ok(mut url) = base.join(raw) {
            if is_http(&url) {
                url.set_fragment(None);
                links.push(url);
            }
        }
    }

    links
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/page.html").unwrap()
    }

    #[test]
    fn resolves_relative_links_against_base() {
        let html = r#"<a href="other.html">x</a> <a href="/root.html">y</a>"#;
        let links = extract_links(&base(), html);
        let strings: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            strings,
            vec![
                "https://example.com/docs/other.html",
                "https://example.com/root.html",
            ]
        );
    }

    #[test]
    fn drops_fragments_and_keeps_source_order() {
        let html = r#"<a href="b.html#section">b</a><a HREF='a.html'>a</a>"#;
        let links = extract_links(&base(), html);
        let strings: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            strings,
            vec![
                "https://example.com/docs/b.html",
                "https://example.com/docs/a.html",
            ]
        );
    }

    #[test]
    fn non_http_schemes_are_discarded() {
        let html = r#"<a href="mailto:me@example.com">m</a><a href="ftp://x/y">f</a>"#;
        assert!(extract_links(&base(), html).is_empty());
    }

    #[test]
    fn normalize_lowercases_and_strips_fragment() {
        let url = normalize("HTTPS://Example.COM/Path#frag").unwrap();
        assert_eq!(url.as_str(), "https://example.com/Path");
    }

    #[test]
    fn normalize_rejects_other_schemes() {
        assert!(normalize("file:///etc/passwd").is_err());
        assert!(normalize("not a url").is_err());
    }
}
