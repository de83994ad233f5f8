use scraper::{Html, Selector};
use url::Url;

/// Metadata pulled out of a single page. Absent fields are empty strings,
/// never errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
    pub favicon: String,
    pub site_name: String,
}

enum Attr {
    Content,
    Href,
    Text,
}

/// One (selector, attribute) source in a fallback chain.
struct Source {
    selector: &'static str,
    attr: Attr,
}

const TITLE_SOURCES: &[Source] = &[
    Source { selector: r#"meta[property="og:title"]"#, attr: Attr::Content },
    Source { selector: r#"meta[name="twitter:title"]"#, attr: Attr::Content },
    Source { selector: "title", attr: Attr::Text },
];

const DESCRIPTION_SOURCES: &[Source] = &[
    Source { selector: r#"meta[property="og:description"]"#, attr: Attr::Content },
    Source { selector: r#"meta[name="twitter:description"]"#, attr: Attr::Content },
    Source { selector: r#"meta[name="description"]"#, attr: Attr::Content },
];

const IMAGE_SOURCES: &[Source] = &[
    Source { selector: r#"meta[property="og:image"]"#, attr: Attr::Content },
    Source { selector: r#"meta[name="twitter:image"]"#, attr: Attr::Content },
];

const SITE_NAME_SOURCES: &[Source] = &[
    Source { selector: r#"meta[property="og:site_name"]"#, attr: Attr::Content },
];

// rel=icon wins over shortcut/apple-touch regardless of document order
const FAVICON_SOURCES: &[Source] = &[
    Source { selector: r#"link[rel="icon"]"#, attr: Attr::Href },
    Source { selector: r#"link[rel="shortcut icon"]"#, attr: Attr::Href },
    Source { selector: r#"link[rel="apple-touch-icon"]"#, attr: Attr::Href },
];

/// Evaluate an ordered source chain against the document and take the first
/// non-empty value, trimmed.
fn first_non_empty(document: &Html, sources: &[Source]) -> Option<String> {
    for source in sources {
        let selector = Selector::parse(source.selector).unwrap();
        for element in document.select(&selector) {
            let value = match source.attr {
                Attr::Content => element.attr("content").unwrap_or_default().to_string(),
                Attr::Href => element.attr("href").unwrap_or_default().to_string(),
                Attr::Text => element.text().collect::<String>(),
            };
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Resolve a possibly-relative href against the page URL.
fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();

    if href.starts_with("//") {
        return format!("https:{href}");
    }

    if href.starts_with("http") {
        return href.to_string();
    }

    match Url::parse(base).and_then(|base| base.join(href)) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Extract preview metadata from fetched HTML.
///
/// Each field walks its fallback chain and keeps the first non-empty hit;
/// image and favicon values are resolved to absolute URLs against `url`.
/// The /favicon.ico probe for pages without any icon tag happens at the
/// service level, not here; this function never touches the network.
pub fn extract(url: &str, html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = first_non_empty(&document, TITLE_SOURCES).unwrap_or_default();
    let description = first_non_empty(&document, DESCRIPTION_SOURCES).unwrap_or_default();
    let site_name = first_non_empty(&document, SITE_NAME_SOURCES).unwrap_or_default();

    let image = match first_non_empty(&document, IMAGE_SOURCES) {
        Some(value) => resolve_url(url, &value),
        None => String::new(),
    };

    let favicon = match first_non_empty(&document, FAVICON_SOURCES) {
        Some(value) => resolve_url(url, &value),
        None => String::new(),
    };

    PageMetadata {
        title,
        description,
        image,
        favicon,
        site_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_with_head(head: &str) -> String {
        format!("<html><head>{head}</head><body></body></html>")
    }

    #[test]
    fn test_og_title_wins() {
        let html = html_with_head(
            r#"<meta property="og:title" content="OG Title"><title>HTML Title</title>"#,
        );
        let m = extract("https://example.com", &html);
        assert_eq!(m.title, "OG Title");
    }

    #[test]
    fn test_twitter_title_fallback() {
        let html = html_with_head(
            r#"<meta name="twitter:title" content="Twitter Title"><title>HTML Title</title>"#,
        );
        let m = extract("https://example.com", &html);
        assert_eq!(m.title, "Twitter Title");
    }

    #[test]
    fn test_title_tag_fallback_trimmed() {
        let html = html_with_head("<title>  Example Domain  </title>");
        let m = extract("https://example.com", &html);
        assert_eq!(m.title, "Example Domain");
    }

    #[test]
    fn test_description_chain() {
        let html = html_with_head(r#"<meta name="description" content="Plain description">"#);
        let m = extract("https://example.com", &html);
        assert_eq!(m.description, "Plain description");

        let html = html_with_head(
            r#"<meta name="description" content="Plain">
               <meta property="og:description" content="OG description">"#,
        );
        let m = extract("https://example.com", &html);
        assert_eq!(m.description, "OG description");
    }

    #[test]
    fn test_empty_meta_content_skipped() {
        let html = html_with_head(
            r#"<meta property="og:title" content="  "><title>Fallback</title>"#,
        );
        let m = extract("https://example.com", &html);
        assert_eq!(m.title, "Fallback");
    }

    #[test]
    fn test_relative_image_resolved() {
        let html = html_with_head(r#"<meta property="og:image" content="/img.png">"#);
        let m = extract("https://ex.com/page", &html);
        assert_eq!(m.image, "https://ex.com/img.png");
    }

    #[test]
    fn test_absolute_image_untouched() {
        let html =
            html_with_head(r#"<meta property="og:image" content="https://cdn.ex.com/img.png">"#);
        let m = extract("https://ex.com/page", &html);
        assert_eq!(m.image, "https://cdn.ex.com/img.png");
    }

    #[test]
    fn test_protocol_relative_image() {
        let html = html_with_head(r#"<meta property="og:image" content="//cdn.ex.com/img.png">"#);
        let m = extract("https://ex.com/page", &html);
        assert_eq!(m.image, "https://cdn.ex.com/img.png");
    }

    #[test]
    fn test_relative_image_resolved_against_page_path() {
        let html = html_with_head(r#"<meta property="og:image" content="img.png">"#);
        let m = extract("https://ex.com/blog/post", &html);
        assert_eq!(m.image, "https://ex.com/blog/img.png");
    }

    #[test]
    fn test_favicon_rel_priority() {
        let html = html_with_head(
            r#"<link rel="apple-touch-icon" href="/touch.png">
               <link rel="icon" href="/icon.svg">"#,
        );
        let m = extract("https://example.com", &html);
        assert_eq!(m.favicon, "https://example.com/icon.svg");
    }

    #[test]
    fn test_shortcut_icon_matched() {
        let html = html_with_head(r#"<link rel="shortcut icon" href="/favicon.ico">"#);
        let m = extract("https://example.com/deep/page", &html);
        assert_eq!(m.favicon, "https://example.com/favicon.ico");
    }

    #[test]
    fn test_site_name() {
        let html = html_with_head(r#"<meta property="og:site_name" content=" Example ">"#);
        let m = extract("https://example.com", &html);
        assert_eq!(m.site_name, "Example");
    }

    #[test]
    fn test_missing_everything_yields_empty_fields() {
        let m = extract("https://example.com", "<html><head></head><body></body></html>");
        assert_eq!(m, PageMetadata::default());
    }

    #[test]
    fn test_twitter_image_fallback() {
        let html = html_with_head(r#"<meta name="twitter:image" content="/card.jpg">"#);
        let m = extract("https://ex.com/page", &html);
        assert_eq!(m.image, "https://ex.com/card.jpg");
    }

    #[test]
    fn test_garbage_html_does_not_panic() {
        let m = extract("https://example.com", "<<<>>><meta><title>Still here");
        assert_eq!(m.title, "Still here");
    }
}
