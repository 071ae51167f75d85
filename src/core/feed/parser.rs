use chrono::Utc;
use html2text::render::text_renderer::TrivialDecorator;
use roxmltree::{Document, Node};

use super::types::{Article, Feed, SocialData};

const DESCRIPTION_LIMIT: usize = 300;

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed document is empty")]
    EmptyDocument,
    #[error("xml parse error: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Derives the content-based article identity from its link. A 32-bit
/// wrapping `h*31 + c` checksum, kept deterministic across refresh cycles so
/// the same item always maps to the same id. Not cryptographic.
pub fn article_id(link: &str) -> String {
    let mut hash: i32 = 0;
    for ch in link.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(ch as i32);
    }
    hash.to_string()
}

/// Parses an RSS 2.0 or Atom document into canonical articles, in document
/// order. Items missing a title or link are dropped; a malformed document
/// fails the whole feed.
pub fn parse_feed(xml: &str, feed: &Feed) -> Result<Vec<Article>, FeedParseError> {
    if xml.trim().is_empty() {
        return Err(FeedParseError::EmptyDocument);
    }
    let doc = Document::parse(xml)?;

    let articles = doc
        .descendants()
        .filter(|node| {
            node.is_element() && matches!(node.tag_name().name(), "item" | "entry")
        })
        .filter_map(|item| article_from_item(item, feed))
        .collect();

    Ok(articles)
}

fn article_from_item(item: Node<'_, '_>, feed: &Feed) -> Option<Article> {
    let title = element_text(item, &["title"]).unwrap_or_default();
    let link = resolve_link(item).unwrap_or_default();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let raw_description = element_text(item, &["description", "summary", "content"])
        .unwrap_or_default();
    let description = truncate_description(&raw_description);

    let pub_date = element_text(item, &["pubDate", "published", "updated"])
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    Some(Article {
        id: article_id(&link),
        title,
        link,
        description,
        feed_name: feed.name.clone(),
        feed_url: feed.url.clone(),
        pub_date,
        social: SocialData::default(),
    })
}

/// Three-tier link resolution: Atom `rel="alternate"` href, then a bare
/// `link` href attribute, then `link` element text. First non-empty wins.
fn resolve_link(item: Node<'_, '_>) -> Option<String> {
    let links: Vec<Node> = item
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "link")
        .collect();

    links
        .iter()
        .find(|node| node.attribute("rel") == Some("alternate"))
        .and_then(|node| node.attribute("href"))
        .or_else(|| links.first().and_then(|node| node.attribute("href")))
        .map(ToString::to_string)
        .filter(|href| !href.is_empty())
        .or_else(|| element_text(item, &["link"]))
}

/// Text of the first element under `item` whose local name matches one of
/// `names`, in fallback order. CDATA sections count as text.
fn element_text(item: Node<'_, '_>, names: &[&str]) -> Option<String> {
    for name in names {
        let found = item.descendants().find(|node| {
            node.is_element() && node.tag_name().name() == *name
        });
        if let Some(element) = found {
            let text: String = element
                .descendants()
                .filter(|node| node.is_text())
                .filter_map(|node| node.text())
                .collect();
            let text = text.trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn truncate_description(raw: &str) -> String {
    let truncated: String = strip_html(raw).chars().take(DESCRIPTION_LIMIT).collect();
    format!("{truncated}...")
}

/// Renders HTML to plain text and collapses all whitespace runs.
pub fn strip_html(html: &str) -> String {
    let rendered =
        html2text::from_read_with_decorator(html.as_bytes(), 10_000, TrivialDecorator::new());
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(name: &str, url: &str) -> Feed {
        Feed {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn parses_atom_fixture_feed() {
        let xml = include_str!("../../../fixtures/feed-samples/simonwillison.atom.xml");
        let source = feed(
            "Simon Willison's Blog",
            "https://simonwillison.net/atom/everything/",
        );
        let articles = parse_feed(xml, &source).expect("atom fixture must parse");

        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "A new way of thinking about AI assistants");
        assert_eq!(
            article.link,
            "https://simonwillison.net/2024/May/25/thinking-about-ai-assistants/"
        );
        assert_eq!(article.pub_date, "2024-05-25T14:48:35-07:00");
        assert_eq!(article.description, "Some content here...");
        assert_eq!(article.feed_name, source.name);
    }

    #[test]
    fn parses_rss_fixture_feed() {
        let xml = include_str!("../../../fixtures/feed-samples/hackernews.rss.xml");
        let source = feed("Hacker News", "https://news.ycombinator.com/rss");
        let articles = parse_feed(xml, &source).expect("rss fixture must parse");

        assert_eq!(articles.len(), 1);
        let article = &articles[0];
        assert_eq!(article.title, "Show HN: My new project");
        assert_eq!(article.link, "https://example.com/project");
        assert_eq!(article.pub_date, "Sun, 26 May 2024 12:00:00 GMT");
        assert_eq!(article.description, "Some description here....");
    }

    #[test]
    fn malformed_document_fails_the_feed() {
        let source = feed("Invalid", "invalid");
        let result = parse_feed("<rss><channel>broken", &source);
        assert!(matches!(result, Err(FeedParseError::Xml(_))));
    }

    #[test]
    fn items_without_title_or_link_are_dropped() {
        let xml = r#"
        <rss version="2.0"><channel>
            <item><title>Good</title><link>https://good.com</link></item>
            <item><title>No Link</title></item>
            <item><link>https://no-title.com</link></item>
        </channel></rss>"#;
        let source = feed("Incomplete", "incomplete");
        let articles = parse_feed(xml, &source).expect("feed must parse");

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Good");
    }

    #[test]
    fn article_id_is_deterministic_per_link() {
        let first = article_id("https://example.com/post/1");
        let second = article_id("https://example.com/post/1");
        let other = article_id("https://example.com/post/2");

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn missing_date_falls_back_to_now() {
        let xml = r#"
        <rss version="2.0"><channel>
            <item><title>Undated</title><link>https://undated.example.com</link></item>
        </channel></rss>"#;
        let source = feed("Undated", "undated");
        let articles = parse_feed(xml, &source).expect("feed must parse");

        assert_eq!(articles.len(), 1);
        assert!(articles[0].published_millis() > 0);
    }

    #[test]
    fn description_is_stripped_and_capped() {
        let long_paragraph = format!("<p>{}</p>", "word ".repeat(200));
        let xml = format!(
            r#"<rss version="2.0"><channel><item>
                <title>Long</title>
                <link>https://long.example.com</link>
                <description><![CDATA[{long_paragraph}]]></description>
            </item></channel></rss>"#
        );
        let source = feed("Long", "long");
        let articles = parse_feed(&xml, &source).expect("feed must parse");

        let description = &articles[0].description;
        assert!(description.ends_with("..."));
        assert_eq!(description.chars().count(), 303);
        assert!(!description.contains('<'));
    }
}
