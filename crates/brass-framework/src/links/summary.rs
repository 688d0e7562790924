//! Page titles and descriptions for announced links.

use async_trait::async_trait;
use scraper::{Html, Selector};

use brass_transport::PageFetcher;

use super::canonical::host_of;

/// What gets announced for a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    /// Page title, whitespace collapsed.
    pub title: String,
    /// Longer description, offered through "more".
    pub description: Option<String>,
    /// Host of the final URL after redirects.
    pub host: String,
}

impl PageSummary {
    /// The one-line announcement.
    pub fn line(&self) -> String {
        format!("[ {} ] - {}", self.title, self.host)
    }
}

/// Resolves a link into a [`PageSummary`].
#[async_trait]
pub trait PageSummarizer: Send + Sync {
    /// Returns `Ok(None)` when the link has no usable title.
    async fn summarize(&self, link: &str) -> anyhow::Result<Option<PageSummary>>;
}

#[async_trait]
impl PageSummarizer for PageFetcher {
    async fn summarize(&self, link: &str) -> anyhow::Result<Option<PageSummary>> {
        let page = self.get_page_body(link, &[]).await?;
        if !page.is_html() {
            return Ok(None);
        }
        let Some(text) = page.text() else {
            return Ok(None);
        };
        let host = host_of(&page.final_url).unwrap_or_default();
        Ok(parse_html(&text).map(|(title, description)| PageSummary {
            title,
            description,
            host,
        }))
    }
}

/// Extracts the title and the `og:description` / `description` meta content.
///
/// Returns `None` when the document has no non-empty title.
pub fn parse_html(html: &str) -> Option<(String, Option<String>)> {
    let document = Html::parse_document(html);

    let title_sel = Selector::parse("title").ok()?;
    let title = document
        .select(&title_sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())?;

    let description = ["meta[property=\"og:description\"]", "meta[name=\"description\"]"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("content"))
                .map(collapse_whitespace)
                .find(|d| !d.is_empty())
        });

    Some((title, description))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_og_description() {
        let html = r#"<html><head>
            <title>
                The   Rust
                Book
            </title>
            <meta name="description" content="plain description">
            <meta property="og:description" content="  Learn   Rust  ">
        </head><body></body></html>"#;
        let (title, description) = parse_html(html).unwrap();
        assert_eq!(title, "The Rust Book");
        assert_eq!(description.as_deref(), Some("Learn Rust"));
    }

    #[test]
    fn test_falls_back_to_meta_description() {
        let html = r#"<title>Docs</title><meta name="description" content="API docs">"#;
        assert_eq!(
            parse_html(html),
            Some(("Docs".to_string(), Some("API docs".to_string())))
        );
    }

    #[test]
    fn test_no_title_no_summary() {
        assert!(parse_html("<html><body>hi</body></html>").is_none());
        assert!(parse_html("<title>   </title>").is_none());
    }

    #[test]
    fn test_summary_line() {
        let summary = PageSummary {
            title: "Example".into(),
            description: None,
            host: "example.org".into(),
        };
        assert_eq!(summary.line(), "[ Example ] - example.org");
    }
}
