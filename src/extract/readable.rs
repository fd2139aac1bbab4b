//! HTML readable-content extractor
//!
//! This module picks the article out of a page:
//! - Title (Open Graph title, `<title>`, then the first `<h1>`)
//! - Content root (`<article>`, `<main>`, `[role=main]`, then `<body>`)
//! - Plain text of the content root, without script and style text
//! - Excerpt (meta description, then the first paragraph)
//! - Author and site name from meta tags

use crate::extract::{ExtractError, Extraction, Extractor};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Longest excerpt taken from the first paragraph, in characters
const MAX_EXCERPT_CHARS: usize = 300;

/// Elements whose text never belongs to the article
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Content roots in order of preference
const CONTENT_ROOTS: &[&str] = &["article", "main", "[role='main']", "body"];

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector)
        .map_err(|e| ExtractError::Parse(format!("invalid selector {}: {:?}", selector, e)))
}

/// `scraper`-based extractor holding pre-compiled selectors
#[derive(Debug)]
pub struct ReadableExtractor {
    og_title: Selector,
    title: Selector,
    heading: Selector,
    roots: Vec<Selector>,
    description: Selector,
    paragraph: Selector,
    author: Selector,
    author_link: Selector,
    site_name: Selector,
}

impl ReadableExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            og_title: compile("meta[property='og:title']")?,
            title: compile("title")?,
            heading: compile("h1")?,
            roots: CONTENT_ROOTS
                .iter()
                .map(|s| compile(s))
                .collect::<Result<_, _>>()?,
            description: compile("meta[name='description'], meta[property='og:description']")?,
            paragraph: compile("p")?,
            author: compile("meta[name='author']")?,
            author_link: compile("[rel='author']")?,
            site_name: compile("meta[property='og:site_name']")?,
        })
    }

    fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
        document
            .select(selector)
            .filter_map(|element| element.value().attr("content"))
            .map(collapse_whitespace)
            .find(|content| !content.is_empty())
    }

    fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
        scope
            .select(selector)
            .map(visible_text)
            .find(|text| !text.is_empty())
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        Self::meta_content(document, &self.og_title)
            .or_else(|| Self::first_text(document.root_element(), &self.title))
            .or_else(|| Self::first_text(document.root_element(), &self.heading))
    }

    fn content_root<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.roots
            .iter()
            .find_map(|selector| document.select(selector).next())
    }

    fn extract_excerpt(&self, document: &Html, root: Option<ElementRef<'_>>) -> Option<String> {
        Self::meta_content(document, &self.description).or_else(|| {
            let paragraph = Self::first_text(root?, &self.paragraph)?;
            Some(paragraph.chars().take(MAX_EXCERPT_CHARS).collect())
        })
    }

    fn extract_author(&self, document: &Html) -> Option<String> {
        Self::meta_content(document, &self.author)
            .or_else(|| Self::first_text(document.root_element(), &self.author_link))
    }
}

impl Extractor for ReadableExtractor {
    fn parse(&mut self, html: &str, _url: &Url) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(html);
        let root = self.content_root(&document);

        let content_html = root
            .map(|element| element.inner_html().trim().to_string())
            .filter(|inner| !inner.is_empty());
        let text = root.map(visible_text).filter(|text| !text.is_empty());

        Ok(Extraction {
            title: self.extract_title(&document),
            html: content_html,
            text,
            excerpt: self.extract_excerpt(&document, root),
            author: self.extract_author(&document),
            site_name: Self::meta_content(&document, &self.site_name),
        })
    }
}

/// Collects the text below `element`, skipping script-like elements
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
