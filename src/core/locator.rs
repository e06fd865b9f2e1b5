use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never counts as announcement content.
const EXCLUDED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "nav", "footer"];

/// What was found in a detail page's content region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// No candidate selector matched.
    NoRegion,
    /// `src` is the raw attribute value; `text` is the region's visible text.
    Image { src: String, text: Option<String> },
    Text(String),
    /// The region exists but has neither an image nor visible text.
    Blank,
}

/// Finds the content region of a detail page by trying selectors in order.
#[derive(Debug, Clone)]
pub struct ContentLocator {
    region_selectors: Vec<Selector>,
    image_selector: Selector,
}

impl ContentLocator {
    pub fn new(region_selectors: &[String]) -> Result<Self> {
        let region_selectors = region_selectors
            .iter()
            .map(|s| parse_selector("source.region_selectors", s))
            .collect::<Result<Vec<_>>>()?;
        let image_selector = parse_selector("image", "img[src]")?;
        Ok(Self {
            region_selectors,
            image_selector,
        })
    }

    /// First element matched by the first selector that matches anything.
    pub fn find_region<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.region_selectors
            .iter()
            .find_map(|selector| document.select(selector).next())
    }

    /// The first image with a non-empty `src` inside `region`.
    pub fn image_src(&self, region: ElementRef<'_>) -> Option<String> {
        region
            .select(&self.image_selector)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(str::to_string)
    }

    /// Image takes precedence over text when a region holds both.
    pub fn locate(&self, html: &str) -> Located {
        let document = Html::parse_document(html);
        let Some(region) = self.find_region(&document) else {
            return Located::NoRegion;
        };

        let text = visible_text(region);
        let text = (!text.is_empty()).then_some(text);

        match (self.image_src(region), text) {
            (Some(src), text) => Located::Image { src, text },
            (None, Some(text)) => Located::Text(text),
            (None, None) => Located::Blank,
        }
    }
}

/// Visible text of `element`, one trimmed chunk per line.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut chunks = Vec::new();
    collect_text(element, &mut chunks);
    chunks.join("\n")
}

fn collect_text<'a>(element: ElementRef<'a>, chunks: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed);
                }
            }
            Node::Element(el) if EXCLUDED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, chunks);
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn parse_selector(field: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: selector.to_string(),
        reason: format!("Invalid CSS selector: {:?}", e),
    })
}
