use crate::config::toml_config::SourceConfig;
use crate::core::locator::parse_selector;
use crate::domain::model::AnnouncementRef;
use crate::domain::ports::PageFetcher;
use crate::utils::error::Result;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// Turns a listing page into announcement references. Links already emitted
/// during this run are remembered and never emitted twice.
#[derive(Debug)]
pub struct AnnouncementDiscoverer {
    link_selectors: Vec<Selector>,
    image_selector: Selector,
    base_url: Url,
    params_attribute: String,
    params_key: String,
    detail_path: String,
    detail_query_param: String,
    seen: HashSet<String>,
}

impl AnnouncementDiscoverer {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let link_selectors = source
            .link_selectors
            .iter()
            .map(|s| parse_selector("source.link_selectors", s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            link_selectors,
            image_selector: parse_selector("image", "img")?,
            base_url: Url::parse(&source.base_url)?,
            params_attribute: source.params_attribute.clone(),
            params_key: source.params_key.clone(),
            detail_path: source.detail_path.clone(),
            detail_query_param: source.detail_query_param.clone(),
            seen: HashSet::new(),
        })
    }

    /// Fetches the listing and parses it. A failed fetch is returned as an
    /// error; the caller treats it as fatal for the run.
    pub async fn discover<F: PageFetcher>(
        &mut self,
        fetcher: &F,
        listing_url: &str,
        max_items: usize,
    ) -> Result<Vec<AnnouncementRef>> {
        tracing::info!(url = listing_url, "📡 Fetching listing page");
        let html = fetcher.fetch_page(listing_url).await?;
        let items = self.parse_listing(&html, max_items);
        tracing::info!(count = items.len(), "✅ Announcements discovered");
        Ok(items)
    }

    /// At most `max_items` references, in page order, without repeated links.
    pub fn parse_listing(&mut self, html: &str, max_items: usize) -> Vec<AnnouncementRef> {
        let document = Html::parse_document(html);

        let elements: Vec<ElementRef<'_>> = self
            .link_selectors
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        let mut items = Vec::new();
        for element in elements {
            if items.len() >= max_items {
                break;
            }

            let title = self.title_for(element);

            let Some(link) = self.link_for(element) else {
                tracing::debug!(title = %title, "entry has no usable link, skipping");
                continue;
            };

            if !self.seen.insert(link.clone()) {
                tracing::debug!(link = %link, "duplicate link, skipping");
                continue;
            }

            items.push(AnnouncementRef { title, link });
        }
        items
    }

    /// Anchor text, else the alt text of an image inside it. May be empty.
    fn title_for(&self, element: ElementRef<'_>) -> String {
        let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() {
            return text;
        }
        element
            .select(&self.image_selector)
            .filter_map(|img| img.value().attr("alt"))
            .map(collapse_whitespace)
            .find(|alt| !alt.is_empty())
            .unwrap_or_default()
    }

    fn link_for(&self, element: ElementRef<'_>) -> Option<String> {
        let href = element.value().attr("href").map(str::trim);
        if let Some(href) = href.filter(|h| !is_placeholder_href(h)) {
            if let Ok(url) = self.base_url.join(href) {
                if matches!(url.scheme(), "http" | "https") {
                    return Some(url.to_string());
                }
            }
        }

        let params = element.value().attr(&self.params_attribute)?;
        self.link_from_params(params)
    }

    /// Synthesizes a detail URL from an entity-escaped JSON parameter blob.
    pub fn link_from_params(&self, params: &str) -> Option<String> {
        let decoded = decode_entities(params);
        let value: Value = match serde_json::from_str(decoded.trim()) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable parameter blob");
                return None;
            }
        };

        let id = match value.get(&self.params_key)? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let mut url = self.base_url.join(&self.detail_path).ok()?;
        url.query_pairs_mut()
            .append_pair(&self.detail_query_param, &id);
        Some(url.to_string())
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_placeholder_href(href: &str) -> bool {
    href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:")
}

/// Undoes the HTML escaping boards apply to attribute JSON. The parser
/// already decodes one level; this handles blobs escaped twice.
fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::TomlConfig;

    fn discoverer() -> AnnouncementDiscoverer {
        let config = TomlConfig::from_toml_str(
            r#"
[source]
listing_url = "https://web.example.ac.kr/board/scholarship"
base_url = "https://web.example.ac.kr"

[analysis]
api_key = "sk-test"

[store]
backend = "sqlite"
"#,
        )
        .unwrap();
        AnnouncementDiscoverer::new(&config.source).unwrap()
    }

    #[test]
    fn test_relative_href_resolved_to_absolute() {
        let html = r#"<a class="detailLink" href="/board/view?seq=10">  2026 국가장학금   안내 </a>"#;
        let items = discoverer().parse_listing(html, 10);

        assert_eq!(
            items,
            vec![AnnouncementRef {
                title: "2026 국가장학금 안내".to_string(),
                link: "https://web.example.ac.kr/board/view?seq=10".to_string(),
            }]
        );
    }

    #[test]
    fn test_params_blob_used_when_href_is_placeholder() {
        let html = r##"<a class="detailLink" href="#" data-params="{&quot;encMenuSeq&quot;:&quot;3&quot;,&quot;encMenuBoardSeq&quot;:&quot;abc123&quot;}">교내 장학금</a>"##;
        let items = discoverer().parse_listing(html, 10);

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].link,
            "https://web.example.ac.kr/board/view?seq=abc123"
        );
    }

    #[test]
    fn test_double_escaped_params_blob() {
        let d = discoverer();
        assert_eq!(
            d.link_from_params(r#"{&quot;encMenuBoardSeq&quot;: 42}"#).as_deref(),
            Some("https://web.example.ac.kr/board/view?seq=42")
        );
        assert_eq!(d.link_from_params(r#"{"otherKey": "1"}"#), None);
        assert_eq!(d.link_from_params("not json"), None);
    }

    #[test]
    fn test_unusable_entries_silently_dropped() {
        let html = r##"
            <a class="detailLink" href="#">장식용 링크</a>
            <a class="detailLink" href="javascript:void(0)" data-params="{broken">깨진 파라미터</a>
            <a class="detailLink" href="/board/view?seq=1"></a>
            <a class="detailLink" href="/board/view?seq=2">정상 공고</a>
        "##;
        let items = discoverer().parse_listing(html, 10);

        assert_eq!(
            items,
            vec![
                AnnouncementRef {
                    title: String::new(),
                    link: "https://web.example.ac.kr/board/view?seq=1".to_string(),
                },
                AnnouncementRef {
                    title: "정상 공고".to_string(),
                    link: "https://web.example.ac.kr/board/view?seq=2".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_untitled_entry_kept_with_image_alt() {
        let html = r#"
            <a class="detailLink" href="/board/view?seq=1"><img src="/banner.png"></a>
            <a class="detailLink" href="/board/view?seq=2"><img src="/b.png" alt=" 근로 장학생 모집 "></a>
        "#;
        let items = discoverer().parse_listing(html, 10);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "");
        assert_eq!(items[0].link, "https://web.example.ac.kr/board/view?seq=1");
        assert_eq!(items[1].title, "근로 장학생 모집");
    }

    #[test]
    fn test_duplicate_links_yield_one_reference() {
        let html = r#"
            <a class="detailLink" href="/board/view?seq=7">장학금 A</a>
            <a class="detailLink" href="https://web.example.ac.kr/board/view?seq=7">장학금 A (재공지)</a>
        "#;
        let mut d = discoverer();
        let items = d.parse_listing(html, 10);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "장학금 A");

        // The seen set spans the whole run.
        assert!(d.parse_listing(html, 10).is_empty());
        assert_eq!(d.seen_count(), 1);
    }

    #[test]
    fn test_max_items_bounds_output() {
        let html: String = (1..=5)
            .map(|i| format!(r#"<a class="detailLink" href="/board/view?seq={i}">공고 {i}</a>"#))
            .collect();
        let items = discoverer().parse_listing(&html, 3);

        assert_eq!(items.len(), 3);
        assert_eq!(items[2].title, "공고 3");
    }

    #[test]
    fn test_fallback_link_selector() {
        let html = r#"<table class="board-list"><tr><td><a href="view?seq=5">기숙사 장학</a></td></tr></table>"#;
        let items = discoverer().parse_listing(html, 10);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://web.example.ac.kr/view?seq=5");
    }
}
