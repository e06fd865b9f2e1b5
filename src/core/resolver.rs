use crate::core::locator::{ContentLocator, Located};
use crate::domain::model::{AnnouncementRef, ContentVariant};
use crate::domain::ports::PageFetcher;
use url::Url;

/// Fetches a detail page and reduces it to a single content variant.
#[derive(Debug, Clone)]
pub struct DetailResolver {
    locator: ContentLocator,
}

impl DetailResolver {
    pub fn new(locator: ContentLocator) -> Self {
        Self { locator }
    }

    /// Fetch and parse failures come back as `Empty`; they never abort the run.
    pub async fn resolve<F: PageFetcher>(&self, fetcher: &F, item: &AnnouncementRef) -> ContentVariant {
        tracing::debug!(link = %item.link, stage = "resolve", "📄 Fetching detail page");

        let html = match fetcher.fetch_page(&item.link).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(link = %item.link, stage = "resolve", error = %e, "detail fetch failed");
                return ContentVariant::Empty;
            }
        };

        let variant = self.variant_from_html(&item.link, &html);
        tracing::debug!(link = %item.link, stage = "resolve", kind = variant.kind(), "content resolved");
        variant
    }

    pub fn variant_from_html(&self, page_url: &str, html: &str) -> ContentVariant {
        match self.locator.locate(html) {
            Located::NoRegion => {
                tracing::warn!(link = page_url, stage = "resolve", "content region not found");
                ContentVariant::Empty
            }
            Located::Image { src, text } => match absolute_url(page_url, &src) {
                Some(url) => {
                    tracing::info!(link = page_url, image = %url, "🖼️ Image found");
                    ContentVariant::Image { url, text }
                }
                // An unresolvable image is as good as no image.
                None => match text {
                    Some(body) => ContentVariant::Text { body },
                    None => ContentVariant::Empty,
                },
            },
            Located::Text(body) => {
                tracing::info!(link = page_url, chars = body.chars().count(), "📝 Text extracted");
                ContentVariant::Text { body }
            }
            Located::Blank => ContentVariant::Empty,
        }
    }
}

fn absolute_url(page_url: &str, src: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(src).ok().map(|url| url.to_string())
}
