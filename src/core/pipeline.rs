use crate::config::toml_config::TomlConfig;
use crate::core::discovery::AnnouncementDiscoverer;
use crate::core::extractor::CriteriaExtractor;
use crate::core::locator::ContentLocator;
use crate::core::normalizer::CriteriaNormalizer;
use crate::core::resolver::DetailResolver;
use crate::domain::model::{AnnouncementRef, ContentVariant, ItemFailure, ScholarshipRecord};
use crate::domain::ports::{CriteriaAnalyzer, PageFetcher, Pipeline, ScholarshipStore};
use crate::utils::error::Result;
use chrono::{Local, NaiveDate};
use std::time::Duration;
use tokio::sync::Mutex;

/// Discover → resolve → analyze → normalize → persist, one announcement at a
/// time.
pub struct ScholarshipPipeline<F: PageFetcher, A: CriteriaAnalyzer, S: ScholarshipStore> {
    fetcher: F,
    discoverer: Mutex<AnnouncementDiscoverer>,
    resolver: DetailResolver,
    extractor: CriteriaExtractor<A>,
    normalizer: CriteriaNormalizer,
    store: S,
    listing_url: String,
    max_items: usize,
    delay: Duration,
    default_due_days: i64,
}

impl<F: PageFetcher, A: CriteriaAnalyzer, S: ScholarshipStore> ScholarshipPipeline<F, A, S> {
    pub fn new(config: &TomlConfig, fetcher: F, analyzer: A, store: S) -> Result<Self> {
        let locator = ContentLocator::new(&config.source.region_selectors)?;
        let run_date = Local::now().date_naive();

        Ok(Self {
            fetcher,
            discoverer: Mutex::new(AnnouncementDiscoverer::new(&config.source)?),
            resolver: DetailResolver::new(locator),
            extractor: CriteriaExtractor::new(analyzer),
            normalizer: CriteriaNormalizer::new(run_date, config.pipeline.default_due_days),
            store,
            listing_url: config.source.listing_url.clone(),
            max_items: config.source.max_items,
            delay: config.item_delay(),
            default_due_days: config.pipeline.default_due_days,
        })
    }

    /// Pins the date used for default deadlines.
    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.normalizer = CriteriaNormalizer::new(run_date, self.default_due_days);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn analyzer(&self) -> &A {
        self.extractor.analyzer()
    }
}

#[async_trait::async_trait]
impl<F, A, S> Pipeline for ScholarshipPipeline<F, A, S>
where
    F: PageFetcher,
    A: CriteriaAnalyzer,
    S: ScholarshipStore,
{
    async fn extract(&self) -> Result<Vec<AnnouncementRef>> {
        let mut discoverer = self.discoverer.lock().await;
        discoverer
            .discover(&self.fetcher, &self.listing_url, self.max_items)
            .await
    }

    async fn transform(
        &self,
        item: &AnnouncementRef,
    ) -> std::result::Result<ScholarshipRecord, ItemFailure> {
        let variant = self.resolver.resolve(&self.fetcher, item).await;
        if variant == ContentVariant::Empty {
            return Err(ItemFailure::NoContent);
        }

        let extracted = self
            .extractor
            .analyze(&self.fetcher, &item.title, &variant)
            .await
            .map_err(ItemFailure::Analysis)?;

        let record = self
            .normalizer
            .normalize(item, &extracted.criteria, extracted.via);
        tracing::debug!(
            link = %record.link,
            stage = "normalize",
            due_date = %record.due_date,
            min_gpa = record.min_gpa,
            max_income = record.max_income,
            residence = %record.residence,
            "criteria normalized"
        );
        Ok(record)
    }

    async fn load(&self, record: &ScholarshipRecord) -> std::result::Result<(), ItemFailure> {
        tracing::debug!(link = %record.link, stage = "persist", "💾 Saving record");
        self.store
            .upsert(record)
            .await
            .map_err(|e| ItemFailure::Persistence(e.to_string()))
    }

    fn item_delay(&self) -> Duration {
        self.delay
    }
}
