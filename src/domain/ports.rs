use crate::domain::model::{
    AnnouncementRef, EligibilityFilter, ItemFailure, RawCriteria, ScholarshipRecord, Statistics,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// Raw bytes of a fetched resource together with its declared media type.
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// GET access to the source site. Non-success statuses are errors.
pub trait PageFetcher: Send + Sync {
    fn fetch_page(&self, url: &str) -> impl std::future::Future<Output = Result<String>> + Send;
    fn fetch_bytes(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<FetchedBytes>> + Send;
}

/// The external analysis capability. Each call is a single attempt; callers
/// decide what to do on failure.
#[async_trait]
pub trait CriteriaAnalyzer: Send + Sync {
    /// `image_data_url` is a `data:<content-type>;base64,<payload>` URL.
    async fn analyze_image(&self, title: &str, image_data_url: &str) -> Result<RawCriteria>;
    async fn analyze_text(&self, title: &str, text: &str) -> Result<RawCriteria>;
}

#[async_trait]
pub trait ScholarshipStore: Send + Sync {
    /// Insert or update the record whose `link` matches.
    async fn upsert(&self, record: &ScholarshipRecord) -> Result<()>;
    async fn statistics(&self, today: NaiveDate) -> Result<Statistics>;
    /// Active records matching `filter`, earliest deadline first.
    async fn eligible(
        &self,
        filter: &EligibilityFilter,
        today: NaiveDate,
    ) -> Result<Vec<ScholarshipRecord>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<AnnouncementRef>>;
    async fn transform(
        &self,
        item: &AnnouncementRef,
    ) -> std::result::Result<ScholarshipRecord, ItemFailure>;
    async fn load(&self, record: &ScholarshipRecord) -> std::result::Result<(), ItemFailure>;
    fn item_delay(&self) -> Duration;
}

#[async_trait]
impl<T: ScholarshipStore + ?Sized> ScholarshipStore for std::sync::Arc<T> {
    async fn upsert(&self, record: &ScholarshipRecord) -> Result<()> {
        (**self).upsert(record).await
    }

    async fn statistics(&self, today: NaiveDate) -> Result<Statistics> {
        (**self).statistics(today).await
    }

    async fn eligible(
        &self,
        filter: &EligibilityFilter,
        today: NaiveDate,
    ) -> Result<Vec<ScholarshipRecord>> {
        (**self).eligible(filter, today).await
    }
}
