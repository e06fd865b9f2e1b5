pub mod discovery;
pub mod etl;
pub mod extractor;
pub mod locator;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;

pub use discovery::AnnouncementDiscoverer;
pub use etl::EtlEngine;
pub use extractor::{CriteriaExtractor, Extracted};
pub use locator::{ContentLocator, Located};
pub use normalizer::CriteriaNormalizer;
pub use pipeline::ScholarshipPipeline;
pub use resolver::DetailResolver;

pub use crate::domain::ports::{CriteriaAnalyzer, PageFetcher, Pipeline, ScholarshipStore};
pub use crate::utils::error::Result;
