pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{open_store, HttpFetcher, OpenAiAnalyzer, PostgrestStore, SqliteStore};
pub use config::{StoreBackend, TomlConfig};
pub use core::{etl::EtlEngine, pipeline::ScholarshipPipeline};
pub use domain::model::{
    AnnouncementRef, EligibilityFilter, RunSummary, ScholarshipRecord, Statistics,
};
pub use utils::error::{EtlError, Result};
