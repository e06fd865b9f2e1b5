// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod openai;
pub mod postgrest;
pub mod sqlite;

pub use http::HttpFetcher;
pub use openai::OpenAiAnalyzer;
pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStore;

use crate::config::toml_config::{StoreBackend, TomlConfig};
use crate::domain::ports::ScholarshipStore;
use crate::utils::error::Result;
use std::sync::Arc;

/// Opens the store selected by `store.backend`.
pub fn open_store(config: &TomlConfig) -> Result<Arc<dyn ScholarshipStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            tracing::info!(path = config.sqlite_path(), "🗄️ Using SQLite store");
            Ok(Arc::new(SqliteStore::open(config.sqlite_path())?))
        }
        StoreBackend::Postgrest => {
            let url = config.store_url()?;
            tracing::info!(url, table = %config.store.table, "🗄️ Using PostgREST store");
            Ok(Arc::new(PostgrestStore::new(
                url,
                config.store_api_key()?,
                &config.store.table,
                config.page_timeout(),
            )?))
        }
    }
}
