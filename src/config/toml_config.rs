use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub source: SourceConfig,
    pub analysis: AnalysisConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub listing_url: String,
    pub base_url: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_link_selectors")]
    pub link_selectors: Vec<String>,
    #[serde(default = "default_region_selectors")]
    pub region_selectors: Vec<String>,
    #[serde(default = "default_params_attribute")]
    pub params_attribute: String,
    #[serde(default = "default_params_key")]
    pub params_key: String,
    #[serde(default = "default_detail_path")]
    pub detail_path: String,
    #[serde(default = "default_detail_query_param")]
    pub detail_query_param: String,
    #[serde(default = "default_page_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_image_timeout")]
    pub image_timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_analysis_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    #[serde(default = "default_image_detail")]
    pub image_detail: String,
    #[serde(default = "default_analysis_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Postgrest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: Option<String>,
    pub url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    #[serde(default = "default_due_days")]
    pub default_due_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
            default_due_days: default_due_days(),
        }
    }
}

/// Upper bound for `pipeline.default_due_days` (ten years).
pub const MAX_DUE_DAYS: i64 = 3650;

fn default_max_items() -> usize {
    50
}

fn default_link_selectors() -> Vec<String> {
    [
        "a.detailLink",
        "div.board-list a",
        "table.board-list a",
        "ul.board-list a",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_region_selectors() -> Vec<String> {
    [
        "div.tbl_view",
        "div.view-content",
        "div.board-content",
        "div.content",
        "div.article-body",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_params_attribute() -> String {
    "data-params".to_string()
}

fn default_params_key() -> String {
    "encMenuBoardSeq".to_string()
}

fn default_detail_path() -> String {
    "/board/view".to_string()
}

fn default_detail_query_param() -> String {
    "seq".to_string()
}

fn default_page_timeout() -> u64 {
    10
}

fn default_image_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)".to_string()
}

fn default_accept_language() -> String {
    "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

fn default_analysis_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    500
}

fn default_max_text_chars() -> usize {
    3000
}

fn default_image_detail() -> String {
    "high".to_string()
}

fn default_analysis_timeout() -> u64 {
    60
}

fn default_table() -> String {
    "scholarships".to_string()
}

fn default_delay_seconds() -> u64 {
    3
}

fn default_due_days() -> i64 {
    90
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.source.image_timeout_seconds)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.timeout_seconds)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.pipeline.delay_seconds)
    }

    /// 取得 API 金鑰；未替換的 `${VAR}` 視為缺少
    pub fn analysis_api_key(&self) -> Result<&str> {
        resolved_secret("analysis.api_key", &self.analysis.api_key)
    }

    pub fn store_url(&self) -> Result<&str> {
        resolved_secret("store.url", &self.store.url)
    }

    pub fn store_api_key(&self) -> Result<&str> {
        resolved_secret("store.api_key", &self.store.api_key)
    }

    pub fn sqlite_path(&self) -> &str {
        self.store.sqlite_path.as_deref().unwrap_or("scholarships.db")
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.listing_url", &self.source.listing_url)?;
        validation::validate_url("source.base_url", &self.source.base_url)?;
        validation::validate_positive_number("source.max_items", self.source.max_items, 1)?;
        validation::validate_selectors("source.link_selectors", &self.source.link_selectors)?;
        validation::validate_selectors("source.region_selectors", &self.source.region_selectors)?;
        validation::validate_non_empty_string("source.params_key", &self.source.params_key)?;
        validation::validate_non_empty_string(
            "source.detail_query_param",
            &self.source.detail_query_param,
        )?;

        self.analysis_api_key()?;
        validation::validate_url("analysis.base_url", &self.analysis.base_url)?;
        validation::validate_non_empty_string("analysis.model", &self.analysis.model)?;
        validation::validate_range("analysis.temperature", self.analysis.temperature, 0.0, 2.0)?;
        validation::validate_positive_number(
            "analysis.max_text_chars",
            self.analysis.max_text_chars,
            1,
        )?;

        match self.store.backend {
            StoreBackend::Sqlite => validation::validate_path("store.sqlite_path", self.sqlite_path())?,
            StoreBackend::Postgrest => {
                validation::validate_url("store.url", self.store_url()?)?;
                self.store_api_key()?;
                validation::validate_non_empty_string("store.table", &self.store.table)?;
            }
        }

        validation::validate_range(
            "pipeline.default_due_days",
            self.pipeline.default_due_days,
            0,
            MAX_DUE_DAYS,
        )?;

        Ok(())
    }
}

fn resolved_secret<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str> {
    let value = validation::validate_required_field(field, value)?;
    if value.trim().is_empty() || value.starts_with("${") {
        return Err(EtlError::MissingConfigError {
            field: field.to_string(),
        });
    }
    Ok(value.as_str())
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
