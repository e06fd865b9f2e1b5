use crate::config::toml_config::AnalysisConfig;
use crate::domain::model::RawCriteria;
use crate::domain::ports::CriteriaAnalyzer;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SYSTEM_PROMPT_IMAGE: &str = r#"You read scholarship announcements published as images on a Korean university bulletin board.
Extract the following and answer with a single JSON object:

1. min_gpa: minimum GPA required (number, 0.0 if not stated)
2. max_income: highest eligible income bracket (integer 0-10, 99 if unrestricted)
3. residence: required residence region such as "서울" or "경기" ("전국" if unrestricted)
4. due_date: application deadline as YYYY-MM-DD (null if not found)

Example:
{"min_gpa": 3.0, "max_income": 8, "residence": "서울", "due_date": "2026-01-31"}

Return only valid JSON. Read every piece of text in the image carefully."#;

const SYSTEM_PROMPT_TEXT: &str = r#"You read scholarship announcements from a Korean university bulletin board.
Extract the following and answer with a single JSON object:

1. min_gpa: minimum GPA required (number, 0.0 if not stated)
2. max_income: highest eligible income bracket (integer 0-10, 99 if unrestricted)
3. residence: required residence region such as "서울" or "경기" ("전국" if unrestricted)
4. due_date: application deadline as YYYY-MM-DD (null if not found)

Example:
{"min_gpa": 2.5, "max_income": 5, "residence": "서울", "due_date": "2026-02-15"}

Return only valid JSON."#;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Criteria analysis through an OpenAI-compatible chat completions API.
pub struct OpenAiAnalyzer {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_text_chars: usize,
    image_detail: String,
}

impl OpenAiAnalyzer {
    pub fn new(config: &AnalysisConfig, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_text_chars: config.max_text_chars,
            image_detail: config.image_detail.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|e| {
            EtlError::InvalidConfigValueError {
                field: "analysis.api_key".to_string(),
                value: "<redacted>".to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn complete(&self, system: &str, user: MessageContent) -> Result<RawCriteria> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(system.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(model = %self.model, "analysis request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EtlError::AnalysisError {
                message: format!("API error ({}): {}", status, error_text),
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EtlError::AnalysisError {
                message: "response carried no content".to_string(),
            })?;

        parse_criteria(&content)
    }
}

#[async_trait]
impl CriteriaAnalyzer for OpenAiAnalyzer {
    async fn analyze_image(&self, title: &str, image_data_url: &str) -> Result<RawCriteria> {
        let user = MessageContent::Parts(vec![
            ContentPart::Text {
                text: format!(
                    "제목: {}\n\nExtract min_gpa, max_income, residence and due_date from this announcement image.",
                    title
                ),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_data_url.to_string(),
                    detail: self.image_detail.clone(),
                },
            },
        ]);
        self.complete(SYSTEM_PROMPT_IMAGE, user).await
    }

    async fn analyze_text(&self, title: &str, text: &str) -> Result<RawCriteria> {
        let body = truncate_chars(text, self.max_text_chars);
        let user = MessageContent::Text(format!(
            "제목: {}\n\n내용:\n{}\n\nExtract min_gpa, max_income, residence and due_date from this announcement.",
            title, body
        ));
        self.complete(SYSTEM_PROMPT_TEXT, user).await
    }
}

/// At most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Interprets the model's answer. The content must be a JSON object whose
/// criteria fields, when present and non-null, carry the expected types.
pub fn parse_criteria(content: &str) -> Result<RawCriteria> {
    let value: Value = serde_json::from_str(content.trim())?;
    let object = value.as_object().ok_or_else(|| EtlError::AnalysisError {
        message: "response is not a JSON object".to_string(),
    })?;

    let field = |name: &str| object.get(name).filter(|v| !v.is_null());

    let min_gpa = match field("min_gpa") {
        None => None,
        Some(v) => Some(v.as_f64().ok_or_else(|| type_error("min_gpa", v))?),
    };

    let max_income = match field("max_income") {
        None => None,
        Some(v) => Some(
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| type_error("max_income", v))?,
        ),
    };

    let residence = match field("residence") {
        None => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| type_error("residence", v))?
                .to_string(),
        ),
    };

    let due_date = match field("due_date") {
        None => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| type_error("due_date", v))?
                .to_string(),
        ),
    };

    Ok(RawCriteria {
        min_gpa,
        max_income,
        residence,
        due_date,
    })
}

fn type_error(field: &str, value: &Value) -> EtlError {
    EtlError::AnalysisError {
        message: format!("unexpected type for {}: {}", field, value),
    }
}
