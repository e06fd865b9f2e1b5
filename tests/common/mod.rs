#![allow(dead_code)]

use chrono::NaiveDate;
use httpmock::prelude::*;
use scholarship_etl::adapters::{HttpFetcher, OpenAiAnalyzer, SqliteStore};
use scholarship_etl::{ScholarshipPipeline, TomlConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub type TestPipeline = ScholarshipPipeline<HttpFetcher, OpenAiAnalyzer, Arc<SqliteStore>>;

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
}

pub fn config_for(server: &MockServer) -> TomlConfig {
    TomlConfig::from_toml_str(&format!(
        r#"
[source]
listing_url = "{listing}"
base_url = "{base}"
link_selectors = ["a.detailLink"]
region_selectors = ["div.tbl_view"]
timeout_seconds = 5
image_timeout_seconds = 5

[analysis]
api_key = "sk-test"
base_url = "{analysis}"
timeout_seconds = 5

[store]
backend = "sqlite"

[pipeline]
delay_seconds = 0
"#,
        listing = server.url("/board/list"),
        base = server.base_url(),
        analysis = server.url("/v1"),
    ))
    .unwrap()
}

pub fn pipeline(server: &MockServer, store: Arc<SqliteStore>) -> TestPipeline {
    let config = config_for(server);
    let fetcher = HttpFetcher::new(&config.source).unwrap();
    let analyzer =
        OpenAiAnalyzer::new(&config.analysis, "sk-test", Duration::from_secs(5)).unwrap();
    ScholarshipPipeline::new(&config, fetcher, analyzer, store)
        .unwrap()
        .with_run_date(run_date())
}

/// Listing page with one `a.detailLink` per `(seq, title)`.
pub fn listing_html(entries: &[(u32, &str)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(seq, title)| {
            format!(
                r#"<tr><td><a class="detailLink" href="/board/view?seq={}">{}</a></td></tr>"#,
                seq, title
            )
        })
        .collect();
    format!(
        "<html><body><table class=\"board-list\">{}</table></body></html>",
        rows
    )
}

pub fn text_page(body: &str) -> String {
    format!(
        r#"<html><body><div class="tbl_view"><p>{}</p></div></body></html>"#,
        body
    )
}

pub fn image_page(src: &str, caption: &str) -> String {
    format!(
        r#"<html><body><div class="tbl_view"><img src="{}"><p>{}</p></div></body></html>"#,
        src, caption
    )
}

/// Chat completions reply whose message content is `criteria` as JSON text.
pub fn chat_reply(criteria: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": criteria.to_string() },
            "finish_reason": "stop"
        }]
    })
}

pub fn mock_listing<'a>(server: &'a MockServer, entries: &[(u32, &str)]) -> httpmock::Mock<'a> {
    let html = listing_html(entries);
    server.mock(|when, then| {
        when.method(GET).path("/board/list");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(html);
    })
}

pub fn mock_detail<'a>(server: &'a MockServer, seq: u32, html: String) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/board/view")
            .query_param("seq", seq.to_string());
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(html);
    })
}

pub fn mock_image<'a>(server: &'a MockServer, path: &str) -> httpmock::Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(200)
            .header("content-type", "image/png")
            .body([0x89u8, b'P', b'N', b'G']);
    })
}
