//! Scholarship store on a Supabase / PostgREST table.
//!
//! The table layout is in `migrations/001_scholarships.sql`. `created_at` is
//! left to the column default so a merge keeps the first insert time, while
//! every upsert sends a fresh `updated_at`.

use crate::domain::model::{
    ContentKind, EligibilityFilter, ScholarshipRecord, Statistics, NATIONWIDE, NO_INCOME_LIMIT,
};
use crate::domain::ports::ScholarshipStore;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct RowPayload<'a> {
    title: &'a str,
    link: &'a str,
    due_date: String,
    min_gpa: f64,
    max_income: i64,
    residence: &'a str,
    content_kind: &'a str,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct Row {
    title: String,
    link: String,
    due_date: NaiveDate,
    min_gpa: f64,
    max_income: i64,
    residence: String,
    #[serde(default)]
    content_kind: Option<String>,
}

impl From<Row> for ScholarshipRecord {
    fn from(row: Row) -> Self {
        ScholarshipRecord {
            title: row.title,
            link: row.link,
            due_date: row.due_date,
            min_gpa: row.min_gpa,
            max_income: row.max_income,
            residence: row.residence,
            content_kind: row
                .content_kind
                .as_deref()
                .and_then(ContentKind::parse)
                .unwrap_or(ContentKind::Text),
        }
    }
}

pub struct PostgrestStore {
    client: Client,
    table_url: String,
    api_key: String,
}

impl PostgrestStore {
    /// `base_url` is the project URL; requests go to `{base_url}/rest/v1/{table}`.
    pub fn new(base_url: &str, api_key: &str, table: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| EtlError::InvalidConfigValueError {
            field: "store.api_key".to_string(),
            value: "<redacted>".to_string(),
            reason: e.to_string(),
        };
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(invalid)?,
        );
        Ok(headers)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.headers(self.headers()?).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::StoreError {
                message: format!("PostgREST error ({}): {}", status, body),
            });
        }
        Ok(response)
    }

    /// Exact row count for the given filters, read from `Content-Range`.
    async fn count(&self, filters: &[(&str, String)]) -> Result<u64> {
        let request = self
            .client
            .get(&self.table_url)
            .query(&[("select", "id")])
            .query(filters)
            .header("Prefer", "count=exact")
            .header("Range", "0-0");
        let response = self.send(request).await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| EtlError::StoreError {
                message: "response carried no Content-Range".to_string(),
            })?;

        parse_content_range_total(range).ok_or_else(|| EtlError::StoreError {
            message: format!("unreadable Content-Range: {}", range),
        })
    }
}

/// Total from a `Content-Range` value such as `0-24/3573` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl ScholarshipStore for PostgrestStore {
    async fn upsert(&self, record: &ScholarshipRecord) -> Result<()> {
        let payload = RowPayload {
            title: &record.title,
            link: &record.link,
            due_date: record.due_date.format("%Y-%m-%d").to_string(),
            min_gpa: record.min_gpa,
            max_income: record.max_income,
            residence: &record.residence,
            content_kind: record.content_kind.as_str(),
            updated_at: Utc::now().to_rfc3339(),
        };

        let request = self
            .client
            .post(&self.table_url)
            .query(&[("on_conflict", "link")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&payload);
        self.send(request).await?;
        Ok(())
    }

    async fn statistics(&self, today: NaiveDate) -> Result<Statistics> {
        let total = self.count(&[("link", "not.is.null".to_string())]).await?;
        let active = self
            .count(&[("due_date", format!("gte.{}", today.format("%Y-%m-%d")))])
            .await?;
        Ok(Statistics::from_counts(total, active))
    }

    async fn eligible(
        &self,
        filter: &EligibilityFilter,
        today: NaiveDate,
    ) -> Result<Vec<ScholarshipRecord>> {
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("due_date", format!("gte.{}", today.format("%Y-%m-%d"))),
        ];
        if let Some(gpa) = filter.gpa {
            query.push(("min_gpa", format!("lte.{}", gpa)));
        }

        let mut alternatives = Vec::new();
        if let Some(income) = filter.income {
            alternatives.push(format!(
                "or(max_income.gte.{},max_income.eq.{})",
                income, NO_INCOME_LIMIT
            ));
        }
        if let Some(residence) = &filter.residence {
            alternatives.push(format!(
                "or(residence.eq.{},residence.eq.{})",
                residence.replace(|c: char| matches!(c, ',' | '(' | ')' | '"'), ""),
                NATIONWIDE
            ));
        }
        if !alternatives.is_empty() {
            query.push(("and", format!("({})", alternatives.join(","))));
        }
        query.push(("order", "due_date.asc".to_string()));

        let request = self.client.get(&self.table_url).query(&query);
        let rows: Vec<Row> = self.send(request).await?.json().await?;
        Ok(rows.into_iter().map(ScholarshipRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn store(server: &MockServer) -> PostgrestStore {
        PostgrestStore::new(&server.base_url(), "service-key", "scholarships", Duration::from_secs(5))
            .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
    }

    #[tokio::test]
    async fn test_upsert_uses_link_as_conflict_target() {
        let server = MockServer::start();
        let upsert_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/scholarships")
                .query_param("on_conflict", "link")
                .header("apikey", "service-key")
                .header("authorization", "Bearer service-key")
                .header("prefer", "resolution=merge-duplicates,return=minimal")
                .json_body_partial(
                    r#"{"link": "https://web.example.ac.kr/board/view?seq=1", "due_date": "2026-12-01", "max_income": 99}"#,
                );
            then.status(201);
        });

        let record = ScholarshipRecord {
            title: "교내장학금".to_string(),
            link: "https://web.example.ac.kr/board/view?seq=1".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            min_gpa: 0.0,
            max_income: 99,
            residence: NATIONWIDE.to_string(),
            content_kind: ContentKind::Image,
        };
        store(&server).upsert(&record).await.unwrap();

        upsert_mock.assert();
    }

    #[tokio::test]
    async fn test_upsert_refreshes_updated_at_only() {
        let server = MockServer::start();
        let created_at_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/scholarships")
                .body_contains("created_at");
            then.status(400);
        });
        let upsert_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/scholarships")
                .body_contains(r#""updated_at":""#)
                .body_contains(r#""content_kind":"text""#);
            then.status(201);
        });

        let record = ScholarshipRecord {
            title: "근로장학금".to_string(),
            link: "https://web.example.ac.kr/board/view?seq=3".to_string(),
            due_date: today(),
            min_gpa: 2.0,
            max_income: 99,
            residence: NATIONWIDE.to_string(),
            content_kind: ContentKind::Text,
        };
        store(&server).upsert(&record).await.unwrap();

        upsert_mock.assert();
        created_at_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_statistics_reads_exact_counts() {
        let server = MockServer::start();
        let active_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/scholarships")
                .query_param("due_date", "gte.2026-10-18")
                .header("prefer", "count=exact");
            then.status(206).header("Content-Range", "0-0/2").body("[]");
        });
        let total_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/scholarships")
                .query_param("link", "not.is.null")
                .header("prefer", "count=exact");
            then.status(206).header("Content-Range", "0-0/3").body("[]");
        });

        let stats = store(&server).statistics(today()).await.unwrap();

        total_mock.assert();
        active_mock.assert();
        assert_eq!(
            stats,
            Statistics {
                total: 3,
                active: 2,
                expired: 1
            }
        );
    }

    #[tokio::test]
    async fn test_eligible_builds_filters() {
        let server = MockServer::start();
        let query_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/scholarships")
                .query_param("due_date", "gte.2026-10-18")
                .query_param("min_gpa", "lte.3.2")
                .query_param(
                    "and",
                    "(or(max_income.gte.5,max_income.eq.99),or(residence.eq.서울,residence.eq.전국))",
                )
                .query_param("order", "due_date.asc");
            then.status(200).json_body(serde_json::json!([
                {
                    "id": 7,
                    "title": "지역인재 장학금",
                    "link": "https://web.example.ac.kr/board/view?seq=7",
                    "due_date": "2026-11-30",
                    "min_gpa": 3.0,
                    "max_income": 8,
                    "residence": "서울",
                    "content_kind": "image",
                    "created_at": "2026-10-01T00:00:00+00:00"
                }
            ]));
        });

        let filter = EligibilityFilter {
            gpa: Some(3.2),
            income: Some(5),
            residence: Some("서울".to_string()),
        };
        let records = store(&server).eligible(&filter, today()).await.unwrap();

        query_mock.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].residence, "서울");
        assert_eq!(records[0].content_kind, ContentKind::Image);
    }

    #[tokio::test]
    async fn test_error_status_is_store_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/scholarships");
            then.status(401).body(r#"{"message":"Invalid API key"}"#);
        });

        let record = ScholarshipRecord {
            title: "t".to_string(),
            link: "https://web.example.ac.kr/board/view?seq=2".to_string(),
            due_date: today(),
            min_gpa: 0.0,
            max_income: 99,
            residence: NATIONWIDE.to_string(),
            content_kind: ContentKind::Text,
        };
        let result = store(&server).upsert(&record).await;

        assert!(matches!(result, Err(EtlError::StoreError { .. })));
    }
}
