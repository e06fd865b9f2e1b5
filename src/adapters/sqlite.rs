//! SQLite-backed scholarship store.
//!
//! One table keyed by `link`; writes are single-statement upserts so the
//! existence check and the insert cannot race.

use crate::domain::model::{ContentKind, EligibilityFilter, ScholarshipRecord, Statistics, NATIONWIDE, NO_INCOME_LIMIT};
use crate::domain::ports::ScholarshipStore;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| EtlError::StoreError {
            message: "connection lock poisoned".to_string(),
        })
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS scholarships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                due_date TEXT NOT NULL,
                min_gpa REAL NOT NULL DEFAULT 0,
                max_income INTEGER NOT NULL DEFAULT 99,
                residence TEXT NOT NULL DEFAULT '전국',
                content_kind TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scholarships_due_date ON scholarships(due_date)",
            [],
        )?;

        Ok(())
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ScholarshipRecord> {
        let due_date: String = row.get(2)?;
        let kind: String = row.get(6)?;
        Ok(ScholarshipRecord {
            title: row.get(0)?,
            link: row.get(1)?,
            due_date: NaiveDate::parse_from_str(&due_date, DATE_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?,
            min_gpa: row.get(3)?,
            max_income: row.get(4)?,
            residence: row.get(5)?,
            content_kind: ContentKind::parse(&kind).unwrap_or(ContentKind::Text),
        })
    }

    pub fn get(&self, link: &str) -> Result<Option<ScholarshipRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT title, link, due_date, min_gpa, max_income, residence, content_kind
             FROM scholarships WHERE link = ?1",
        )?;

        match stmt.query_row(params![link], Self::record_from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM scholarships", [], |row| row.get(0))?;
        Ok(total as u64)
    }
}

#[async_trait]
impl ScholarshipStore for SqliteStore {
    async fn upsert(&self, record: &ScholarshipRecord) -> Result<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO scholarships
                (title, link, due_date, min_gpa, max_income, residence, content_kind, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(link) DO UPDATE SET
                title = excluded.title,
                due_date = excluded.due_date,
                min_gpa = excluded.min_gpa,
                max_income = excluded.max_income,
                residence = excluded.residence,
                content_kind = excluded.content_kind,
                updated_at = excluded.updated_at",
            params![
                record.title,
                record.link,
                record.due_date.format(DATE_FORMAT).to_string(),
                record.min_gpa,
                record.max_income,
                record.residence,
                record.content_kind.as_str(),
                now,
            ],
        )?;

        Ok(())
    }

    async fn statistics(&self, today: NaiveDate) -> Result<Statistics> {
        let conn = self.lock()?;
        let today = today.format(DATE_FORMAT).to_string();

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM scholarships", [], |row| row.get(0))?;
        let active: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scholarships WHERE due_date >= ?1",
            params![today],
            |row| row.get(0),
        )?;

        Ok(Statistics::from_counts(total as u64, active as u64))
    }

    async fn eligible(
        &self,
        filter: &EligibilityFilter,
        today: NaiveDate,
    ) -> Result<Vec<ScholarshipRecord>> {
        let mut sql = String::from(
            "SELECT title, link, due_date, min_gpa, max_income, residence, content_kind
             FROM scholarships WHERE due_date >= ?",
        );
        let mut values: Vec<SqlValue> = vec![SqlValue::Text(today.format(DATE_FORMAT).to_string())];

        if let Some(gpa) = filter.gpa {
            sql.push_str(" AND min_gpa <= ?");
            values.push(SqlValue::Real(gpa));
        }
        if let Some(income) = filter.income {
            sql.push_str(" AND (max_income >= ? OR max_income = ?)");
            values.push(SqlValue::Integer(income));
            values.push(SqlValue::Integer(NO_INCOME_LIMIT));
        }
        if let Some(residence) = &filter.residence {
            sql.push_str(" AND (residence = ? OR residence = ?)");
            values.push(SqlValue::Text(residence.clone()));
            values.push(SqlValue::Text(NATIONWIDE.to_string()));
        }
        sql.push_str(" ORDER BY due_date ASC, id ASC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), Self::record_from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
