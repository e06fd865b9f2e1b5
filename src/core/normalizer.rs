use crate::domain::model::{
    AnnouncementRef, ContentKind, RawCriteria, ScholarshipRecord, NATIONWIDE, NO_INCOME_LIMIT,
};
use chrono::{Duration, NaiveDate};

/// Applies field defaults and validation to analysis output.
#[derive(Debug, Clone, Copy)]
pub struct CriteriaNormalizer {
    run_date: NaiveDate,
    default_due_days: i64,
}

impl CriteriaNormalizer {
    pub fn new(run_date: NaiveDate, default_due_days: i64) -> Self {
        Self {
            run_date,
            default_due_days,
        }
    }

    /// Deadline assigned when an announcement has none. Saturates at the
    /// last representable date.
    pub fn default_due_date(&self) -> NaiveDate {
        Duration::try_days(self.default_due_days)
            .and_then(|days| self.run_date.checked_add_signed(days))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn normalize(
        &self,
        item: &AnnouncementRef,
        raw: &RawCriteria,
        via: ContentKind,
    ) -> ScholarshipRecord {
        let min_gpa = raw
            .min_gpa
            .filter(|gpa| gpa.is_finite() && *gpa >= 0.0)
            .unwrap_or(0.0);

        let max_income = raw
            .max_income
            .filter(|income| (0..=NO_INCOME_LIMIT).contains(income))
            .unwrap_or(NO_INCOME_LIMIT);

        let residence = raw
            .residence
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(NATIONWIDE)
            .to_string();

        let due_date = match raw.due_date.as_deref().and_then(parse_due_date) {
            Some(date) => date,
            None => {
                let fallback = self.default_due_date();
                tracing::info!(
                    link = %item.link,
                    stage = "normalize",
                    due_date = %fallback,
                    "⚠️ No usable deadline, using default"
                );
                fallback
            }
        };

        ScholarshipRecord {
            title: item.title.clone(),
            link: item.link.clone(),
            due_date,
            min_gpa,
            max_income,
            residence,
            content_kind: via,
        }
    }
}

/// A strict `YYYY-MM-DD` calendar date, or `None`.
pub fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
