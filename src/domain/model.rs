use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Residence value meaning "no regional restriction".
pub const NATIONWIDE: &str = "전국";

/// Income bracket ceiling meaning "no income restriction".
pub const NO_INCOME_LIMIT: i64 = 99;

/// One announcement found on the listing page. `link` is always absolute and
/// is the identity of the announcement for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRef {
    pub title: String,
    pub link: String,
}

/// Resolved body of an announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentVariant {
    /// An embedded image. `text` holds whatever visible text sat next to it
    /// in the content region, used only if image analysis fails.
    Image { url: String, text: Option<String> },
    Text { body: String },
    Empty,
}

impl ContentVariant {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentVariant::Image { .. } => "image",
            ContentVariant::Text { .. } => "text",
            ContentVariant::Empty => "empty",
        }
    }

    /// Text usable by the text-analysis capability, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ContentVariant::Image { text, .. } => text.as_deref(),
            ContentVariant::Text { body } => Some(body.as_str()),
            ContentVariant::Empty => None,
        }
    }
}

/// Criteria as returned by the analysis capability, before defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCriteria {
    #[serde(default)]
    pub min_gpa: Option<f64>,
    #[serde(default)]
    pub max_income: Option<i64>,
    #[serde(default)]
    pub residence: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// Which analysis capability produced a record's criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Text,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Text => "text",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(ContentKind::Image),
            "text" => Some(ContentKind::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized, persistence-ready scholarship record keyed by `link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarshipRecord {
    pub title: String,
    pub link: String,
    pub due_date: NaiveDate,
    pub min_gpa: f64,
    pub max_income: i64,
    pub residence: String,
    pub content_kind: ContentKind,
}

impl ScholarshipRecord {
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.due_date >= today
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: u64,
    pub active: u64,
    pub expired: u64,
}

impl Statistics {
    pub fn from_counts(total: u64, active: u64) -> Self {
        Self {
            total,
            active,
            expired: total.saturating_sub(active),
        }
    }
}

/// A student's profile used to narrow active records. Unset fields do not
/// filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligibilityFilter {
    pub gpa: Option<f64>,
    pub income: Option<i64>,
    pub residence: Option<String>,
}

impl EligibilityFilter {
    pub fn matches(&self, record: &ScholarshipRecord) -> bool {
        let gpa_ok = self.gpa.map_or(true, |gpa| record.min_gpa <= gpa);
        let income_ok = self.income.map_or(true, |income| {
            record.max_income >= income || record.max_income == NO_INCOME_LIMIT
        });
        let residence_ok = self.residence.as_deref().map_or(true, |residence| {
            record.residence == residence || record.residence == NATIONWIDE
        });
        gpa_ok && income_ok && residence_ok
    }
}

/// Why a single announcement did not produce a stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFailure {
    NoContent,
    Analysis(ExtractionFailure),
    Persistence(String),
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemFailure::NoContent => write!(f, "no content could be resolved"),
            ItemFailure::Analysis(failure) => write!(f, "analysis failed: {}", failure),
            ItemFailure::Persistence(message) => write!(f, "persistence failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionFailure {
    /// Neither an image nor text was available to analyze.
    NothingToAnalyze,
    /// Every attempted capability failed; each message is kept for logging.
    AllAttemptsFailed {
        image: Option<String>,
        text: Option<String>,
    },
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::NothingToAnalyze => write!(f, "nothing to analyze"),
            ExtractionFailure::AllAttemptsFailed { image, text } => write!(
                f,
                "image: {}; text: {}",
                image.as_deref().unwrap_or("not attempted"),
                text.as_deref().unwrap_or("not attempted")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub via_image: usize,
    pub via_text: usize,
}
