use chrono::{DateTime, Duration, Months, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{projects, users};

// --- Relational rows ---

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
pub struct UserEmail {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = projects)]
pub struct ProjectRow {
    pub id: String,
    pub user_id: Uuid,
    pub name: String,
}

// --- Report settings ---

/// How often a user wants a project report. Stored as text in `users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFrequency {
    None,
    Weekly,
    Monthly,
}

impl ReportFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Week,
    Month,
}

pub const REPORT_DATE_FORMAT: &str = "%d.%m.%Y";

impl ReportPeriod {
    /// Single-letter period code carried in the report payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Week => "w",
            Self::Month => "M",
        }
    }

    pub fn frequency(&self) -> ReportFrequency {
        match self {
            Self::Week => ReportFrequency::Weekly,
            Self::Month => ReportFrequency::Monthly,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// `end` minus one period. Month steps clamp to the last valid day.
    pub fn start_of(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Week => end - Duration::weeks(1),
            Self::Month => end
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| end - Duration::days(30)),
        }
    }

    /// `DD.MM.YYYY - DD.MM.YYYY`, covering one period ending at `now`.
    pub fn date_range(&self, now: DateTime<Utc>) -> String {
        format!(
            "{} - {}",
            self.start_of(now).format(REPORT_DATE_FORMAT),
            now.format(REPORT_DATE_FORMAT)
        )
    }
}

// --- Report recipients ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

/// A user selected for a report run: only the email and owned projects are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecipient {
    pub email: String,
    pub projects: Option<Vec<ProjectRef>>,
}

// --- Analytics ---

/// Parsed form of a record from the custom-event queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub id: String,
    pub pid: String,
    pub ev: String,
    pub created: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Pageviews in the reported period.
    pub current: u64,
    /// Pageviews in the period before it.
    pub previous: u64,
    /// Percentage change from `previous` to `current`.
    pub change: f64,
}

impl ProjectSummary {
    pub fn new(current: u64, previous: u64) -> Self {
        let change = if previous == 0 {
            0.0
        } else {
            let raw = (current as f64 - previous as f64) / previous as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        Self { current, previous, change }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectReport {
    pub data: ProjectSummary,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub date: String,
    pub projects: Vec<ProjectReport>,
    pub tip: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralStats {
    pub users: u64,
    pub projects: u64,
    pub pageviews: u64,
}
