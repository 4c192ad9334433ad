//! Seams between the scheduled jobs and the stores/mailer they drive.
//!
//! Production wiring uses the adapters in the submodules; tests plug in
//! in-memory implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_shared::clients::email::DeliveryClass;

use crate::error::TaskResult;
use crate::models::{ReportFrequency, ReportRecipient};

pub mod clickhouse;
pub mod mailer;
pub mod postgres;
pub mod redis;

/// Redis list holding serialized pageview records.
pub const PAGEVIEW_QUEUE_KEY: &str = "pageview-queue";
/// Redis list holding serialized custom-event records.
pub const CUSTOM_EVENT_QUEUE_KEY: &str = "custom-event-queue";

pub const USERS_COUNT_KEY: &str = "stats:users_count";
pub const PROJECTS_COUNT_KEY: &str = "stats:projects_count";
pub const PAGEVIEWS_COUNT_KEY: &str = "stats:pageviews_count";

pub const PAGEVIEWS_TABLE: &str = "analytics";
pub const CUSTOM_EVENTS_TABLE: &str = "customEV";

#[async_trait]
pub trait EventCache: Send + Sync {
    /// Read and clear a queue as one atomic step.
    async fn drain(&self, key: &str) -> TaskResult<Vec<String>>;

    async fn get(&self, key: &str) -> TaskResult<Option<String>>;

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> TaskResult<()>;
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Insert JSON rows as one batch; any rejected row fails the whole batch.
    async fn batch_insert(&self, table: &str, rows: &[String]) -> TaskResult<()>;

    async fn count(&self, table: &str) -> TaskResult<u64>;

    /// Pageviews per project in `[from, to)`. Projects without rows are absent.
    async fn pageviews_by_project(
        &self,
        project_ids: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TaskResult<HashMap<String, u64>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users with the given report frequency, each with their projects.
    async fn report_recipients(&self, frequency: ReportFrequency) -> TaskResult<Vec<ReportRecipient>>;

    async fn count_users(&self) -> TaskResult<u64>;

    async fn count_projects(&self) -> TaskResult<u64>;
}

/// Template identifiers known to the mail provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterTemplate {
    ProjectReport,
}

impl LetterTemplate {
    pub fn alias(&self) -> &'static str {
        match self {
            Self::ProjectReport => "project-report",
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        template: LetterTemplate,
        payload: &serde_json::Value,
        class: DeliveryClass,
    ) -> TaskResult<()>;
}
