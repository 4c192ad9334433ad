use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::backends::AnalyticsStore;
use crate::error::TaskResult;
use crate::models::{ProjectSummary, ReportPeriod};

/// Pageview summary for each requested project over the period ending at `now`,
/// compared with the period before it.
///
/// Every id in `project_ids` gets an entry; projects without traffic get zeros.
pub async fn summarize(
    store: &dyn AnalyticsStore,
    project_ids: &[String],
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> TaskResult<HashMap<String, ProjectSummary>> {
    let period_start = period.start_of(now);
    let previous_start = period.start_of(period_start);

    let current = store.pageviews_by_project(project_ids, period_start, now).await?;
    let previous = store
        .pageviews_by_project(project_ids, previous_start, period_start)
        .await?;

    Ok(project_ids
        .iter()
        .map(|pid| {
            let summary = ProjectSummary::new(
                current.get(pid).copied().unwrap_or(0),
                previous.get(pid).copied().unwrap_or(0),
            );
            (pid.clone(), summary)
        })
        .collect())
}
