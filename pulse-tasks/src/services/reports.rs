use chrono::{DateTime, Utc};
use metrics::counter;
use pulse_shared::clients::email::DeliveryClass;
use serde::Serialize;

use super::summary::summarize;
use super::tips::random_tip;
use super::Backends;
use crate::backends::LetterTemplate;
use crate::error::{TaskError, TaskResult};
use crate::models::{ProjectRef, ProjectReport, ProjectSummary, ReportPayload, ReportPeriod};

/// Outcome of one report run. Only used for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportRun {
    pub sent: usize,
    /// Users without projects.
    pub skipped: usize,
    pub failed: usize,
}

/// Email every user subscribed to `period` reports a summary of their projects.
///
/// One failing user never stops the run; every failure is logged.
pub async fn send_project_reports(
    backends: &Backends,
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> ReportRun {
    let mut run = ReportRun::default();

    if backends.self_hosted {
        return run;
    }

    let recipients = match backends.users.report_recipients(period.frequency()).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, period = period.label(), "failed to load report recipients");
            return run;
        }
    };

    let date = period.date_range(now);
    let tip = random_tip();

    for recipient in &recipients {
        let projects = match recipient.projects.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => {
                run.skipped += 1;
                continue;
            }
        };

        match send_report(backends, &recipient.email, projects, period, &date, tip, now).await {
            Ok(()) => {
                run.sent += 1;
                counter!("pulse_reports_sent_total", "period" => period.label()).increment(1);
            }
            Err(e) => {
                run.failed += 1;
                counter!("pulse_reports_failed_total", "period" => period.label()).increment(1);
                tracing::error!(
                    error = %e,
                    email = %recipient.email,
                    period = period.label(),
                    "failed to send project report"
                );
            }
        }
    }

    tracing::info!(
        period = period.label(),
        sent = run.sent,
        skipped = run.skipped,
        failed = run.failed,
        "project reports dispatched"
    );

    run
}

async fn send_report(
    backends: &Backends,
    email: &str,
    projects: &[ProjectRef],
    period: ReportPeriod,
    date: &str,
    tip: &'static str,
    now: DateTime<Utc>,
) -> TaskResult<()> {
    let ids: Vec<String> = projects.iter().map(|p| p.id.clone()).collect();
    let summaries = summarize(backends.store.as_ref(), &ids, period, now).await?;

    let entries = projects
        .iter()
        .map(|project| {
            let data = summaries.get(&project.id).copied().unwrap_or_else(|| {
                tracing::warn!(project_id = %project.id, "no summary for project, reporting zeros");
                ProjectSummary::default()
            });
            ProjectReport {
                data,
                name: project.name.clone(),
            }
        })
        .collect();

    let payload = ReportPayload {
        kind: period.code(),
        date: date.to_string(),
        projects: entries,
        tip,
    };
    let payload = serde_json::to_value(&payload).map_err(|e| TaskError::Payload(e.to_string()))?;

    backends
        .mailer
        .send(email, LetterTemplate::ProjectReport, &payload, DeliveryClass::Broadcast)
        .await
}
