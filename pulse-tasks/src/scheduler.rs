//! Cron-driven runner for the four periodic jobs.
//!
//! Each job has its own loop and its own lock. A trigger that fires while the
//! previous run of the same job is still going is skipped; different jobs
//! never wait on each other.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use cron::Schedule;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::models::{GeneralStats, ReportPeriod};
use crate::services::flush::{flush_event_cache, FlushReport};
use crate::services::general_stats::refresh_general_stats;
use crate::services::reports::{send_project_reports, ReportRun};
use crate::services::Backends;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Job {
    FlushEvents,
    WeeklyReport,
    MonthlyReport,
    GeneralStats,
}

impl Job {
    pub const ALL: [Job; 4] = [
        Job::FlushEvents,
        Job::WeeklyReport,
        Job::MonthlyReport,
        Job::GeneralStats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FlushEvents => "flush-events",
            Self::WeeklyReport => "weekly-report",
            Self::MonthlyReport => "monthly-report",
            Self::GeneralStats => "general-stats",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job: {0}")]
pub struct UnknownJob(pub String);

impl FromStr for Job {
    type Err = UnknownJob;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Job::ALL
            .into_iter()
            .find(|job| job.name() == s)
            .ok_or_else(|| UnknownJob(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid cron expression {expression:?} for {job}: {source}")]
    InvalidCron {
        job: Job,
        expression: String,
        #[source]
        source: cron::error::Error,
    },
}

/// Result of a single job run, returned to manual triggers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "job", rename_all = "kebab-case")]
pub enum JobOutcome {
    FlushEvents(FlushReport),
    WeeklyReport(ReportRun),
    MonthlyReport(ReportRun),
    GeneralStats { stats: Option<GeneralStats> },
}

/// Cron expressions for every job, in the order of [`Job::ALL`].
pub fn schedules_from_config(config: &AppConfig) -> Vec<(Job, String)> {
    vec![
        (Job::FlushEvents, config.flush_cron.clone()),
        (Job::WeeklyReport, config.weekly_report_cron.clone()),
        (Job::MonthlyReport, config.monthly_report_cron.clone()),
        (Job::GeneralStats, config.general_stats_cron.clone()),
    ]
}

/// Lock plus a flag observers can read without touching the lock.
#[derive(Default)]
struct JobSlot {
    lock: Mutex<()>,
    running: AtomicBool,
}

/// Marks a slot as running until dropped.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    backends: Arc<Backends>,
    schedules: Vec<(Job, Schedule)>,
    slots: HashMap<Job, JobSlot>,
}

impl Scheduler {
    pub fn new(backends: Arc<Backends>, schedules: &[(Job, String)]) -> Result<Self, SchedulerError> {
        let schedules = schedules
            .iter()
            .map(|(job, expression)| {
                Schedule::from_str(expression)
                    .map(|schedule| (*job, schedule))
                    .map_err(|source| SchedulerError::InvalidCron {
                        job: *job,
                        expression: expression.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let slots = Job::ALL.into_iter().map(|job| (job, JobSlot::default())).collect();

        Ok(Self { backends, schedules, slots })
    }

    /// Start one timer loop per scheduled job.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        self.schedules
            .iter()
            .map(|(job, schedule)| {
                let scheduler = Arc::clone(&self);
                let job = *job;
                let schedule = schedule.clone();
                tracing::info!(job = %job, cron = %schedule, "job scheduled");
                tokio::spawn(async move { scheduler.run_loop(job, schedule).await })
            })
            .collect()
    }

    async fn run_loop(self: Arc<Self>, job: Job, schedule: Schedule) {
        loop {
            let now = Utc::now();
            let Some(next) = schedule.after(&now).next() else {
                tracing::warn!(job = %job, "cron schedule has no upcoming runs, stopping");
                return;
            };

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let scheduler = Arc::clone(&self);
            tokio::spawn(async move {
                scheduler.trigger(job).await;
            });
        }
    }

    /// Run `job` now. Returns `None` when a run of the same job is in progress.
    pub async fn trigger(&self, job: Job) -> Option<JobOutcome> {
        let slot = self.slots.get(&job)?;
        let Ok(_guard) = slot.lock.try_lock() else {
            tracing::warn!(job = %job, "previous run still in progress, skipping trigger");
            return None;
        };
        let _running = RunningFlag::raise(&slot.running);

        let started = Instant::now();
        tracing::debug!(job = %job, "job started");
        let outcome = self.run(job).await;
        tracing::debug!(job = %job, elapsed_ms = started.elapsed().as_millis() as u64, "job finished");

        Some(outcome)
    }

    /// Whether a run of `job` is in progress. Never contends with triggers.
    pub fn is_running(&self, job: Job) -> bool {
        self.slots
            .get(&job)
            .is_some_and(|slot| slot.running.load(Ordering::Acquire))
    }

    async fn run(&self, job: Job) -> JobOutcome {
        let backends = self.backends.as_ref();
        let now = Utc::now();

        match job {
            Job::FlushEvents => {
                let report = flush_event_cache(backends.cache.as_ref(), backends.store.as_ref()).await;
                if report != FlushReport::default() {
                    tracing::info!(
                        pageviews = report.pageviews,
                        custom_events = report.custom_events,
                        skipped = report.skipped,
                        dropped = report.dropped,
                        "event cache flushed"
                    );
                }
                JobOutcome::FlushEvents(report)
            }
            Job::WeeklyReport => {
                JobOutcome::WeeklyReport(send_project_reports(backends, ReportPeriod::Week, now).await)
            }
            Job::MonthlyReport => {
                JobOutcome::MonthlyReport(send_project_reports(backends, ReportPeriod::Month, now).await)
            }
            Job::GeneralStats => match refresh_general_stats(backends).await {
                Ok(stats) => JobOutcome::GeneralStats { stats },
                Err(e) => {
                    tracing::error!(error = %e, "failed to refresh general stats");
                    JobOutcome::GeneralStats { stats: None }
                }
            },
        }
    }
}
