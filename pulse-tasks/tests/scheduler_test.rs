mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Fakes, MemoryUsers};
use tokio::sync::Notify;
use tower::ServiceExt;

use pulse_tasks::backends::{PAGEVIEWS_TABLE, PAGEVIEW_QUEUE_KEY};
use pulse_tasks::config::AppConfig;
use pulse_tasks::routes::router;
use pulse_tasks::scheduler::{schedules_from_config, Job, JobOutcome, Scheduler};
use pulse_tasks::AppState;

fn scheduler(fakes: &Fakes, self_hosted: bool) -> Arc<Scheduler> {
    let schedules = schedules_from_config(&AppConfig::default());
    Arc::new(Scheduler::new(Arc::new(fakes.backends(self_hosted)), &schedules).unwrap())
}

fn app(fakes: &Fakes, self_hosted: bool) -> axum::Router {
    router(Arc::new(AppState {
        backends: Arc::new(fakes.backends(self_hosted)),
        scheduler: scheduler(fakes, self_hosted),
        metrics: None,
    }))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn invalid_cron_expression_is_rejected() {
    let fakes = Fakes::new();
    let result = Scheduler::new(
        Arc::new(fakes.backends(false)),
        &[(Job::FlushEvents, "every minute".to_string())],
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn spawned_loop_fires_on_schedule() {
    let fakes = Fakes::new();
    let scheduler = Arc::new(
        Scheduler::new(
            Arc::new(fakes.backends(false)),
            &[(Job::FlushEvents, "* * * * * *".to_string())],
        )
        .unwrap(),
    );

    let handles = scheduler.clone().spawn();
    fakes.cache.push(PAGEVIEW_QUEUE_KEY, "e1");
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    for handle in &handles {
        handle.abort();
    }
    let inserts = fakes.store.inserts();
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].0, PAGEVIEWS_TABLE);
    assert_eq!(inserts[0].1, vec!["e1".to_string()]);
}

#[tokio::test]
async fn trigger_runs_the_requested_job() {
    let fakes = Fakes::new();
    fakes.cache.push(PAGEVIEW_QUEUE_KEY, "e1");

    let outcome = scheduler(&fakes, false).trigger(Job::FlushEvents).await;

    match outcome {
        Some(JobOutcome::FlushEvents(report)) => assert_eq!(report.pageviews, 1),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(fakes.store.inserts()[0].0, PAGEVIEWS_TABLE);
}

#[tokio::test]
async fn overlapping_trigger_of_the_same_job_is_skipped() {
    let fakes = Fakes::new();
    let gate = Arc::new(Notify::new());
    *fakes.store.insert_gate.lock().unwrap() = Some(gate.clone());
    fakes.cache.push(PAGEVIEW_QUEUE_KEY, "e1");

    let scheduler = scheduler(&fakes, false);
    let first = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.trigger(Job::FlushEvents).await })
    };

    while !scheduler.is_running(Job::FlushEvents) {
        tokio::task::yield_now().await;
    }

    assert!(scheduler.trigger(Job::FlushEvents).await.is_none());
    // A different job is not blocked by the running flush.
    assert!(scheduler.trigger(Job::GeneralStats).await.is_some());

    gate.notify_one();
    assert!(first.await.unwrap().is_some());
    assert!(!scheduler.is_running(Job::FlushEvents));
}

#[tokio::test]
async fn self_hosted_jobs_return_immediately() {
    let fakes = Fakes::with_users(MemoryUsers::with_counts(3, 4));
    let scheduler = scheduler(&fakes, true);

    for job in [Job::WeeklyReport, Job::MonthlyReport, Job::GeneralStats] {
        assert!(scheduler.trigger(job).await.is_some());
    }

    assert_eq!(fakes.total_calls(), 0);
    assert!(fakes.mailer.sent().is_empty());
}

#[tokio::test]
async fn health_reports_cache_status() {
    let fakes = Fakes::new();

    let response = app(&fakes, false)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "pulse-tasks");
}

#[tokio::test]
async fn general_stats_endpoint_refreshes_on_cache_miss() {
    let fakes = Fakes::with_users(MemoryUsers::with_counts(5, 8));
    fakes.store.set_count(PAGEVIEWS_TABLE, 40);

    let response = app(&fakes, false)
        .oneshot(Request::get("/stats/general").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["users"], 5);
    assert_eq!(json["data"]["projects"], 8);
    assert_eq!(json["data"]["pageviews"], 40);
}

#[tokio::test]
async fn self_hosted_general_stats_endpoint_returns_zeros() {
    let fakes = Fakes::with_users(MemoryUsers::with_counts(5, 8));

    let response = app(&fakes, true)
        .oneshot(Request::get("/stats/general").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["users"], 0);
    assert_eq!(json["data"]["pageviews"], 0);
    assert_eq!(fakes.total_calls(), 0);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let fakes = Fakes::new();

    let response = app(&fakes, false)
        .oneshot(
            Request::post("/internal/jobs/hourly-cleanup/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "E7001");
}

#[tokio::test]
async fn manual_job_run_returns_outcome() {
    let fakes = Fakes::with_users(MemoryUsers::with_counts(2, 3));

    let response = app(&fakes, false)
        .oneshot(
            Request::post("/internal/jobs/general-stats/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["job"], "general-stats");
    assert_eq!(json["data"]["stats"]["users"], 2);
}
