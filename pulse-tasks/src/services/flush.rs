use metrics::counter;
use serde::Serialize;

use crate::backends::{
    AnalyticsStore, EventCache, CUSTOM_EVENTS_TABLE, CUSTOM_EVENT_QUEUE_KEY, PAGEVIEWS_TABLE,
    PAGEVIEW_QUEUE_KEY,
};
use crate::error::TaskResult;
use crate::models::CustomEvent;

/// What one flush moved. Only used for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Pageview records persisted.
    pub pageviews: usize,
    /// Custom events persisted.
    pub custom_events: usize,
    /// Custom-event records skipped because they did not parse.
    pub skipped: usize,
    /// Records drained but lost to a failed insert.
    pub dropped: usize,
}

/// Drain both event queues into the columnar store.
///
/// Drained records are never re-queued: a failed insert drops the batch
/// and logs it.
pub async fn flush_event_cache(cache: &dyn EventCache, store: &dyn AnalyticsStore) -> FlushReport {
    let mut report = FlushReport::default();

    match cache.drain(PAGEVIEW_QUEUE_KEY).await {
        Ok(records) if records.is_empty() => {}
        Ok(records) => {
            if insert_batch(store, PAGEVIEWS_TABLE, "pageviews", &records).await {
                report.pageviews = records.len();
            } else {
                report.dropped += records.len();
            }
        }
        Err(e) => {
            tracing::error!(error = %e, queue = PAGEVIEW_QUEUE_KEY, "failed to drain pageview queue");
        }
    }

    match cache.drain(CUSTOM_EVENT_QUEUE_KEY).await {
        Ok(records) if records.is_empty() => {}
        Ok(records) => {
            let (rows, skipped) = parse_custom_events(&records);
            report.skipped = skipped;
            if !rows.is_empty() {
                if insert_batch(store, CUSTOM_EVENTS_TABLE, "custom_events", &rows).await {
                    report.custom_events = rows.len();
                } else {
                    report.dropped += rows.len();
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, queue = CUSTOM_EVENT_QUEUE_KEY, "failed to drain custom event queue");
        }
    }

    report
}

async fn insert_batch(store: &dyn AnalyticsStore, table: &str, queue: &'static str, rows: &[String]) -> bool {
    match store.batch_insert(table, rows).await {
        Ok(()) => {
            counter!("pulse_events_flushed_total", "queue" => queue).increment(rows.len() as u64);
            tracing::debug!(table = %table, rows = rows.len(), "event batch saved");
            true
        }
        Err(e) => {
            counter!("pulse_events_dropped_total", "queue" => queue, "reason" => "insert")
                .increment(rows.len() as u64);
            tracing::error!(error = %e, table = %table, rows = rows.len(), "failed to save event batch");
            false
        }
    }
}

/// Parse raw custom-event records, re-serializing the ones that parse.
/// Returns the rows to insert and the number skipped.
fn parse_custom_events(records: &[String]) -> (Vec<String>, usize) {
    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for raw in records {
        match parse_custom_event(raw) {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                counter!("pulse_events_dropped_total", "queue" => "custom_events", "reason" => "parse")
                    .increment(1);
                tracing::warn!(error = %e, record = %raw, "skipping malformed custom event");
            }
        }
    }

    (rows, skipped)
}

fn parse_custom_event(raw: &str) -> TaskResult<String> {
    let event: CustomEvent = serde_json::from_str(raw)?;
    Ok(serde_json::to_string(&event)?)
}
