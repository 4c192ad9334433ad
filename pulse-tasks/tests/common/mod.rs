#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pulse_shared::clients::email::DeliveryClass;
use tokio::sync::Notify;

use pulse_tasks::backends::{AnalyticsStore, EventCache, LetterTemplate, Mailer, UserDirectory};
use pulse_tasks::error::{TaskError, TaskResult};
use pulse_tasks::models::{ProjectRef, ReportFrequency, ReportRecipient};
use pulse_tasks::services::Backends;

// --- Cache ---

#[derive(Default)]
pub struct MemoryCache {
    lists: Mutex<HashMap<String, Vec<String>>>,
    values: Mutex<HashMap<String, (String, u64)>>,
    failing_drains: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl MemoryCache {
    pub fn push(&self, key: &str, record: &str) {
        self.lists
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push(record.to_string());
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        self.lists.lock().unwrap().get(key).cloned().unwrap_or_default()
    }

    pub fn value(&self, key: &str) -> Option<(String, u64)> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn fail_drain(&self, key: &str) {
        self.failing_drains.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl EventCache for MemoryCache {
    async fn drain(&self, key: &str) -> TaskResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_drains.lock().unwrap().contains(key) {
            return Err(TaskError::CacheRead("connection reset".into()));
        }
        Ok(self.lists.lock().unwrap().remove(key).unwrap_or_default())
    }

    async fn get(&self, key: &str) -> TaskResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> TaskResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }
}

// --- Columnar store ---

#[derive(Default)]
pub struct MemoryStore {
    pub inserts: Mutex<Vec<(String, Vec<String>)>>,
    pub counts: Mutex<HashMap<String, u64>>,
    /// Pageviews returned for the window ending now.
    pub current: Mutex<HashMap<String, u64>>,
    /// Pageviews returned for any earlier window.
    pub previous: Mutex<HashMap<String, u64>>,
    pub failing_tables: Mutex<HashSet<String>>,
    /// When set, inserts wait for a notification before completing.
    pub insert_gate: Mutex<Option<Arc<Notify>>>,
    pub calls: AtomicUsize,
}

impl MemoryStore {
    pub fn set_count(&self, table: &str, count: u64) {
        self.counts.lock().unwrap().insert(table.to_string(), count);
    }

    pub fn set_current(&self, pid: &str, views: u64) {
        self.current.lock().unwrap().insert(pid.to_string(), views);
    }

    pub fn set_previous(&self, pid: &str, views: u64) {
        self.previous.lock().unwrap().insert(pid.to_string(), views);
    }

    pub fn fail_inserts_into(&self, table: &str) {
        self.failing_tables.lock().unwrap().insert(table.to_string());
    }

    pub fn inserts(&self) -> Vec<(String, Vec<String>)> {
        self.inserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn batch_insert(&self, table: &str, rows: &[String]) -> TaskResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.insert_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing_tables.lock().unwrap().contains(table) {
            return Err(TaskError::StoreInsert(format!("{table} rejected the batch")));
        }
        self.inserts
            .lock()
            .unwrap()
            .push((table.to_string(), rows.to_vec()));
        Ok(())
    }

    async fn count(&self, table: &str) -> TaskResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.counts.lock().unwrap().get(table).copied().unwrap_or(0))
    }

    async fn pageviews_by_project(
        &self,
        project_ids: &[String],
        _from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TaskResult<HashMap<String, u64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let source = if Utc::now() - to < Duration::hours(1) {
            self.current.lock().unwrap()
        } else {
            self.previous.lock().unwrap()
        };
        Ok(project_ids
            .iter()
            .filter_map(|pid| source.get(pid).map(|v| (pid.clone(), *v)))
            .collect())
    }
}

// --- Relational store ---

#[derive(Default)]
pub struct MemoryUsers {
    pub recipients: Mutex<HashMap<&'static str, Vec<ReportRecipient>>>,
    pub users: u64,
    pub projects: u64,
    pub calls: AtomicUsize,
}

impl MemoryUsers {
    pub fn with_counts(users: u64, projects: u64) -> Self {
        Self {
            users,
            projects,
            ..Self::default()
        }
    }

    pub fn add(&self, frequency: ReportFrequency, recipient: ReportRecipient) {
        self.recipients
            .lock()
            .unwrap()
            .entry(frequency.as_str())
            .or_default()
            .push(recipient);
    }
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn report_recipients(&self, frequency: ReportFrequency) -> TaskResult<Vec<ReportRecipient>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .recipients
            .lock()
            .unwrap()
            .get(frequency.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn count_users(&self) -> TaskResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users)
    }

    async fn count_projects(&self) -> TaskResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.projects)
    }
}

// --- Mailer ---

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub template: LetterTemplate,
    pub payload: serde_json::Value,
    pub class: DeliveryClass,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub failing: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl RecordingMailer {
    pub fn fail_for(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        template: LetterTemplate,
        payload: &serde_json::Value,
        class: DeliveryClass,
    ) -> TaskResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(to) {
            return Err(TaskError::MailDispatch(format!("mailbox {to} unavailable")));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            template,
            payload: payload.clone(),
            class,
        });
        Ok(())
    }
}

// --- Wiring ---

pub struct Fakes {
    pub cache: Arc<MemoryCache>,
    pub store: Arc<MemoryStore>,
    pub users: Arc<MemoryUsers>,
    pub mailer: Arc<RecordingMailer>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with_users(MemoryUsers::default())
    }

    pub fn with_users(users: MemoryUsers) -> Self {
        Self {
            cache: Arc::new(MemoryCache::default()),
            store: Arc::new(MemoryStore::default()),
            users: Arc::new(users),
            mailer: Arc::new(RecordingMailer::default()),
        }
    }

    pub fn backends(&self, self_hosted: bool) -> Backends {
        Backends {
            cache: self.cache.clone(),
            store: self.store.clone(),
            users: self.users.clone(),
            mailer: self.mailer.clone(),
            self_hosted,
        }
    }

    /// Calls made to any backend.
    pub fn total_calls(&self) -> usize {
        self.cache.calls.load(Ordering::SeqCst)
            + self.store.calls.load(Ordering::SeqCst)
            + self.users.calls.load(Ordering::SeqCst)
            + self.mailer.calls.load(Ordering::SeqCst)
    }
}

pub fn recipient(email: &str, projects: &[(&str, &str)]) -> ReportRecipient {
    ReportRecipient {
        email: email.to_string(),
        projects: Some(
            projects
                .iter()
                .map(|(id, name)| ProjectRef {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        ),
    }
}
