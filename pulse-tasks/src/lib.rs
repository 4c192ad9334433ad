use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

pub mod backends;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod services;

use crate::scheduler::Scheduler;
use crate::services::Backends;

pub struct AppState {
    pub backends: Arc<Backends>,
    pub scheduler: Arc<Scheduler>,
    pub metrics: Option<PrometheusHandle>,
}
