use std::sync::Arc;

use crate::backends::{AnalyticsStore, EventCache, Mailer, UserDirectory};

pub mod flush;
pub mod general_stats;
pub mod reports;
pub mod summary;
pub mod tips;

/// Everything a scheduled job needs to reach the outside world.
#[derive(Clone)]
pub struct Backends {
    pub cache: Arc<dyn EventCache>,
    pub store: Arc<dyn AnalyticsStore>,
    pub users: Arc<dyn UserDirectory>,
    pub mailer: Arc<dyn Mailer>,
    /// Disables report emails and general stats refreshes.
    pub self_hosted: bool,
}
