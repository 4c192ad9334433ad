use super::Backends;
use crate::backends::{
    CUSTOM_EVENTS_TABLE, PAGEVIEWS_COUNT_KEY, PAGEVIEWS_TABLE, PROJECTS_COUNT_KEY, USERS_COUNT_KEY,
};
use crate::error::TaskResult;
use crate::models::GeneralStats;

/// TTL of the cached counters, slightly longer than the refresh interval.
pub const GENERAL_STATS_TTL_SECS: u64 = 630;

/// Recompute the user, project and pageview totals and cache them.
///
/// Returns `None` on self-hosted deployments, where nothing is queried.
pub async fn refresh_general_stats(backends: &Backends) -> TaskResult<Option<GeneralStats>> {
    if backends.self_hosted {
        return Ok(None);
    }

    let users = backends.users.count_users().await?;
    let projects = backends.users.count_projects().await?;
    let pageviews = backends.store.count(PAGEVIEWS_TABLE).await?
        + backends.store.count(CUSTOM_EVENTS_TABLE).await?;

    let stats = GeneralStats { users, projects, pageviews };

    for (key, value) in [
        (USERS_COUNT_KEY, users),
        (PROJECTS_COUNT_KEY, projects),
        (PAGEVIEWS_COUNT_KEY, pageviews),
    ] {
        if let Err(e) = backends
            .cache
            .set_with_expiry(key, &value.to_string(), GENERAL_STATS_TTL_SECS)
            .await
        {
            tracing::warn!(error = %e, key = key, "failed to cache general stat");
        }
    }

    tracing::debug!(users, projects, pageviews, "general stats refreshed");
    Ok(Some(stats))
}

/// Read the cached counters. `None` when any of them has expired.
pub async fn cached_general_stats(backends: &Backends) -> TaskResult<Option<GeneralStats>> {
    let mut values = [0u64; 3];
    for (slot, key) in values
        .iter_mut()
        .zip([USERS_COUNT_KEY, PROJECTS_COUNT_KEY, PAGEVIEWS_COUNT_KEY])
    {
        match backends.cache.get(key).await? {
            Some(raw) => match raw.parse() {
                Ok(v) => *slot = v,
                Err(_) => return Ok(None),
            },
            None => return Ok(None),
        }
    }

    Ok(Some(GeneralStats {
        users: values[0],
        projects: values[1],
        pageviews: values[2],
    }))
}
