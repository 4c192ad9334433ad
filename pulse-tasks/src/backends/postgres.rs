use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use pulse_shared::clients::db::DbPool;
use uuid::Uuid;

use super::UserDirectory;
use crate::error::{TaskError, TaskResult};
use crate::models::{ProjectRef, ProjectRow, ReportFrequency, ReportRecipient, UserEmail};
use crate::schema::{projects, users};

/// Diesel-backed user and project lookups.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: DbPool,
}

impl PgUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> TaskResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> QueryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| TaskError::Relational(format!("db pool error: {e}")))?;
            f(&mut conn).map_err(|e| TaskError::Relational(e.to_string()))
        })
        .await
        .map_err(|e| TaskError::Relational(format!("blocking task failed: {e}")))?
    }
}

fn load_recipients(
    conn: &mut PgConnection,
    frequency: ReportFrequency,
) -> QueryResult<Vec<ReportRecipient>> {
    let owners: Vec<UserEmail> = users::table
        .filter(users::report_frequency.eq(frequency.as_str()))
        .order(users::created_at.asc())
        .select(UserEmail::as_select())
        .load(conn)?;

    if owners.is_empty() {
        return Ok(Vec::new());
    }

    let owner_ids: Vec<Uuid> = owners.iter().map(|u| u.id).collect();
    let rows: Vec<ProjectRow> = projects::table
        .filter(projects::user_id.eq_any(owner_ids))
        .order(projects::created_at.asc())
        .select(ProjectRow::as_select())
        .load(conn)?;

    Ok(group_projects(owners, rows))
}

/// Attach each owner's projects, keeping owner order and the order of `rows`
/// within every owner. Owners without rows get an empty list.
fn group_projects(owners: Vec<UserEmail>, rows: Vec<ProjectRow>) -> Vec<ReportRecipient> {
    let mut by_owner: HashMap<Uuid, Vec<ProjectRef>> = HashMap::new();
    for row in rows {
        by_owner.entry(row.user_id).or_default().push(ProjectRef {
            id: row.id,
            name: row.name,
        });
    }

    owners
        .into_iter()
        .map(|user| ReportRecipient {
            projects: Some(by_owner.remove(&user.id).unwrap_or_default()),
            email: user.email,
        })
        .collect()
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn report_recipients(&self, frequency: ReportFrequency) -> TaskResult<Vec<ReportRecipient>> {
        self.with_conn(move |conn| load_recipients(conn, frequency)).await
    }

    async fn count_users(&self) -> TaskResult<u64> {
        let total: i64 = self
            .with_conn(|conn| users::table.count().get_result(conn))
            .await?;
        Ok(total.max(0) as u64)
    }

    async fn count_projects(&self) -> TaskResult<u64> {
        let total: i64 = self
            .with_conn(|conn| projects::table.count().get_result(conn))
            .await?;
        Ok(total.max(0) as u64)
    }
}
