use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_shared::clients::clickhouse::ClickHouseClient;
use serde_json::Value;

use super::{AnalyticsStore, PAGEVIEWS_TABLE};
use crate::error::{TaskError, TaskResult};

const CH_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[async_trait]
impl AnalyticsStore for ClickHouseClient {
    async fn batch_insert(&self, table: &str, rows: &[String]) -> TaskResult<()> {
        self.insert_json_rows(table, rows)
            .await
            .map_err(|e| TaskError::StoreInsert(format!("{e:#}")))
    }

    async fn count(&self, table: &str) -> TaskResult<u64> {
        if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TaskError::StoreQuery(format!("invalid table name: {table}")));
        }
        let rows = self
            .query(&format!("SELECT count() AS c FROM {table}"), &[])
            .await
            .map_err(|e| TaskError::StoreQuery(format!("{e:#}")))?;

        rows.first()
            .and_then(|row| row.get("c"))
            .and_then(as_u64)
            .ok_or_else(|| TaskError::StoreQuery(format!("count({table}) returned no rows")))
    }

    async fn pageviews_by_project(
        &self,
        project_ids: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TaskResult<HashMap<String, u64>> {
        if project_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT pid, count() AS c FROM {PAGEVIEWS_TABLE} \
             WHERE pid IN {{pids:Array(String)}} \
             AND created >= {{from:DateTime}} AND created < {{to:DateTime}} \
             GROUP BY pid"
        );
        let pids = array_param(project_ids);
        let from = from.format(CH_DATETIME_FORMAT).to_string();
        let to = to.format(CH_DATETIME_FORMAT).to_string();

        let rows = self
            .query(&sql, &[("pids", &pids), ("from", &from), ("to", &to)])
            .await
            .map_err(|e| TaskError::StoreQuery(format!("{e:#}")))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let pid = row.get("pid")?.as_str()?.to_string();
                let count = row.get("c").and_then(as_u64)?;
                Some((pid, count))
            })
            .collect())
    }
}

/// ClickHouse quotes 64-bit integers in JSON output by default.
fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn array_param(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(","))
}
