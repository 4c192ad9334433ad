use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

/// HTTP client wrapper for ClickHouse.
///
/// SQL is posted as the request body. Named parameters are passed as
/// `param_<name>` query-string entries and substituted by ClickHouse for
/// `{name:Type}` placeholders.
#[derive(Clone)]
pub struct ClickHouseClient {
    client: Client,
    url: String,
    user: String,
    password: String,
    database: String,
}

impl ClickHouseClient {
    pub fn new(
        url: &str,
        user: &str,
        password: &str,
        database: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build ClickHouse HTTP client")?;
        tracing::info!(url = %url, database = %database, "ClickHouse client configured");
        Ok(Self {
            client,
            url: url.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        })
    }

    /// Execute a SELECT query and return the `data` array of the JSON response.
    pub async fn query(&self, sql: &str, named_params: &[(&str, &str)]) -> Result<Vec<Value>> {
        let mut url = reqwest::Url::parse(&self.url).context("invalid ClickHouse URL")?;
        {
            let mut qs = url.query_pairs_mut();
            qs.append_pair("default_format", "JSON");
            qs.append_pair("database", &self.database);
            for (k, v) in named_params {
                qs.append_pair(&format!("param_{k}"), v);
            }
        }

        let resp = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .body(sql.to_string())
            .send()
            .await
            .context("ClickHouse HTTP request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("ClickHouse error {status}: {body}");
        }

        let json: Value = resp
            .json()
            .await
            .context("ClickHouse response parse failed")?;
        Ok(json
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Insert pre-serialized JSON objects, one per row, as a single batch.
    ///
    /// ClickHouse applies the whole INSERT or rejects it.
    pub async fn insert_json_rows(&self, table: &str, rows: &[String]) -> Result<()> {
        if !is_identifier(table) {
            anyhow::bail!("invalid ClickHouse table name: {table}");
        }
        if rows.is_empty() {
            return Ok(());
        }

        let mut url = reqwest::Url::parse(&self.url).context("invalid ClickHouse URL")?;
        url.query_pairs_mut().append_pair("database", &self.database);

        let resp = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .body(insert_body(table, rows))
            .send()
            .await
            .context("ClickHouse insert request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("ClickHouse insert error {status}: {body}");
        }
        Ok(())
    }
}

fn insert_body(table: &str, rows: &[String]) -> String {
    let mut body = format!("INSERT INTO {table} FORMAT JSONEachRow\n");
    body.push_str(&rows.join("\n"));
    body
}

pub(crate) fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
