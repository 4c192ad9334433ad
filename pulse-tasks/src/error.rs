use thiserror::Error;

/// Failures raised by the backends a scheduled job talks to.
///
/// Jobs log these where they happen; none of them escapes a scheduled run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("cache read failed: {0}")]
    CacheRead(String),

    #[error("cache write failed: {0}")]
    CacheWrite(String),

    #[error("columnar store insert failed: {0}")]
    StoreInsert(String),

    #[error("columnar store query failed: {0}")]
    StoreQuery(String),

    #[error("malformed cached record: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("report payload could not be built: {0}")]
    Payload(String),

    #[error("relational store error: {0}")]
    Relational(String),

    #[error("mail dispatch failed: {0}")]
    MailDispatch(String),
}

pub type TaskResult<T> = Result<T, TaskError>;
