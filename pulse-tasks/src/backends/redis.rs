use async_trait::async_trait;
use pulse_shared::clients::redis::RedisClient;

use super::EventCache;
use crate::error::{TaskError, TaskResult};

#[async_trait]
impl EventCache for RedisClient {
    async fn drain(&self, key: &str) -> TaskResult<Vec<String>> {
        self.drain_list(key)
            .await
            .map_err(|e| TaskError::CacheRead(e.to_string()))
    }

    async fn get(&self, key: &str) -> TaskResult<Option<String>> {
        RedisClient::get(self, key)
            .await
            .map_err(|e| TaskError::CacheRead(e.to_string()))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> TaskResult<()> {
        self.set(key, value, ttl_secs)
            .await
            .map_err(|e| TaskError::CacheWrite(e.to_string()))
    }
}
