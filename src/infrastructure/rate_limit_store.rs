//! 准入控制记录存储
//!
//! 存储以 key 为单位保证 check 的原子性：同一 key 的并发检查
//! 不会超出上限，也不会丢失计数。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{
        rate_limit::{evaluate, RateLimitDecision, RateLimitPolicy, RateLimitRecord},
        wallet_error::WalletError,
    },
    infrastructure::cache::RedisCtx,
};

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, WalletError>;

    async fn set(&self, record: RateLimitRecord) -> Result<(), WalletError>;

    async fn delete(&self, key: &str) -> Result<(), WalletError>;

    /// 原子地读取、判定并写回
    async fn check_and_count(
        &self,
        key: &str,
        now_ms: i64,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, WalletError>;

    /// 清理过期记录，返回清理条数。自带 TTL 的存储无需实现
    async fn purge_expired(&self, _now_ms: i64) -> Result<usize, WalletError> {
        Ok(0)
    }

    fn backend(&self) -> &'static str;
}

/// 进程内存储
#[derive(Default)]
pub struct MemoryRateLimitStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, WalletError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn set(&self, record: RateLimitRecord) -> Result<(), WalletError> {
        self.records.lock().await.insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), WalletError> {
        self.records.lock().await.remove(key);
        Ok(())
    }

    async fn check_and_count(
        &self,
        key: &str,
        now_ms: i64,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, WalletError> {
        let mut records = self.records.lock().await;
        let (write, decision) = evaluate(key, records.get(key), now_ms, policy);
        if let Some(record) = write {
            records.insert(key.to_string(), record);
        }
        Ok(decision)
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<usize, WalletError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now_ms));
        Ok(before - records.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Redis 存储，记录随窗口自动过期
#[derive(Clone)]
pub struct RedisRateLimitStore {
    redis: RedisCtx,
}

impl RedisRateLimitStore {
    pub fn new(redis: RedisCtx) -> Self {
        Self { redis }
    }
}

fn store_error(e: redis::RedisError) -> WalletError {
    WalletError::Store(e.to_string())
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, WalletError> {
        self.redis.get_rate_limit_record(key).await.map_err(store_error)
    }

    async fn set(&self, record: RateLimitRecord) -> Result<(), WalletError> {
        self.redis
            .set_rate_limit_record(&record)
            .await
            .map_err(store_error)
    }

    async fn delete(&self, key: &str) -> Result<(), WalletError> {
        self.redis.delete_key(key).await.map_err(store_error)
    }

    async fn check_and_count(
        &self,
        key: &str,
        now_ms: i64,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, WalletError> {
        self.redis
            .rate_limit_check(key, now_ms, policy)
            .await
            .map_err(store_error)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_memory_store_counts_per_key() {
        let store = MemoryRateLimitStore::new();
        let policy = RateLimitPolicy::new(1000, 2);

        assert!(store.check_and_count("a", 0, &policy).await.unwrap().allowed);
        assert!(store.check_and_count("a", 1, &policy).await.unwrap().allowed);
        assert!(!store.check_and_count("a", 2, &policy).await.unwrap().allowed);
        // 其他 key 独立计数
        assert!(store.check_and_count("b", 2, &policy).await.unwrap().allowed);

        let record = store.get("a").await.unwrap().unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(record.window_start, 0);
    }

    #[tokio::test]
    async fn test_memory_store_purge_and_delete() {
        let store = MemoryRateLimitStore::new();
        let policy = RateLimitPolicy::new(1000, 5);
        store.check_and_count("old", 0, &policy).await.unwrap();
        store.check_and_count("new", 900, &policy).await.unwrap();

        assert_eq!(store.purge_expired(1000).await.unwrap(), 0);
        assert_eq!(store.purge_expired(1001).await.unwrap(), 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);

        store.delete("new").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_concurrent_checks_never_exceed_limit() {
        let store = Arc::new(MemoryRateLimitStore::new());
        let policy = RateLimitPolicy::new(60_000, 10);

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.check_and_count("hot", 100, &policy).await.unwrap()
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
        assert_eq!(store.get("hot").await.unwrap().unwrap().count, 10);
    }

    #[tokio::test]
    async fn test_set_overwrites_record() {
        let store = MemoryRateLimitStore::new();
        store
            .set(RateLimitRecord {
                key: "k".into(),
                count: 7,
                window_start: 0,
                window_ms: 1000,
                max_requests: 7,
            })
            .await
            .unwrap();

        let decision = store
            .check_and_count("k", 10, &RateLimitPolicy::new(1000, 7))
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(store.backend(), "memory");
    }
}
