//! Redis 封装：准入控制窗口记录
//! 使用 MultiplexedConnection，每次调用获取连接

use std::collections::HashMap;

use crate::domain::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitRecord};

/// 固定窗口的原子检查，与 `domain::rate_limit::evaluate` 逐分支对应
const CHECK_AND_COUNT_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local max = tonumber(ARGV[3])
if max <= 0 or window <= 0 then
  return {0, 0, now + window}
end
local rec = redis.call('HMGET', KEYS[1], 'count', 'window_start', 'window_ms', 'max_requests')
local count = tonumber(rec[1])
local start = tonumber(rec[2])
local rec_window = tonumber(rec[3])
local rec_max = tonumber(rec[4])
if count and start and rec_window and rec_max and now <= start + rec_window then
  local reset = start + rec_window
  if count >= rec_max then
    return {0, 0, reset}
  end
  count = redis.call('HINCRBY', KEYS[1], 'count', 1)
  return {1, rec_max - count, reset}
end
redis.call('HSET', KEYS[1], 'count', 1, 'window_start', now, 'window_ms', window, 'max_requests', max)
redis.call('PEXPIRE', KEYS[1], window + 1)
return {1, max - 1, now + window}
"#;

#[derive(Clone)]
pub struct RedisCtx {
    pub client: redis::Client,
}

impl RedisCtx {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> Result<String, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    /// 原子地检查并计数
    pub async fn rate_limit_check(
        &self,
        key: &str,
        now_ms: i64,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let (allowed, remaining, reset_time): (i64, i64, i64) =
            redis::Script::new(CHECK_AND_COUNT_SCRIPT)
                .key(key)
                .arg(now_ms)
                .arg(policy.window_ms)
                .arg(policy.max_requests)
                .invoke_async(&mut conn)
                .await?;

        Ok(RateLimitDecision {
            allowed: allowed == 1,
            remaining: remaining.max(0) as u32,
            reset_time,
        })
    }

    /// 读取窗口记录，字段不完整视为不存在
    pub async fn get_rate_limit_record(
        &self,
        key: &str,
    ) -> Result<Option<RateLimitRecord>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let fields: HashMap<String, String> =
            redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;

        let field = |name: &str| fields.get(name).and_then(|v| v.parse::<i64>().ok());
        let record = match (
            field("count"),
            field("window_start"),
            field("window_ms"),
            field("max_requests"),
        ) {
            (Some(count), Some(window_start), Some(window_ms), Some(max_requests)) => {
                Some(RateLimitRecord {
                    key: key.to_string(),
                    count: count.max(0) as u32,
                    window_start,
                    window_ms: window_ms.max(0) as u64,
                    max_requests: max_requests.max(0) as u32,
                })
            }
            _ => None,
        };
        Ok(record)
    }

    /// 覆盖写入窗口记录，TTL 为窗口长度
    pub async fn set_rate_limit_record(
        &self,
        record: &RateLimitRecord,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&record.key)
            .arg("count")
            .arg(record.count)
            .arg("window_start")
            .arg(record.window_start)
            .arg("window_ms")
            .arg(record.window_ms)
            .arg("max_requests")
            .arg(record.max_requests)
            .ignore()
            .cmd("PEXPIRE")
            .arg(&record.key)
            .arg(record.window_ms + 1)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn delete_key(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
