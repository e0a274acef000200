//! 固定窗口速率限制模型
//!
//! [`evaluate`] 是唯一的算法实现：内存存储在锁内调用它，
//! Redis 存储的 Lua 脚本是它的逐行对应版本。

use serde::{Deserialize, Serialize};

/// 单个受保护入口的窗口配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    pub const fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
        }
    }

    /// 通用 API：60 秒 100 次
    pub const fn general_api() -> Self {
        Self::new(60_000, 100)
    }

    /// 认证：5 分钟 5 次
    pub const fn authentication() -> Self {
        Self::new(300_000, 5)
    }

    /// 提案提交：60 秒 10 次
    pub const fn proposal_submission() -> Self {
        Self::new(60_000, 10)
    }
}

/// 每个 key 一条记录，首次检查时创建，窗口过期后被新窗口取代
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub key: String,
    pub count: u32,
    pub window_start: i64,
    pub window_ms: u64,
    pub max_requests: u32,
}

impl RateLimitRecord {
    pub fn reset_time(&self) -> i64 {
        self.window_start + self.window_ms as i64
    }

    /// 越过 `window_start + window_ms` 之后才过期，边界时刻仍属当前窗口
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.reset_time()
    }
}

/// check() 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// 窗口重置时间（毫秒时间戳）
    pub reset_time: i64,
}

impl RateLimitDecision {
    /// 距离窗口重置的秒数（向上取整，至少 1），用于 Retry-After
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = (self.reset_time - now_ms).max(0) as u64;
        wait_ms.div_ceil(1000).max(1)
    }
}

/// 固定窗口算法
///
/// 返回需要写回的记录（`None` 表示无需写入）以及本次判定。
/// 拒绝时不递增计数。`max_requests` 或 `window_ms` 为 0 时一律拒绝。
pub fn evaluate(
    key: &str,
    existing: Option<&RateLimitRecord>,
    now_ms: i64,
    policy: &RateLimitPolicy,
) -> (Option<RateLimitRecord>, RateLimitDecision) {
    if policy.max_requests == 0 || policy.window_ms == 0 {
        return (
            None,
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: now_ms + policy.window_ms as i64,
            },
        );
    }

    match existing {
        Some(record) if !record.is_expired(now_ms) => {
            if record.count >= record.max_requests {
                return (
                    None,
                    RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_time: record.reset_time(),
                    },
                );
            }

            let updated = RateLimitRecord {
                count: record.count + 1,
                ..record.clone()
            };
            let decision = RateLimitDecision {
                allowed: true,
                remaining: updated.max_requests - updated.count,
                reset_time: updated.reset_time(),
            };
            (Some(updated), decision)
        }
        _ => {
            let fresh = RateLimitRecord {
                key: key.to_string(),
                count: 1,
                window_start: now_ms,
                window_ms: policy.window_ms,
                max_requests: policy.max_requests,
            };
            let decision = RateLimitDecision {
                allowed: true,
                remaining: policy.max_requests - 1,
                reset_time: fresh.reset_time(),
            };
            (Some(fresh), decision)
        }
    }
}
