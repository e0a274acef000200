//! 准入控制集成测试

mod common;

use std::sync::Arc;

use harmonia::{
    domain::{rate_limit::RateLimitPolicy, wallet_error::WalletError},
    infrastructure::{
        cache::RedisCtx,
        clock::{Clock, ManualClock},
        rate_limit_store::{MemoryRateLimitStore, RateLimitStore, RedisRateLimitStore},
    },
    service::{AdmissionGuard, AdmissionGuards, GuardSurface},
};
use proptest::prelude::*;

fn memory_guard(policy: RateLimitPolicy, start_ms: i64) -> (AdmissionGuard, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms));
    let guard = AdmissionGuard::new(
        GuardSurface::Api,
        policy,
        Arc::new(MemoryRateLimitStore::new()),
        clock.clone(),
    );
    (guard, clock)
}

#[tokio::test]
async fn test_fixed_window_scenario() {
    let (guard, clock) = memory_guard(RateLimitPolicy::new(1000, 2), 10_000);

    let first = guard.check("k").await.unwrap();
    assert!(first.allowed);
    assert_eq!(first.remaining, 1);
    assert_eq!(first.reset_time, 11_000);

    clock.advance(400);
    let second = guard.check("k").await.unwrap();
    assert!(second.allowed);
    assert_eq!(second.remaining, 0);
    assert_eq!(second.reset_time, 11_000);

    clock.advance(100);
    let third = guard.check("k").await.unwrap();
    assert!(!third.allowed);
    assert_eq!(third.reset_time, 11_000);

    clock.set(11_001);
    let fourth = guard.check("k").await.unwrap();
    assert!(fourth.allowed);
    assert_eq!(fourth.remaining, 1);
    assert_eq!(fourth.reset_time, 12_001);
}

#[tokio::test]
async fn test_check_at_reset_time_stays_in_window() {
    let (guard, clock) = memory_guard(RateLimitPolicy::new(1000, 2), 0);

    assert!(guard.check("k").await.unwrap().allowed);
    assert!(guard.check("k").await.unwrap().allowed);

    // [0, 1000] 是同一个窗口
    clock.set(1000);
    let at_boundary = guard.check("k").await.unwrap();
    assert!(!at_boundary.allowed);
    assert_eq!(at_boundary.remaining, 0);
    assert_eq!(at_boundary.reset_time, 1000);

    clock.set(1001);
    let next = guard.check("k").await.unwrap();
    assert!(next.allowed);
    assert_eq!(next.remaining, 1);
    assert_eq!(next.reset_time, 2001);
}

#[tokio::test]
async fn test_rejections_do_not_extend_window() {
    let (guard, clock) = memory_guard(RateLimitPolicy::new(1000, 1), 0);

    assert!(guard.check("k").await.unwrap().allowed);
    for _ in 0..5 {
        clock.advance(100);
        let decision = guard.check("k").await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reset_time, 1000);
    }

    clock.set(1000);
    assert!(!guard.check("k").await.unwrap().allowed);
    clock.set(1001);
    assert!(guard.check("k").await.unwrap().allowed);
}

#[tokio::test]
async fn test_zero_max_rejects_without_recording() {
    let store = Arc::new(MemoryRateLimitStore::new());
    let guard = AdmissionGuard::new(
        GuardSurface::Proposal,
        RateLimitPolicy::new(60_000, 0),
        store.clone(),
        Arc::new(ManualClock::new(0)),
    );

    let decision = guard.check("k").await.unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_reset_starts_fresh_window() {
    let (guard, clock) = memory_guard(RateLimitPolicy::new(60_000, 2), 0);

    guard.admit("wallet:alice").await.unwrap();
    guard.admit("wallet:alice").await.unwrap();
    assert!(matches!(
        guard.admit("wallet:alice").await,
        Err(WalletError::RateLimited { reset_time: 60_000 })
    ));

    clock.advance(5_000);
    guard.reset("wallet:alice").await.unwrap();
    let decision = guard.admit("wallet:alice").await.unwrap();
    assert_eq!(decision.remaining, 1);
    assert_eq!(decision.reset_time, 65_000);

    // 重置不存在的 key 不报错
    guard.reset("wallet:nobody").await.unwrap();
}

#[tokio::test]
async fn test_named_guards_use_their_own_policies() {
    let store: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimitStore::new());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
    let settings = common::uniform_limits(60_000, 3);
    let guards = AdmissionGuards::from_settings(&settings, store, clock);

    for surface in GuardSurface::ALL {
        let guard = guards.get(surface);
        assert_eq!(guard.surface(), surface);
        assert_eq!(guard.policy().max_requests, 3);
    }

    assert!(guards.by_name("Proposal").is_some());
    assert!(guards.by_name("votes").is_none());
}

#[tokio::test]
async fn test_keys_are_counted_independently() {
    let (guard, _clock) = memory_guard(RateLimitPolicy::new(1000, 1), 0);

    assert!(guard.check("ip:10.0.0.1").await.unwrap().allowed);
    assert!(guard.check("ip:10.0.0.2").await.unwrap().allowed);
    assert!(!guard.check("ip:10.0.0.1").await.unwrap().allowed);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_never_admits_more_than_max_per_window(
        window_ms in 1u64..10_000,
        max in 1u32..20,
        steps in prop::collection::vec(0u64..500, 1..60),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (guard, clock) = memory_guard(RateLimitPolicy::new(window_ms, max), 0);
            let mut window_end = i64::MIN;
            let mut admitted_in_window = 0u32;

            for step in steps {
                clock.advance(step as i64);
                let now = clock.now_ms();
                let decision = guard.check("k").await.unwrap();

                if now > window_end {
                    // 新窗口的第一次检查总是放行
                    prop_assert!(decision.allowed);
                    prop_assert_eq!(decision.remaining, max - 1);
                    prop_assert_eq!(decision.reset_time, now + window_ms as i64);
                    window_end = decision.reset_time;
                    admitted_in_window = 1;
                    continue;
                }

                prop_assert_eq!(decision.reset_time, window_end);
                if decision.allowed {
                    admitted_in_window += 1;
                    prop_assert_eq!(decision.remaining, max - admitted_in_window);
                } else {
                    prop_assert_eq!(admitted_in_window, max);
                }
                prop_assert!(admitted_in_window <= max);
            }
            Ok(())
        })?;
    }
}

#[tokio::test]
#[ignore] // 需要Redis运行
async fn test_redis_store_fixed_window() {
    let redis = RedisCtx::new(&common::test_redis_url()).unwrap();
    let store = Arc::new(RedisRateLimitStore::new(redis));
    let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp_millis()));
    let guard = AdmissionGuard::new(
        GuardSurface::Auth,
        RateLimitPolicy::new(1000, 2),
        store.clone(),
        clock.clone(),
    );
    let key = format!("it-{}", clock.now_ms());

    let results = [
        guard.check(&key).await.unwrap(),
        guard.check(&key).await.unwrap(),
        guard.check(&key).await.unwrap(),
    ];
    let pairs: Vec<_> = results.iter().map(|d| (d.allowed, d.remaining)).collect();
    assert_eq!(pairs, vec![(true, 1), (true, 0), (false, 0)]);

    let record = store
        .get(&format!("rate_limit:auth:{}", key))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.count, 2);

    clock.advance(1000);
    assert!(!guard.check(&key).await.unwrap().allowed);

    clock.advance(1);
    let after = guard.check(&key).await.unwrap();
    assert!(after.allowed);
    assert_eq!(after.remaining, 1);

    guard.reset(&key).await.unwrap();
    assert!(store
        .get(&format!("rate_limit:auth:{}", key))
        .await
        .unwrap()
        .is_none());
}
