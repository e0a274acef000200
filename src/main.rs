//! Harmonia 准入控制服务主入口

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use harmonia::{api, app_state::AppState, config::Config, infrastructure::logging::init_logging};

/// 内存存储的过期记录清理周期
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量
    dotenvy::dotenv().ok();

    // 2. 加载配置（CONFIG_PATH 指向的 TOML 文件优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;

    // 3. 初始化日志
    init_logging(&config.logging)?;
    config.validate().context("invalid configuration")?;

    tracing::info!(
        network = %config.wallet.network(),
        bind_addr = %config.server.bind_addr,
        "starting Harmonia admission service"
    );

    // 4. 初始化应用状态
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()).await?);

    // 5. 后台清理过期窗口
    let purge_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match purge_state.store.purge_expired(purge_state.clock.now_ms()).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "purged expired admission windows"),
                Err(e) => tracing::warn!(error = %e, "failed to purge admission windows"),
            }
        }
    });

    // 6. 启动服务器
    let app = api::routes(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;

    tracing::info!("Server listening on http://{}", config.server.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
