//! 钱包 provider 注册表
//!
//! 注册顺序即优先级顺序。检测不缓存，每次迭代都重新询问扩展。

use std::sync::{Arc, RwLock};

use crate::{
    domain::{
        provider::{ProviderDescriptor, WalletKind, WalletProvider},
        wallet_error::WalletError,
    },
    infrastructure::{extension::ExtensionBridge, wallet_adapters::ExtensionAdapter},
};

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn WalletProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按默认优先级注册已知扩展
    ///
    /// 没有桥接的钱包种类被跳过。
    pub fn with_extensions<I>(bridges: I) -> Self
    where
        I: IntoIterator<Item = (WalletKind, Arc<dyn ExtensionBridge>)>,
    {
        let mut bridges: Vec<_> = bridges.into_iter().collect();
        bridges.sort_by_key(|(kind, _)| {
            WalletKind::ALL
                .iter()
                .position(|k| k == kind)
                .unwrap_or(usize::MAX)
        });

        let registry = Self::new();
        for (kind, bridge) in bridges {
            registry.register_provider(Arc::new(ExtensionAdapter::new(kind, bridge)));
        }
        registry
    }

    /// 注册 provider；同一 id 只保留首次注册，返回是否新增
    pub fn register_provider(&self, provider: Arc<dyn WalletProvider>) -> bool {
        let mut providers = match self.providers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if providers.iter().any(|p| p.id() == provider.id()) {
            tracing::debug!(provider_id = provider.id(), "duplicate provider registration ignored");
            return false;
        }

        tracing::debug!(
            provider_id = provider.id(),
            priority = providers.len(),
            "wallet provider registered"
        );
        providers.push(provider);
        true
    }

    /// 当前可用的 provider，惰性检测
    pub fn detect_available(&self) -> AvailableProviders {
        AvailableProviders {
            providers: self.snapshot(),
            cursor: 0,
        }
    }

    pub fn get_provider(&self, id: &str) -> Result<Arc<dyn WalletProvider>, WalletError> {
        self.snapshot()
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| WalletError::NotRegistered(id.to_string()))
    }

    /// 所有已注册 provider 的描述（无论是否可用）
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.snapshot()
            .iter()
            .map(|p| p.descriptor().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn WalletProvider>> {
        match self.providers.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// [`ProviderRegistry::detect_available`] 返回的迭代器
///
/// 每次 `next()` 才调用对应 provider 的 `detect()`；`restart()` 后重新检测。
pub struct AvailableProviders {
    providers: Vec<Arc<dyn WalletProvider>>,
    cursor: usize,
}

impl AvailableProviders {
    pub fn restart(&mut self) {
        self.cursor = 0;
    }
}

impl Iterator for AvailableProviders {
    type Item = Arc<dyn WalletProvider>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(provider) = self.providers.get(self.cursor) {
            self.cursor += 1;
            match provider.detect() {
                Ok(true) => return Some(provider.clone()),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        provider_id = provider.id(),
                        error = %e,
                        "wallet detection failed, treating as unavailable"
                    );
                }
            }
        }
        None
    }
}
