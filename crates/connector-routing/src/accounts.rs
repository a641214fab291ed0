use connector_core::config::AccountConfig;
use connector_core::AccountInfo;
use dashmap::DashMap;

use crate::traits::AccountRegistry;

#[derive(Debug, Clone)]
struct AccountEntry {
    info: AccountInfo,
    connected: bool,
}

/// In-memory account registry.
///
/// Thread-safe: uses `DashMap` so plugin connectivity can be flipped while
/// quotes are being served.
pub struct InMemoryAccounts {
    accounts: DashMap<String, AccountEntry>,
}

impl InMemoryAccounts {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Build a registry from the `[[accounts]]` config section.
    pub fn from_config(accounts: &[AccountConfig]) -> Self {
        let registry = Self::new();
        for account in accounts {
            registry.add_account(
                account.id.clone(),
                AccountInfo::new(account.asset_code.clone(), account.asset_scale),
                account.connected,
            );
        }
        registry
    }

    /// Register or replace an account.
    pub fn add_account(&self, id: impl Into<String>, info: AccountInfo, connected: bool) {
        let id = id.into();
        tracing::info!(account = %id, asset_code = %info.asset_code, asset_scale = info.asset_scale, "account registered");
        self.accounts.insert(id, AccountEntry { info, connected });
    }

    pub fn remove_account(&self, id: &str) -> Option<AccountInfo> {
        self.accounts.remove(id).map(|(_k, entry)| entry.info)
    }

    /// Update the plugin connectivity of an account. Returns `false` if the
    /// account is unknown.
    pub fn set_connected(&self, id: &str, connected: bool) -> bool {
        if let Some(mut entry) = self.accounts.get_mut(id) {
            entry.connected = connected;
            tracing::debug!(account = %id, connected, "plugin connectivity changed");
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for InMemoryAccounts {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRegistry for InMemoryAccounts {
    fn asset_code(&self, account: &str) -> Option<String> {
        self.accounts
            .get(account)
            .map(|entry| entry.info.asset_code.clone())
    }

    fn info(&self, account: &str) -> Option<AccountInfo> {
        self.accounts.get(account).map(|entry| entry.info.clone())
    }

    fn is_connected(&self, account: &str) -> bool {
        self.accounts
            .get(account)
            .map_or(false, |entry| entry.connected)
    }
}
