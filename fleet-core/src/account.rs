//! Account identity, secret material and the persisted wallet record.

use crate::error::SecurityError;
use crate::operation::Operation;
use crate::security::{SealedSecret, SecurityUtils};
use crate::utils::proxy_manager::{ProxyBinding, ProxyManager, ProxyPool};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Decrypted private key. Zeroed on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***REDACTED***")
    }
}

/// What the progress store keeps about a wallet: never the clear key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub address: String,
    pub sealed: SealedSecret,
    /// Proxy line as it appeared in the proxies file.
    pub proxy: Option<String>,
}

/// One identity driven through its pending operations during a single run.
#[derive(Debug)]
pub struct Account {
    address: String,
    secret: SecretKey,
    proxy: ProxyBinding,
    operations: Vec<Operation>,
}

impl Account {
    pub fn new(
        address: impl Into<String>,
        secret: SecretKey,
        proxy: ProxyBinding,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            address: address.into(),
            secret,
            proxy,
            operations,
        }
    }

    /// Decrypts a stored wallet into a live account.
    pub fn unseal(
        record: &WalletRecord,
        operations: Vec<Operation>,
        password: &str,
        pool: Option<Arc<ProxyPool>>,
    ) -> Result<Self, SecurityError> {
        let key = SecurityUtils::unseal(&record.sealed, password).map_err(|_| {
            SecurityError::UnsealFailed {
                address: record.address.clone(),
            }
        })?;
        let initial = record.proxy.as_deref().and_then(ProxyManager::parse_line);

        Ok(Self::new(
            record.address.clone(),
            SecretKey::new(key),
            ProxyBinding::new(initial, pool),
            operations,
        ))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn proxy(&self) -> &ProxyBinding {
        &self.proxy
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}
