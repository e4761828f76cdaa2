use crate::account::{Account, SecretKey};
use crate::error::{ConfigError, SecurityError};
use crate::traits::PendingRoute;
use crate::utils::proxy_manager::ProxyPool;
use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct WalletManager;

impl WalletManager {
    /// Reads raw private keys, one per line. Blank lines and `#` comments are skipped.
    pub fn load_keys(path: impl AsRef<Path>) -> Result<Vec<SecretKey>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            msg: e.to_string(),
        })?;

        let keys: Vec<SecretKey> = content
            .lines()
            .map(|line| line.trim_start_matches('\u{feff}').trim())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(SecretKey::new)
            .collect();

        info!("Loaded {} private keys from {}", keys.len(), path.display());
        Ok(keys)
    }

    /// Decrypts every pending route into an account for this run.
    /// The first wallet that fails to open aborts the whole batch.
    pub fn unseal_routes(
        routes: Vec<PendingRoute>,
        password: &str,
        pool: Option<Arc<ProxyPool>>,
    ) -> Result<Vec<Account>, SecurityError> {
        routes
            .into_iter()
            .map(|route| Account::unseal(&route.wallet, route.tasks, password, pool.clone()))
            .collect()
    }
}
