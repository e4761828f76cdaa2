//! Builds the progress database from the key and proxy files.

use crate::config::NeuraConfig;
use anyhow::{anyhow, Result};
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::to_checksum;
use fleet_core::{
    ProxyManager, SecretKey, SecurityUtils, SqliteProgressStore, WalletManager, WalletRecord,
};
use rand::seq::SliceRandom;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateSummary {
    pub wallets: usize,
    pub proxies: usize,
}

/// Checksummed address of a raw private key. The key never appears in the error.
pub fn derive_address(key: &SecretKey, position: usize) -> Result<String> {
    let wallet = key
        .expose()
        .parse::<LocalWallet>()
        .map_err(|_| anyhow!("Private key #{} is not a valid secp256k1 key", position + 1))?;
    Ok(to_checksum(&wallet.address(), None))
}

/// Seals every private key and registers it with the configured modules.
/// Proxies are handed out round-robin; existing wallets keep their history.
pub async fn generate_database(config: &NeuraConfig, password: &str) -> Result<GenerateSummary> {
    let operations = config.operations()?;
    let mut keys = WalletManager::load_keys(&config.wallets_file)?;
    if config.fleet.shuffle_wallets {
        keys.shuffle(&mut rand::thread_rng());
    }
    let proxies = ProxyManager::load_proxies(&config.proxies_file)?;
    let store = SqliteProgressStore::connect(&config.database_path).await?;

    for (i, key) in keys.iter().enumerate() {
        let address = derive_address(key, i)?;
        let sealed = SecurityUtils::seal(key.expose(), password)?;
        let proxy = (!proxies.is_empty())
            .then(|| ProxyManager::format_line(&proxies[i % proxies.len()]));

        store
            .register_wallet(
                &WalletRecord {
                    address: address.clone(),
                    sealed,
                    proxy,
                },
                &operations,
            )
            .await?;
        info!("Wallet {:03} registered: {}", i + 1, address);
    }

    info!(
        "Database {} ready: {} wallets, {} modules each",
        config.database_path,
        keys.len(),
        operations.len()
    );
    Ok(GenerateSummary {
        wallets: keys.len(),
        proxies: proxies.len(),
    })
}
