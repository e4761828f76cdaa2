use crate::config::ProxyConfig;
use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct ProxyManager;

impl ProxyManager {
    /// Loads proxies from a text file, one per line.
    /// Accepts `ip:port`, `ip:port:user:pass` and `[scheme://][user:pass@]host:port`.
    pub fn load_proxies(path: impl AsRef<Path>) -> Result<Vec<ProxyConfig>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found. Running without proxies.", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut proxies = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Self::parse_line(line) {
                Some(proxy) => proxies.push(proxy),
                None => warn!("Skipping invalid proxy line: {}", line),
            }
        }

        info!("Loaded {} proxies from {}", proxies.len(), path.display());
        Ok(proxies)
    }

    pub fn parse_line(line: &str) -> Option<ProxyConfig> {
        let line = line.trim();
        let (scheme, rest) = match line.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("http", line),
        };

        // user:pass@host:port
        if let Some((auth, host)) = rest.rsplit_once('@') {
            let (user, pass) = auth.split_once(':')?;
            let (ip, port) = host.split_once(':')?;
            if ip.is_empty() || port.parse::<u16>().is_err() {
                return None;
            }
            return Some(ProxyConfig {
                url: format!("{}://{}:{}", scheme, ip, port),
                username: Some(user.to_string()),
                password: Some(pass.to_string()),
            });
        }

        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() < 2 || parts[0].is_empty() || parts[1].parse::<u16>().is_err() {
            return None;
        }
        let url = format!("{}://{}:{}", scheme, parts[0], parts[1]);

        // ip:port:user:pass -> 4 parts
        let (username, password) = if parts.len() >= 4 {
            (Some(parts[2].to_string()), Some(parts[3].to_string()))
        } else {
            (None, None)
        };

        Some(ProxyConfig {
            url,
            username,
            password,
        })
    }

    /// Inverse of [`parse_line`](Self::parse_line): `scheme://[user:pass@]host:port`.
    pub fn format_line(proxy: &ProxyConfig) -> String {
        match (&proxy.username, &proxy.password) {
            (Some(user), Some(pass)) => match proxy.url.split_once("://") {
                Some((scheme, host)) => format!("{}://{}:{}@{}", scheme, user, pass, host),
                None => format!("{}:{}@{}", user, pass, proxy.url),
            },
            _ => proxy.url.clone(),
        }
    }
}

/// Proxies available for rotation.
#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<ProxyConfig>,
}

impl ProxyPool {
    pub fn new(proxies: Vec<ProxyConfig>) -> Self {
        Self { proxies }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Random pick, avoiding `current` when the pool has anything else.
    pub fn pick(&self, current: Option<&ProxyConfig>) -> Option<ProxyConfig> {
        let mut rng = rand::thread_rng();
        let candidates: Vec<&ProxyConfig> = self
            .proxies
            .iter()
            .filter(|p| Some(*p) != current)
            .collect();
        match candidates.choose(&mut rng) {
            Some(proxy) => Some((*proxy).clone()),
            None => self.proxies.choose(&mut rng).cloned(),
        }
    }
}

/// The account's replaceable network egress.
///
/// The proxy value is swapped whole under the write lock, so a handler reading
/// it mid-flight sees either the old or the new proxy, never a mix.
#[derive(Debug, Clone, Default)]
pub struct ProxyBinding {
    current: Arc<RwLock<Option<ProxyConfig>>>,
    pool: Option<Arc<ProxyPool>>,
    rotations: Arc<AtomicU64>,
}

impl ProxyBinding {
    pub fn new(initial: Option<ProxyConfig>, pool: Option<Arc<ProxyPool>>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
            pool,
            rotations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Binding with no proxy and nothing to rotate to.
    pub fn direct() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<ProxyConfig> {
        self.current.read().await.clone()
    }

    /// Replaces the proxy with another one from the pool.
    /// Returns `false` when there is no pool to draw from.
    pub async fn rotate(&self) -> bool {
        let Some(pool) = self.pool.as_ref().filter(|p| !p.is_empty()) else {
            debug!("Proxy rotation requested but no pool is configured");
            return false;
        };

        let mut current = self.current.write().await;
        let next = pool.pick(current.as_ref());
        if let Some(ref proxy) = next {
            debug!("Rotating proxy to {}", proxy.url);
        }
        *current = next;
        self.rotations.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Number of completed rotations on this binding.
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::SeqCst)
    }
}
