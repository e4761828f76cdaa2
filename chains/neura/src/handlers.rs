//! Config-driven HTTP module handlers.
//!
//! Each configured endpoint becomes one [`HttpModule`]. An attempt is a single
//! request sent through the account's current proxy, wrapped in the fleet's
//! retry policy so transport failures rotate the proxy before the next try.

use crate::config::EndpointConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fleet_core::{
    Account, CallError, ModuleHandler, ModuleRegistry, Operation, Outcome, ProxyConfig,
    RetryPolicy,
};
use reqwest::{Client, Method};
use std::sync::Arc;
use tracing::debug;

const BODY_PREVIEW_LEN: usize = 200;

pub struct HttpModule {
    operation: Operation,
    method: Method,
    endpoint: EndpointConfig,
    policy: RetryPolicy,
}

impl HttpModule {
    pub fn new(operation: Operation, endpoint: EndpointConfig, policy: RetryPolicy) -> Result<Self> {
        let method = endpoint
            .method()
            .with_context(|| format!("Invalid endpoint for {}", operation))?;
        Ok(Self {
            operation,
            method,
            endpoint,
            policy,
        })
    }

    fn client_for(&self, proxy: Option<&ProxyConfig>) -> Result<Client, CallError> {
        let mut builder = Client::builder().timeout(self.policy.attempt_timeout);
        // Direct accounts stay direct, even with HTTP_PROXY in the environment.
        if proxy.is_none() {
            builder = builder.no_proxy();
        }
        if let Some(proxy_conf) = proxy {
            let mut proxy = reqwest::Proxy::all(&proxy_conf.url)
                .map_err(|e| CallError::transport(format!("proxy {}: {}", proxy_conf.url, e)))?;
            if let (Some(u), Some(p)) = (&proxy_conf.username, &proxy_conf.password) {
                proxy = proxy.basic_auth(u, p);
            }
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| CallError::transport(format!("http client: {}", e)))
    }

    async fn call_once(&self, account: &Account) -> Result<(), CallError> {
        let proxy = account.proxy().current().await;
        let client = self.client_for(proxy.as_ref())?;
        let url = self.endpoint.url_for(account.address());

        let mut request = client.request(self.method.clone(), url.as_str());
        if self.method != Method::GET {
            request = request.json(&serde_json::json!({ "address": account.address() }));
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
            return Err(CallError::rejected(format!("{} {}: {}", status, url, preview)));
        }

        debug!("[{}] {} -> {}", account.address(), self.operation, status);
        Ok(())
    }
}

#[async_trait]
impl ModuleHandler for HttpModule {
    async fn attempt(&self, account: &Account) -> Outcome {
        let name = format!("{} {}", account.address(), self.operation);
        self.policy
            .run(&name, Some(account.proxy()), || self.call_once(account))
            .await
            .into()
    }
}

/// Maps a reqwest failure to the retry policy's failure classes.
pub fn classify(err: reqwest::Error) -> CallError {
    if err.is_connect() || err.is_timeout() {
        CallError::transport(err.to_string())
    } else if err.is_status() || err.is_decode() {
        CallError::rejected(err.to_string())
    } else {
        // Untyped: fall back to the message heuristic
        CallError::from_message(err.to_string())
    }
}

/// One handler per configured endpoint.
pub fn build_registry(
    endpoints: Vec<(Operation, &EndpointConfig)>,
    policy: &RetryPolicy,
) -> Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    for (operation, endpoint) in endpoints {
        let module = HttpModule::new(operation, endpoint.clone(), policy.clone())?;
        registry.insert(operation, Arc::new(module));
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{FailureKind, ProxyBinding, SecretKey};
    use std::time::Duration;

    fn endpoint(url: &str) -> EndpointConfig {
        EndpointConfig {
            method: "post".to_string(),
            url: url.to_string(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(1, Duration::from_millis(1), 1.0)
            .with_attempt_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        // Port 9 on localhost: nothing listens, connection is refused
        let module = HttpModule::new(
            Operation::Faucet,
            endpoint("http://127.0.0.1:9/faucet/{address}"),
            fast_policy(),
        )
        .unwrap();
        let account = Account::new(
            "0xabc",
            SecretKey::new("0x01"),
            ProxyBinding::direct(),
            vec![Operation::Faucet],
        );

        let err = module.call_once(&account).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Transport);
        assert_eq!(module.attempt(&account).await, Outcome::Absent);
    }

    #[test]
    fn test_invalid_method_rejected() {
        let bad = EndpointConfig {
            method: "SEND IT".to_string(),
            url: "https://example.org".to_string(),
        };
        assert!(HttpModule::new(Operation::Bridge, bad, fast_policy()).is_err());
    }

    #[test]
    fn test_registry_covers_configured_endpoints() {
        let faucet = endpoint("https://example.org/faucet");
        let swaps = endpoint("https://example.org/swap");
        let registry = build_registry(
            vec![(Operation::Faucet, &faucet), (Operation::CycleSwaps, &swaps)],
            &fast_policy(),
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(Operation::CycleSwaps));
        assert!(!registry.contains(Operation::Bridge));
    }
}
