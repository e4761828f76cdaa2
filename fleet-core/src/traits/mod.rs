use crate::account::{Account, WalletRecord};
use crate::operation::Operation;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Result of attempting one module against an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Did not complete; retried on a later run.
    Absent,
}

impl Outcome {
    pub fn is_completed(self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

impl<T> From<Option<T>> for Outcome {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(_) => Outcome::Completed,
            None => Outcome::Absent,
        }
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        if value {
            Outcome::Completed
        } else {
            Outcome::Absent
        }
    }
}

#[async_trait]
pub trait ModuleHandler: Send + Sync {
    /// Attempts the module once from the sequencer's point of view.
    /// Any retrying happens inside, through a `RetryPolicy`.
    async fn attempt(&self, account: &Account) -> Outcome;
}

/// A wallet together with the operations it still has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRoute {
    pub wallet: WalletRecord,
    pub tasks: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub address: String,
    pub operation: Operation,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub addresses: Option<HashSet<String>>,
    pub limit: Option<usize>,
}

impl RouteFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses = Some(
            addresses
                .into_iter()
                .map(|a| a.into().to_lowercase())
                .collect(),
        );
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, address: &str) -> bool {
        self.addresses
            .as_ref()
            .map_or(true, |set| set.contains(&address.to_lowercase()))
    }
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Wallets that still have pending operations, pending lists in order.
    async fn uncompleted(&self, filter: &RouteFilter) -> Result<Vec<PendingRoute>>;

    /// Idempotent: recording the same pair twice changes nothing.
    async fn record_complete(&self, address: &str, operation: Operation) -> Result<()>;

    async fn completions(&self, address: &str) -> Result<Vec<CompletionRecord>>;
}

#[async_trait]
pub trait FleetNotifier: Send + Sync {
    /// Called once per fully processed account.
    async fn notify(&self, ordinal: u64, address: &str) -> Result<()>;
}
