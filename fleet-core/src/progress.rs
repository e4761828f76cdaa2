//! In-memory progress store.
//!
//! Reference implementation of [`ProgressStore`]; keeps everything for the
//! lifetime of the process. Used by tests and dry runs.

use crate::account::WalletRecord;
use crate::operation::Operation;
use crate::traits::{CompletionRecord, PendingRoute, ProgressStore, RouteFilter};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
struct WalletEntry {
    record: WalletRecord,
    tasks: Vec<TaskEntry>,
}

#[derive(Debug)]
struct TaskEntry {
    operation: Operation,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    // Insertion order is the order routes come back in.
    wallets: RwLock<Vec<WalletEntry>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a wallet, or appends operations it does not have yet.
    pub async fn register_wallet(&self, record: WalletRecord, operations: &[Operation]) {
        let mut wallets = self.wallets.write().await;
        let idx = match wallets
            .iter()
            .position(|w| w.record.address.eq_ignore_ascii_case(&record.address))
        {
            Some(idx) => idx,
            None => {
                wallets.push(WalletEntry {
                    record,
                    tasks: Vec::new(),
                });
                wallets.len() - 1
            }
        };

        let entry = &mut wallets[idx];
        for op in operations {
            if !entry.tasks.iter().any(|t| t.operation == *op) {
                entry.tasks.push(TaskEntry {
                    operation: *op,
                    completed_at: None,
                });
            }
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn uncompleted(&self, filter: &RouteFilter) -> Result<Vec<PendingRoute>> {
        let wallets = self.wallets.read().await;
        let routes = wallets
            .iter()
            .filter(|w| filter.matches(&w.record.address))
            .filter_map(|w| {
                let tasks: Vec<Operation> = w
                    .tasks
                    .iter()
                    .filter(|t| t.completed_at.is_none())
                    .map(|t| t.operation)
                    .collect();
                (!tasks.is_empty()).then(|| PendingRoute {
                    wallet: w.record.clone(),
                    tasks,
                })
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(routes)
    }

    async fn record_complete(&self, address: &str, operation: Operation) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        let task = wallets
            .iter_mut()
            .find(|w| w.record.address.eq_ignore_ascii_case(address))
            .and_then(|w| w.tasks.iter_mut().find(|t| t.operation == operation));

        match task {
            Some(task) if task.completed_at.is_none() => {
                task.completed_at = Some(Utc::now());
            }
            Some(_) => debug!("{} already recorded for {}", operation, address),
            None => debug!("{} was never assigned to {}", operation, address),
        }
        Ok(())
    }

    async fn completions(&self, address: &str) -> Result<Vec<CompletionRecord>> {
        let wallets = self.wallets.read().await;
        let records = wallets
            .iter()
            .filter(|w| w.record.address.eq_ignore_ascii_case(address))
            .flat_map(|w| {
                w.tasks.iter().filter_map(|t| {
                    t.completed_at.map(|completed_at| CompletionRecord {
                        address: w.record.address.clone(),
                        operation: t.operation,
                        completed_at,
                    })
                })
            })
            .collect();
        Ok(records)
    }
}
