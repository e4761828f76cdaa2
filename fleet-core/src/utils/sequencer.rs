use crate::account::Account;
use crate::config::Pause;
use crate::metrics::FleetMetrics;
use crate::operation::Operation;
use crate::registry::ModuleRegistry;
use crate::traits::{FleetNotifier, ProgressStore};
use crate::utils::logger::MODULE_RESULT_TARGET;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What happened to one account during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub completed: Vec<Operation>,
    pub failed: Vec<Operation>,
    /// Shutdown interrupted the account before its last operation resolved.
    pub cancelled: bool,
}

impl SequenceReport {
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Default::default()
        }
    }
}

/// Sleeps for `duration` unless `token` fires first. Returns `false` if cancelled.
pub(crate) async fn cancellable_sleep(token: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        return !token.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Drives one account through its operations, strictly one after another.
#[derive(Clone)]
pub struct AccountSequencer {
    registry: Arc<ModuleRegistry>,
    store: Arc<dyn ProgressStore>,
    module_pause: Pause,
    metrics: Arc<FleetMetrics>,
    notifier: Option<Arc<dyn FleetNotifier>>,
    token: CancellationToken,
}

impl AccountSequencer {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        store: Arc<dyn ProgressStore>,
        module_pause: Pause,
        metrics: Arc<FleetMetrics>,
    ) -> Self {
        Self {
            registry,
            store,
            module_pause,
            metrics,
            notifier: None,
            token: CancellationToken::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Option<Arc<dyn FleetNotifier>>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub async fn run(&self, account: Account) -> SequenceReport {
        let mut report = SequenceReport::default();
        let operations = account.operations().to_vec();
        let total = operations.len();

        for (idx, op) in operations.into_iter().enumerate() {
            if self.token.is_cancelled() {
                report.cancelled = true;
                return report;
            }

            match self.registry.get(op) {
                Some(handler) => {
                    let started = Instant::now();
                    // Dropping the handler future abandons the call; nothing is recorded.
                    let outcome = tokio::select! {
                        biased;
                        _ = self.token.cancelled() => {
                            warn!("[{}] {} abandoned by shutdown", account.address(), op);
                            report.cancelled = true;
                            return report;
                        }
                        outcome = handler.attempt(&account) => outcome,
                    };
                    let elapsed = started.elapsed();
                    self.metrics.record_module(elapsed, outcome.is_completed());

                    if outcome.is_completed() {
                        info!(
                            target: MODULE_RESULT_TARGET,
                            "[{}] {} SUCCESS ({:.1}s)",
                            account.address(),
                            op,
                            elapsed.as_secs_f64()
                        );
                        if let Err(e) = self.store.record_complete(account.address(), op).await {
                            error!(
                                "[{}] {} completed but could not be recorded: {:#}",
                                account.address(),
                                op,
                                e
                            );
                        }
                        report.completed.push(op);
                    } else {
                        info!(
                            target: MODULE_RESULT_TARGET,
                            "[{}] {} FAILED ({:.1}s)",
                            account.address(),
                            op,
                            elapsed.as_secs_f64()
                        );
                        report.failed.push(op);
                    }
                }
                None => {
                    // The runner checks coverage before launch.
                    error!("[{}] No handler registered for {}", account.address(), op);
                    report.failed.push(op);
                }
            }

            if idx + 1 < total {
                let pause = self.module_pause.sample();
                if !pause.is_zero() {
                    info!("Sleeping {} seconds before next module...", pause.as_secs());
                }
                if !cancellable_sleep(&self.token, pause).await {
                    report.cancelled = true;
                    return report;
                }
            }
        }

        let ordinal = self.metrics.record_account_processed();
        info!(
            "[{}] Wallet processed (#{}): {} completed, {} failed",
            account.address(),
            ordinal,
            report.completed.len(),
            report.failed.len()
        );

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(ordinal, account.address()).await {
                warn!("Notification for wallet #{} failed: {:#}", ordinal, e);
            }
        }

        report
    }
}
