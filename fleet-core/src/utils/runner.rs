use crate::account::Account;
use crate::config::FleetConfig;
use crate::metrics::FleetMetrics;
use crate::registry::ModuleRegistry;
use crate::traits::{FleetNotifier, ProgressStore};
use crate::utils::sequencer::{cancellable_sleep, AccountSequencer, SequenceReport};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

/// Totals for one fleet run.
#[derive(Debug, Clone, Default)]
pub struct FleetReport {
    pub launched: usize,
    /// Accounts that went through their whole operation list.
    pub processed: usize,
    pub modules_completed: usize,
    pub modules_failed: usize,
    pub panicked: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl FleetReport {
    pub fn nothing_to_do(&self) -> bool {
        self.launched == 0 && !self.cancelled
    }
}

/// Counts an account as in flight until dropped, even if its task panics.
struct InFlight(Arc<FleetMetrics>);

impl InFlight {
    fn enter(metrics: Arc<FleetMetrics>) -> Self {
        metrics.enter_account();
        Self(metrics)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.leave_account();
    }
}

/// Cancels `token` on Ctrl+C.
pub fn spawn_shutdown_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Received Ctrl+C. Initiating graceful shutdown...");
                token.cancel();
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    })
}

/// Runs many accounts with bounded parallelism and a staggered start.
pub struct FleetRunner {
    registry: Arc<ModuleRegistry>,
    store: Arc<dyn ProgressStore>,
    config: FleetConfig,
    notifier: Option<Arc<dyn FleetNotifier>>,
    metrics: Arc<FleetMetrics>,
    token: CancellationToken,
}

impl FleetRunner {
    pub fn new(registry: ModuleRegistry, store: Arc<dyn ProgressStore>, config: FleetConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            config,
            notifier: None,
            metrics: Arc::new(FleetMetrics::default()),
            token: CancellationToken::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn FleetNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<FleetMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn metrics(&self) -> Arc<FleetMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs every account to completion. Never fails fast: only an invalid
    /// config or an operation without a handler is an error, and both are
    /// detected before the first launch.
    pub async fn run(&self, accounts: Vec<Account>) -> Result<FleetReport> {
        self.config.validate()?;
        self.registry.ensure_covers(&accounts)?;

        if accounts.is_empty() {
            info!("All tasks are completed, nothing to do.");
            return Ok(FleetReport::default());
        }

        let start_time = tokio::time::Instant::now();
        let total = accounts.len();
        let gate = Arc::new(Semaphore::new(self.config.max_parallel_accounts));
        let sequencer = AccountSequencer::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            self.config.pause_between_modules,
            Arc::clone(&self.metrics),
        )
        .with_notifier(self.notifier.clone())
        .with_cancellation(self.token.clone());

        info!(
            "Starting {} wallets ({} in parallel)...",
            total, self.config.max_parallel_accounts
        );

        let mut set = JoinSet::new();
        let mut report = FleetReport::default();

        for (i, account) in accounts.into_iter().enumerate() {
            if i > 0 {
                let pause = self.config.pause_between_wallets.sample();
                if !pause.is_zero() {
                    info!("Sleeping {} seconds before next wallet...", pause.as_secs());
                }
                if !cancellable_sleep(&self.token, pause).await {
                    warn!("Shutdown requested, {} wallets not launched", total - i);
                    break;
                }
            } else if self.token.is_cancelled() {
                break;
            }

            let id = i + 1;
            let span = tracing::info_span!("wallet", wallet_id = format!("{:03}", id));
            let gate = Arc::clone(&gate);
            let sequencer = sequencer.clone();
            let metrics = Arc::clone(&self.metrics);
            let token = self.token.clone();

            self.metrics.record_launch();
            report.launched += 1;

            set.spawn(
                async move {
                    // Held for the whole sequence.
                    let _permit = tokio::select! {
                        biased;
                        _ = token.cancelled() => return SequenceReport::cancelled(),
                        permit = gate.acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => return SequenceReport::cancelled(),
                        },
                    };

                    let _in_flight = InFlight::enter(metrics);
                    sequencer.run(account).await
                }
                .instrument(span),
            );
        }

        while let Some(res) = set.join_next().await {
            match res {
                Ok(seq) => {
                    report.modules_completed += seq.completed.len();
                    report.modules_failed += seq.failed.len();
                    if seq.cancelled {
                        report.cancelled = true;
                    } else {
                        report.processed += 1;
                    }
                }
                Err(e) => {
                    error!("A wallet task panicked or failed to join: {:?}", e);
                    report.panicked += 1;
                }
            }
        }

        report.cancelled |= self.token.is_cancelled();
        report.elapsed = start_time.elapsed();

        if report.cancelled {
            info!("🛑 Shutdown Complete.");
        }
        let modules_total = report.modules_completed + report.modules_failed;
        let rate = if modules_total > 0 {
            (report.modules_completed as f64 / modules_total as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "Total Time: {:.1}s | Wallets: {}/{} | Modules Success: {} | Modules Fail: {} | Success Rate: {:.2}%",
            report.elapsed.as_secs_f64(),
            report.processed,
            total,
            report.modules_completed,
            report.modules_failed,
            rate
        );

        Ok(report)
    }
}
