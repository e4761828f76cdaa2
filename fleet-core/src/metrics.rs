use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_secs: u64,
    pub modules: ModuleMetrics,
    pub accounts: AccountMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleMetrics {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountMetrics {
    pub launched: u64,
    pub in_flight: u64,
    pub processed: u64,
}

/// Fleet-wide counters shared by every sequencer of a run.
#[derive(Debug)]
pub struct FleetMetrics {
    modules_completed: AtomicU64,
    modules_failed: AtomicU64,
    module_duration_sum_ms: AtomicU64,
    module_min_duration_ms: AtomicU64,
    module_max_duration_ms: AtomicU64,
    accounts_launched: AtomicU64,
    accounts_in_flight: AtomicU64,
    accounts_processed: AtomicU64,
    start_time: Instant,
}

impl Default for FleetMetrics {
    fn default() -> Self {
        Self {
            modules_completed: AtomicU64::new(0),
            modules_failed: AtomicU64::new(0),
            module_duration_sum_ms: AtomicU64::new(0),
            module_min_duration_ms: AtomicU64::new(u64::MAX),
            module_max_duration_ms: AtomicU64::new(0),
            accounts_launched: AtomicU64::new(0),
            accounts_in_flight: AtomicU64::new(0),
            accounts_processed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl FleetMetrics {
    pub fn record_module(&self, duration: Duration, completed: bool) {
        let duration_ms = duration.as_millis() as u64;
        self.module_duration_sum_ms
            .fetch_add(duration_ms, Ordering::SeqCst);
        self.module_min_duration_ms
            .fetch_min(duration_ms, Ordering::SeqCst);
        self.module_max_duration_ms
            .fetch_max(duration_ms, Ordering::SeqCst);

        if completed {
            self.modules_completed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.modules_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_launch(&self) {
        self.accounts_launched.fetch_add(1, Ordering::SeqCst);
    }

    pub fn enter_account(&self) {
        self.accounts_in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn leave_account(&self) {
        self.accounts_in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Counts a fully processed account and returns its 1-based ordinal.
    pub fn record_account_processed(&self) -> u64 {
        self.accounts_processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn modules_completed(&self) -> u64 {
        self.modules_completed.load(Ordering::SeqCst)
    }

    pub fn modules_failed(&self) -> u64 {
        self.modules_failed.load(Ordering::SeqCst)
    }

    pub fn accounts_launched(&self) -> u64 {
        self.accounts_launched.load(Ordering::SeqCst)
    }

    pub fn accounts_in_flight(&self) -> u64 {
        self.accounts_in_flight.load(Ordering::SeqCst)
    }

    pub fn accounts_processed(&self) -> u64 {
        self.accounts_processed.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.modules_completed();
        let failed = self.modules_failed();
        let total = completed + failed;
        let duration_sum = self.module_duration_sum_ms.load(Ordering::SeqCst);
        let min_duration = self.module_min_duration_ms.load(Ordering::SeqCst);

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            modules: ModuleMetrics {
                total,
                completed,
                failed,
                success_rate: if total > 0 {
                    completed as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
                avg_duration_ms: if total > 0 {
                    duration_sum as f64 / total as f64
                } else {
                    0.0
                },
                min_duration_ms: if min_duration == u64::MAX {
                    0
                } else {
                    min_duration
                },
                max_duration_ms: self.module_max_duration_ms.load(Ordering::SeqCst),
            },
            accounts: AccountMetrics {
                launched: self.accounts_launched(),
                in_flight: self.accounts_in_flight(),
                processed: self.accounts_processed(),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    pub async fn export_to_file(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_json()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_counters() {
        let metrics = FleetMetrics::default();

        metrics.record_module(Duration::from_millis(100), true);
        metrics.record_module(Duration::from_millis(200), true);
        metrics.record_module(Duration::from_millis(150), false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.modules.total, 3);
        assert_eq!(snapshot.modules.completed, 2);
        assert_eq!(snapshot.modules.min_duration_ms, 100);
        assert_eq!(snapshot.modules.max_duration_ms, 200);
        assert!((snapshot.modules.success_rate - 66.67).abs() < 0.1);
    }

    #[test]
    fn test_processed_ordinals_are_sequential() {
        let metrics = FleetMetrics::default();
        assert_eq!(metrics.record_account_processed(), 1);
        assert_eq!(metrics.record_account_processed(), 2);
        assert_eq!(metrics.accounts_processed(), 2);
    }

    #[test]
    fn test_json_export() {
        let metrics = FleetMetrics::default();
        metrics.record_module(Duration::from_millis(10), true);

        let json = metrics.to_json();
        assert!(json.contains("modules"));
        assert!(json.contains("accounts"));
    }
}
