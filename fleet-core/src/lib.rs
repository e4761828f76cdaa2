//! # Fleet Core - Wallet Fleet Orchestration Engine
//!
//! Drives many wallet accounts through an ordered list of remote operations
//! with bounded parallelism, paced launches, retries with proxy rotation and
//! a durable record of completed operations.
//!
//! ## Modules
//!
//! - [`account`] - Account identity, sealed wallet records, secret keys
//! - [`config`] - Fleet, pause and retry configuration
//! - [`database`] - SQLite progress store
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Fleet counters and JSON export
//! - [`operation`] - Operation kinds
//! - [`progress`] - In-memory progress store
//! - [`registry`] - Operation to handler mapping
//! - [`security`] - Secret sealing (scrypt + AES-256-GCM)
//! - [`traits`] - Handler, store and notifier contracts
//! - `utils` - Retry policy, proxies, sequencer, runner, logging

pub mod account;
pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub mod operation;
pub mod progress;
pub mod registry;
pub mod security;
pub mod traits;
pub(crate) mod utils;

pub use account::{Account, SecretKey, WalletRecord};
pub use config::{FleetConfig, Pause, ProxyConfig, RetrySettings, MAX_RETRY_DELAY_SECS};
pub use database::{DbMetricsSnapshot, SqliteProgressStore};
pub use error::{CallError, ConfigError, DatabaseError, FailureKind, SecurityError};
pub use metrics::{FleetMetrics, MetricsSnapshot};
pub use operation::Operation;
pub use progress::MemoryProgressStore;
pub use registry::ModuleRegistry;
pub use security::{SealedSecret, SecurityUtils};
pub use traits::{
    CompletionRecord, FleetNotifier, ModuleHandler, Outcome, PendingRoute, ProgressStore,
    RouteFilter,
};

pub use utils::{
    setup_logger, spawn_shutdown_listener, AccountSequencer, FleetReport, FleetRunner,
    ProxyBinding, ProxyManager, ProxyPool, RetryPolicy, SequenceReport, WalletManager,
    MODULE_RESULT_TARGET,
};
