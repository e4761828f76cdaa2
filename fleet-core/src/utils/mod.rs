//! # Utilities Module
//!
//! Internal utility modules for the fleet-core crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod runner;
pub(crate) mod sequencer;
pub(crate) mod wallet_manager;

// Selective exports - only public utilities
pub use logger::{setup_logger, MODULE_RESULT_TARGET};
pub use proxy_manager::{ProxyBinding, ProxyManager, ProxyPool};
pub use retry::RetryPolicy;
pub use runner::{spawn_shutdown_listener, FleetReport, FleetRunner};
pub use sequencer::{AccountSequencer, SequenceReport};
pub use wallet_manager::WalletManager;
