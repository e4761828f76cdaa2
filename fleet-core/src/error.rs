//! # Core Error Types
//!
//! Centralized error definitions for the fleet-core crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use std::fmt;
use thiserror::Error;

/// Configuration and contract errors. These abort startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown operation tag: '{tag}'")]
    UnknownOperation { tag: String },

    #[error("No handler registered for operation {operation} (wallet {address})")]
    UnregisteredOperation { operation: String, address: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Database operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection pool exhausted (max: {max_size})")]
    PoolExhausted { max_size: u32 },

    #[error("Transaction failed: {msg}")]
    TransactionFailed { msg: String },

    #[error("Migration failed: {msg}")]
    MigrationFailed { msg: String },

    #[error("Corrupt row for {key}: {reason}")]
    CorruptRow { key: String, reason: String },
}

/// Security-related errors
#[derive(Error, Debug, Clone)]
pub enum SecurityError {
    #[error("Password required but not provided")]
    PasswordRequired,

    #[error("Encryption/decryption failed: {reason}")]
    CryptographyFailed { reason: String },

    #[error("Sealed secret for {address} could not be opened (wrong password?)")]
    UnsealFailed { address: String },
}

/// Structured failure category of one remote call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Host unreachable, proxy failure, HTTP-layer error, attempt timeout.
    Transport,
    /// The remote side answered but refused (non-2xx, business failure).
    Rejected,
    Unknown,
}

impl FailureKind {
    const TRANSPORT_PATTERNS: [&'static str; 5] =
        ["host", "proxy", "http", "connection", "timed out"];

    /// Keyword fallback for errors that arrive without a category.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if Self::TRANSPORT_PATTERNS
            .iter()
            .any(|pattern| message.contains(pattern))
        {
            FailureKind::Transport
        } else {
            FailureKind::Unknown
        }
    }

    pub fn is_transport(self) -> bool {
        matches!(self, FailureKind::Transport)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Transport => "transport",
            FailureKind::Rejected => "rejected",
            FailureKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Failure of a single attempt, as seen by the retry policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} failure: {message}")]
pub struct CallError {
    pub kind: FailureKind,
    pub message: String,
}

impl CallError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Rejected, message)
    }

    /// Builds an error whose category is inferred from the message text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(FailureKind::classify(&message), message)
    }
}

impl From<anyhow::Error> for CallError {
    fn from(e: anyhow::Error) -> Self {
        CallError::from_message(format!("{:#}", e))
    }
}
