use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::account::WalletRecord;
use crate::error::{ConfigError, DatabaseError};
use crate::operation::Operation;
use crate::security::SealedSecret;
use crate::traits::{CompletionRecord, PendingRoute, ProgressStore, RouteFilter};

/// Durable progress store backed by SQLite.
///
/// Wallets and their assigned operations live in two tables; an operation is
/// complete once its `completed_at` column is set, and it is never unset.
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    pool: SqlitePool,
    metrics: Arc<DbMetrics>,
}

#[derive(Debug, Default)]
pub struct DbMetrics {
    pub total_queries: AtomicU64,
    pub total_errors: AtomicU64,
    pub total_inserts: AtomicU64,
    pub total_selects: AtomicU64,
    pub avg_query_time_ms: AtomicU64,
    pub query_count_for_avg: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct DbMetricsSnapshot {
    pub total_queries: u64,
    pub total_errors: u64,
    pub total_inserts: u64,
    pub total_selects: u64,
}

impl DbMetricsSnapshot {
    pub fn error_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.total_errors as f64 / self.total_queries as f64 * 100.0
        }
    }
}

type PendingRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
);

impl SqliteProgressStore {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;
    pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

    pub async fn connect(db_path: &str) -> Result<Self> {
        if !Path::new(db_path).exists() {
            std::fs::File::create(db_path).map_err(|e| ConfigError::IoError {
                path: db_path.to_string(),
                msg: e.to_string(),
            })?;
            info!("Created new database file: {}", db_path);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(Self::DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_millis(Self::DEFAULT_TIMEOUT_MS))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode=WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous=NORMAL;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(&format!("sqlite://{}", db_path))
            .await
            .map_err(|e| DatabaseError::TransactionFailed { msg: e.to_string() })?;

        let store = Self {
            pool,
            metrics: Arc::new(DbMetrics::default()),
        };
        store.init_schema().await?;
        info!(
            "Progress database ready at {} (pool size {}, WAL mode)",
            db_path,
            Self::DEFAULT_MAX_CONNECTIONS
        );
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|_| DatabaseError::PoolExhausted {
                max_size: Self::DEFAULT_MAX_CONNECTIONS,
            })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS wallets (
                address TEXT PRIMARY KEY COLLATE NOCASE,
                ciphertext TEXT NOT NULL,
                iv TEXT NOT NULL,
                salt TEXT NOT NULL,
                tag TEXT NOT NULL,
                proxy TEXT,
                created_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS wallet_tasks (
                id INTEGER PRIMARY KEY,
                wallet_address TEXT NOT NULL COLLATE NOCASE,
                task_name TEXT NOT NULL,
                position INTEGER NOT NULL,
                completed_at INTEGER,
                UNIQUE(wallet_address, task_name)
            );
            CREATE INDEX IF NOT EXISTS idx_wallet_tasks_pending
                ON wallet_tasks(wallet_address, completed_at);",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::MigrationFailed { msg: e.to_string() })?;

        debug!("Progress schema initialized.");
        Ok(())
    }

    /// Stores a wallet and assigns it the given operations.
    ///
    /// Re-registering an address refreshes the sealed key and proxy, keeps
    /// the completion history and appends only operations it lacks.
    pub async fn register_wallet(
        &self,
        record: &WalletRecord,
        operations: &[Operation],
    ) -> Result<()> {
        let start = std::time::Instant::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin wallet registration")?;

        sqlx::query(
            "INSERT INTO wallets (address, ciphertext, iv, salt, tag, proxy, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(address) DO UPDATE SET
                ciphertext = excluded.ciphertext,
                iv = excluded.iv,
                salt = excluded.salt,
                tag = excluded.tag,
                proxy = excluded.proxy",
        )
        .bind(&record.address)
        .bind(&record.sealed.ciphertext)
        .bind(&record.sealed.iv)
        .bind(&record.sealed.salt)
        .bind(&record.sealed.tag)
        .bind(&record.proxy)
        .bind(Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .context("Failed to insert wallet")?;

        for op in operations {
            sqlx::query(
                "INSERT OR IGNORE INTO wallet_tasks (wallet_address, task_name, position)
                 VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1
                                FROM wallet_tasks WHERE wallet_address = ?))",
            )
            .bind(&record.address)
            .bind(op.tag())
            .bind(&record.address)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to assign {} to {}", op, record.address))?;
        }

        let result = tx.commit().await;
        self.metrics.total_inserts.fetch_add(1, Ordering::SeqCst);
        self.record_query_time(start, result.is_ok());

        match result {
            Ok(_) => {
                self.metrics.total_queries.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.metrics.total_errors.fetch_add(1, Ordering::SeqCst);
                error!("Failed to register wallet {}: {}", record.address, e);
                Err(e).context("Failed to commit wallet registration")
            }
        }
    }

    pub fn get_metrics(&self) -> DbMetricsSnapshot {
        DbMetricsSnapshot {
            total_queries: self.metrics.total_queries.load(Ordering::SeqCst),
            total_errors: self.metrics.total_errors.load(Ordering::SeqCst),
            total_inserts: self.metrics.total_inserts.load(Ordering::SeqCst),
            total_selects: self.metrics.total_selects.load(Ordering::SeqCst),
        }
    }

    fn record_query_time(&self, start: std::time::Instant, success: bool) {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let count = self.metrics.query_count_for_avg.load(Ordering::SeqCst);
        let current_avg = self.metrics.avg_query_time_ms.load(Ordering::SeqCst);

        if success {
            let new_count = count + 1;
            let new_avg = if count == 0 {
                elapsed_ms
            } else {
                (current_avg * count + elapsed_ms) / new_count
            };
            self.metrics
                .query_count_for_avg
                .store(new_count, Ordering::SeqCst);
            self.metrics
                .avg_query_time_ms
                .store(new_avg, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn uncompleted(&self, filter: &RouteFilter) -> Result<Vec<PendingRoute>> {
        let start = std::time::Instant::now();

        let rows = sqlx::query_as::<_, PendingRow>(
            "SELECT w.address, w.ciphertext, w.iv, w.salt, w.tag, w.proxy, t.task_name
             FROM wallets w
             JOIN wallet_tasks t ON t.wallet_address = w.address
             WHERE t.completed_at IS NULL
             ORDER BY w.rowid, t.position",
        )
        .fetch_all(&self.pool)
        .await;

        self.metrics.total_selects.fetch_add(1, Ordering::SeqCst);
        self.record_query_time(start, rows.is_ok());

        let rows = match rows {
            Ok(rows) => {
                self.metrics.total_queries.fetch_add(1, Ordering::SeqCst);
                rows
            }
            Err(e) => {
                self.metrics.total_errors.fetch_add(1, Ordering::SeqCst);
                return Err(e).context("Failed to query pending wallets");
            }
        };

        let mut routes: Vec<PendingRoute> = Vec::new();
        for (address, ciphertext, iv, salt, tag, proxy, task_name) in rows {
            if !filter.matches(&address) {
                continue;
            }
            let operation: Operation =
                task_name
                    .parse()
                    .map_err(|e: ConfigError| DatabaseError::CorruptRow {
                        key: address.clone(),
                        reason: e.to_string(),
                    })?;

            match routes.last_mut() {
                Some(route) if route.wallet.address == address => route.tasks.push(operation),
                _ => routes.push(PendingRoute {
                    wallet: WalletRecord {
                        address,
                        sealed: SealedSecret {
                            ciphertext,
                            iv,
                            salt,
                            tag,
                        },
                        proxy,
                    },
                    tasks: vec![operation],
                }),
            }
        }

        if let Some(limit) = filter.limit {
            routes.truncate(limit);
        }
        Ok(routes)
    }

    async fn record_complete(&self, address: &str, operation: Operation) -> Result<()> {
        let start = std::time::Instant::now();

        let result = sqlx::query(
            "UPDATE wallet_tasks SET completed_at = ?
             WHERE wallet_address = ? AND task_name = ? AND completed_at IS NULL",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(address)
        .bind(operation.tag())
        .execute(&self.pool)
        .await;

        self.metrics.total_inserts.fetch_add(1, Ordering::SeqCst);
        self.record_query_time(start, result.is_ok());

        match result {
            Ok(done) => {
                self.metrics.total_queries.fetch_add(1, Ordering::SeqCst);
                if done.rows_affected() == 0 {
                    debug!("{} already recorded (or unassigned) for {}", operation, address);
                }
                Ok(())
            }
            Err(e) => {
                self.metrics.total_errors.fetch_add(1, Ordering::SeqCst);
                error!("Failed to record completion of {}: {}", operation, e);
                Err(e).context("Failed to record completion")
            }
        }
    }

    async fn completions(&self, address: &str) -> Result<Vec<CompletionRecord>> {
        let start = std::time::Instant::now();

        let rows = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT wallet_address, task_name, completed_at FROM wallet_tasks
             WHERE wallet_address = ? AND completed_at IS NOT NULL
             ORDER BY position",
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await;

        self.metrics.total_selects.fetch_add(1, Ordering::SeqCst);
        self.record_query_time(start, rows.is_ok());

        let rows = match rows {
            Ok(rows) => {
                self.metrics.total_queries.fetch_add(1, Ordering::SeqCst);
                rows
            }
            Err(e) => {
                self.metrics.total_errors.fetch_add(1, Ordering::SeqCst);
                return Err(e).context(format!("Failed to query completions for {}", address));
            }
        };

        rows.into_iter()
            .map(|(address, task_name, completed_at)| -> Result<CompletionRecord> {
                let operation = task_name.parse::<Operation>().map_err(|e| {
                    DatabaseError::CorruptRow {
                        key: address.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let completed_at = Utc
                    .timestamp_millis_opt(completed_at)
                    .single()
                    .ok_or_else(|| DatabaseError::CorruptRow {
                        key: address.clone(),
                        reason: format!("bad timestamp {}", completed_at),
                    })?;
                Ok(CompletionRecord {
                    address,
                    operation,
                    completed_at,
                })
            })
            .collect()
    }
}
