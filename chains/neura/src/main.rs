use neura_runner::config::NeuraConfig;
use neura_runner::handlers::build_registry;
use neura_runner::notification::TelegramNotifier;
use neura_runner::setup::generate_database;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Password, Select};
use dotenv::dotenv;
use fleet_core::{
    setup_logger, spawn_shutdown_listener, FleetMetrics, FleetRunner, ProgressStore, ProxyManager,
    ProxyPool, RetryPolicy, RouteFilter, SqliteProgressStore, WalletManager,
};
use rand::seq::SliceRandom;
use std::env;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(short, long)]
    export_metrics: Option<String>,
    #[arg(long, default_value = "30")]
    metrics_interval: u64,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seal private keys and register them with the configured modules
    Generate,
    /// Work through every pending module
    Run {
        /// Only these addresses (repeatable)
        #[arg(long = "wallet")]
        wallets: Vec<String>,
        /// At most this many wallets
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger();
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);

    let config = NeuraConfig::load(&args.config)?;
    config.validate().context("Invalid configuration")?;

    let command = match args.command {
        Some(command) => command,
        None => choose_from_menu()?,
    };

    match command {
        Command::Generate => {
            let password = wallet_password(true)?;
            let summary = generate_database(&config, &password).await?;
            info!(
                "Generated {} wallets ({} proxies available)",
                summary.wallets, summary.proxies
            );
        }
        Command::Run { wallets, limit } => {
            let mut filter = RouteFilter::all();
            if !wallets.is_empty() {
                filter = filter.with_addresses(wallets);
            }
            if let Some(limit) = limit {
                filter = filter.with_limit(limit);
            }
            run_fleet(&config, filter, args.export_metrics, args.metrics_interval).await?;
        }
    }

    Ok(())
}

fn choose_from_menu() -> Result<Command> {
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose action")
        .items(&["1) Generate database", "2) Work"])
        .default(1)
        .interact()
        .context("Cannot show menu (not a terminal). Pass a subcommand instead.")?;

    Ok(match choice {
        0 => Command::Generate,
        _ => Command::Run {
            wallets: Vec::new(),
            limit: None,
        },
    })
}

/// `WALLET_PASSWORD` first, interactive prompt otherwise.
fn wallet_password(confirm: bool) -> Result<String> {
    if let Ok(password) = env::var("WALLET_PASSWORD") {
        if !password.is_empty() {
            return Ok(password);
        }
    }

    let theme = ColorfulTheme::default();
    let mut prompt = Password::with_theme(&theme).with_prompt("Enter wallet password");
    if confirm {
        prompt = prompt.with_confirmation("Repeat password", "Passwords do not match");
    }
    prompt.interact().map_err(|e| {
        error!("Cannot prompt for password (not a terminal).");
        error!("Please set WALLET_PASSWORD environment variable.");
        anyhow::anyhow!("No wallet password available: {}", e)
    })
}

async fn run_fleet(
    config: &NeuraConfig,
    filter: RouteFilter,
    export_metrics: Option<String>,
    metrics_interval: u64,
) -> Result<()> {
    let store = Arc::new(SqliteProgressStore::connect(&config.database_path).await?);
    let routes = store.uncompleted(&filter).await?;
    if routes.is_empty() {
        info!("All wallets already processed.");
        return Ok(());
    }
    info!("{} wallets have pending modules", routes.len());

    // A wrong password is fatal here, before anything is launched
    let password = wallet_password(false)?;
    let proxies = ProxyManager::load_proxies(&config.proxies_file)?;
    let pool = (!proxies.is_empty()).then(|| Arc::new(ProxyPool::new(proxies)));
    let mut accounts = WalletManager::unseal_routes(routes, &password, pool)?;

    if config.fleet.shuffle_wallets {
        accounts.shuffle(&mut rand::thread_rng());
    }

    let policy = RetryPolicy::from_settings(&config.fleet.retry);
    let registry = build_registry(config.endpoints()?, &policy)?;

    let token = CancellationToken::new();
    spawn_shutdown_listener(token.clone());

    let metrics = Arc::new(FleetMetrics::default());
    let mut runner = FleetRunner::new(registry, store.clone(), config.fleet.clone())
        .with_metrics(Arc::clone(&metrics))
        .with_cancellation(token);
    if let Some(telegram) = &config.telegram {
        runner = runner.with_notifier(Arc::new(TelegramNotifier::new(telegram.clone())));
    }

    let metrics_task = export_metrics.clone().map(|path| {
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(metrics_interval));
            loop {
                interval.tick().await;
                if let Err(e) = metrics.export_to_file(&path).await {
                    error!("Metrics export failed: {}", e);
                }
            }
        })
    });

    let report = runner.run(accounts).await;

    if let Some(task) = metrics_task {
        task.abort();
    }
    if let Some(path) = export_metrics {
        match metrics.export_to_file(&path).await {
            Ok(_) => info!("Final metrics exported to {}", path),
            Err(e) => error!("Failed to export final metrics: {}", e),
        }
    }

    let db = store.get_metrics();
    info!(
        "Database: {} queries, {} errors ({:.2}%)",
        db.total_queries,
        db.total_errors,
        db.error_rate()
    );

    report.map(|_| ())
}
