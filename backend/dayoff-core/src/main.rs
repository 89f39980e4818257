// src/main.rs

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dayoff_core::api::{router, AppState};
use dayoff_core::clock::SystemClock;
use dayoff_core::config::Config;
use dayoff_core::import::import_employees;
use dayoff_core::service::SchedulingService;
use dayoff_core::store::SqliteStore;

#[derive(Parser)]
#[command(name = "dayoff-core")]
#[command(version)]
#[command(about = "Day-off scheduling and check-in dispatch service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve {
        /// Overrides SERVER_HOST
        #[arg(long)]
        host: Option<String>,

        /// Overrides SERVER_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load a personnel roster CSV into the directory table
    ImportEmployees {
        /// badge,name,title,supervisor_name,level,status
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Loading configuration failed: {}", e);
            return Err(e).context("Loading configuration failed");
        }
    };

    let store = SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("Opening database {} failed", config.database_url))?;
    store.migrate().await.context("Running migrations failed")?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::ImportEmployees { file } => {
            let reader = File::open(&file)
                .with_context(|| format!("Opening roster {} failed", file.display()))?;
            let summary = import_employees(&store, reader)
                .await
                .context("Roster import failed")?;
            info!(
                "Imported {} employee(s) from {} ({} skipped)",
                summary.imported,
                file.display(),
                summary.skipped
            );
            Ok(())
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            serve(config, store).await
        }
    }
}

async fn serve(config: Config, store: SqliteStore) -> Result<()> {
    info!("Starting day-off service in {} mode", config.environment);

    let period = config.period().context("Invalid scheduling period")?;
    let exceptions = config
        .roster_exceptions()
        .context("Invalid roster exceptions")?;
    let policy = config.policy().context("Invalid scheduling policy")?;
    info!(
        "Period {:?}, max off days {}, grace {} min, windows {}/{} UTC, quota on save: {}",
        period.dates(),
        policy.max_off_days,
        policy.grace.num_minutes(),
        policy.windows.morning.format("%H:%M"),
        policy.windows.afternoon.format("%H:%M"),
        policy.enforce_quota_on_save
    );

    let store = Arc::new(store);
    let service = SchedulingService::new(
        store.clone(),
        store,
        period,
        policy,
        exceptions,
        Arc::new(SystemClock),
    );
    let app = router(AppState {
        service: Arc::new(service),
    });

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;

    match config.tls_paths() {
        Some((cert_path, key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
                .await
                .context("Loading TLS certificate failed")?;
            info!("Listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Binding {} failed", addr))?;
            info!("Listening on http://{}", addr);
            axum::serve(listener, app).await.context("HTTP server failed")?;
        }
    }

    Ok(())
}
