use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use users::UsersConfig;

mod db;
mod http;
mod shutdown;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Name of the users module entry in the `modules` config bag.
const USERS_MODULE: &str = "users";

/// Users Server - REST service managing user records
#[derive(Parser)]
#[command(name = "users-server")]
#[command(about = "Users Server - REST service managing user records")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, `host:port` or `:port` (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        bind: cli.bind.clone(),
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    let mut config = AppConfig::load_layered(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(
        &logging_config,
        Path::new(&config.server.home_dir),
    );
    tracing::info!("Users Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn users_config(config: &AppConfig) -> Result<UsersConfig> {
    let users_cfg: UsersConfig = config.module_config(USERS_MODULE)?;
    if users_cfg.default_page_size == 0 || users_cfg.max_page_size < users_cfg.default_page_size {
        return Err(anyhow!(
            "invalid paging for module '{}': default_page_size={}, max_page_size={}",
            USERS_MODULE,
            users_cfg.default_page_size,
            users_cfg.max_page_size
        ));
    }
    Ok(users_cfg)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let users_cfg = users_config(&config)?;
    let db_cfg = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("database configuration is required"))?;

    let base_dir = PathBuf::from(&config.server.home_dir);
    let conn = db::connect(&db_cfg, &base_dir).await?;
    if db_cfg.create_schema {
        users::infra::storage::schema::create_table_if_missing(&conn).await?;
    }

    let app = http::build_app(
        users::build_router(conn, users_cfg),
        config.server.timeout_sec,
    );

    let addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind listen address '{addr}'"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = shutdown::wait_for_shutdown().await {
                tracing::error!(error = %e, "signal handler failed");
            }
        })
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let addr = config.server.listen_addr();
    addr.to_socket_addrs()
        .with_context(|| format!("invalid listen address '{addr}'"))?;

    users_config(config)?;

    match &config.database {
        Some(db_cfg) => {
            let backend = db::detect_backend(&db_cfg.url)?;
            tracing::info!(?backend, "Database configuration is valid");
        }
        None => return Err(anyhow!("database configuration is required")),
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    Ok(())
}
