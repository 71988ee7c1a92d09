use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use runtime::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

/// Detect DB backend from URL scheme.
pub fn detect_backend(url: &str) -> Result<Backend> {
    let raw = url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let parsed = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match parsed.scheme() {
        "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
        "postgres" | "postgresql" => Ok(Backend::Postgres),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
pub fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if is_memory_dsn(dsn) {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create directory {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Final DSN for `cfg`: sqlite file paths are anchored at `base_dir`.
pub fn effective_dsn(cfg: &DatabaseConfig, base_dir: &Path) -> Result<String> {
    let dsn = cfg.url.trim();
    match detect_backend(dsn)? {
        Backend::Sqlite if dsn.starts_with("sqlite://") => {
            absolutize_sqlite_dsn(dsn, base_dir, true)
        }
        _ => Ok(dsn.to_string()),
    }
}

/// Open the connection pool described by `cfg`.
pub async fn connect(cfg: &DatabaseConfig, base_dir: &Path) -> Result<DatabaseConnection> {
    let dsn = effective_dsn(cfg, base_dir)?;

    let mut opts = ConnectOptions::new(dsn.clone());
    opts.max_connections(cfg.max_conns.unwrap_or(10))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_sec.unwrap_or(5)))
        .sqlx_logging(false);
    if is_memory_dsn(&dsn) {
        // every pooled in-memory connection would see its own empty database
        opts.max_connections(1).min_connections(1);
    }

    tracing::info!(backend = ?detect_backend(&dsn)?, "Connecting to database");
    let db = Database::connect(opts)
        .await
        .context("failed to connect to database")?;
    Ok(db)
}
