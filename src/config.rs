//! Runtime configuration. Values come from `ASSET_ADMIN_*` environment
//! variables; CLI flags override them.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const ENV_DB: &str = "ASSET_ADMIN_DB";
pub const ENV_BIND: &str = "ASSET_ADMIN_BIND";
pub const ENV_GRAPH: &str = "ASSET_ADMIN_GRAPH";
pub const ENV_MAX_CONNECTIONS: &str = "ASSET_ADMIN_MAX_CONNECTIONS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "ASSET_ADMIN_BUSY_TIMEOUT_MS";
pub const ENV_ACQUIRE_TIMEOUT_MS: &str = "ASSET_ADMIN_ACQUIRE_TIMEOUT_MS";
pub const ENV_LOG: &str = "ASSET_ADMIN_LOG";
pub const ENV_LOG_FORMAT: &str = "ASSET_ADMIN_LOG_FORMAT";
pub const ENV_LOG_DIR: &str = "ASSET_ADMIN_LOG_DIR";

pub const DEFAULT_LOG_FILTER: &str = "asset_admin=info,sqlx=warn";
const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format {other:?} (expected pretty or json)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
    /// Daily-rolling file sink in addition to stderr.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    /// JSON graph file replacing the built-in graph.
    pub graph_path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = match lookup(ENV_DB) {
            Some(path) => PathBuf::from(path),
            None => default_db_path(),
        };
        let bind = lookup(ENV_BIND)
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("{ENV_BIND} is not a socket address"))?;
        let log_format = match lookup(ENV_LOG_FORMAT) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .with_context(|| format!("parse {ENV_LOG_FORMAT}"))?,
            None => LogFormat::Pretty,
        };

        Ok(AppConfig {
            db_path,
            bind,
            graph_path: lookup(ENV_GRAPH).map(PathBuf::from),
            max_connections: parse_or(&lookup, ENV_MAX_CONNECTIONS, 8)?,
            busy_timeout: Duration::from_millis(parse_or(&lookup, ENV_BUSY_TIMEOUT_MS, 5_000)?),
            acquire_timeout: Duration::from_millis(parse_or(
                &lookup,
                ENV_ACQUIRE_TIMEOUT_MS,
                30_000,
            )?),
            log: LogConfig {
                filter: lookup(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                format: log_format,
                dir: lookup(ENV_LOG_DIR).map(PathBuf::from),
            },
        })
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| values.get(key).cloned())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key}={raw:?} is not valid")),
        None => Ok(default),
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("asset-admin")
        .join("asset-admin.sqlite3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let config = AppConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout, Duration::from_millis(5_000));
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.graph_path.is_none());
        assert!(config.db_path.ends_with("asset-admin.sqlite3"));
    }

    #[test]
    fn environment_values_override_defaults() {
        let values: HashMap<String, String> = [
            (ENV_DB, "/tmp/a.sqlite3"),
            (ENV_BIND, "0.0.0.0:9000"),
            (ENV_MAX_CONNECTIONS, "2"),
            (ENV_LOG_FORMAT, "JSON"),
            (ENV_GRAPH, "/etc/graph.json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = AppConfig::from_map(&values).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/a.sqlite3"));
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.graph_path, Some(PathBuf::from("/etc/graph.json")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let values: HashMap<String, String> =
            [(ENV_BUSY_TIMEOUT_MS.to_string(), "soon".to_string())].into();
        let err = AppConfig::from_map(&values).unwrap_err();
        assert!(err.to_string().contains(ENV_BUSY_TIMEOUT_MS));
    }
}
