use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_RPC: &str = "https://rpc.devnet.surge.dev";
pub const DEFAULT_NAME: &str = "Surge Devnet";
pub const DEFAULT_INSCRIPTIONS_URL: &str = "https://api.devnet.surge.dev/surge/zk/bitcoindata";

const DEFAULT_MAX_ROWS: usize = 20;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_INSCRIPTION_POLL_SECS: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_ROWS_LIMIT: usize = 100;

/// On-disk config. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub rpc: Option<String>,
    pub name: Option<String>,
    pub inscriptions_url: Option<String>,
    pub max_rows: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub inscription_poll_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Values taken from `SURGE_RPC_ADDRESS` / `SURGE_RPC_NAME`
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub rpc: Option<String>,
    pub name: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            rpc: non_empty(std::env::var("SURGE_RPC_ADDRESS").ok()),
            name: non_empty(std::env::var("SURGE_RPC_NAME").ok()),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub rpc: Option<String>,
    pub name: Option<String>,
    pub inscriptions_url: Option<String>,
    pub max_rows: Option<usize>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rpc: String,
    pub name: String,
    pub inscriptions_url: String,
    pub max_rows: usize,
    pub poll_interval: Duration,
    pub inscription_poll: Duration,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(Config::default(), EnvOverrides::default(), CliOverrides::default())
    }
}

impl Settings {
    /// CLI beats env beats file beats defaults
    pub fn resolve(file: Config, env: EnvOverrides, cli: CliOverrides) -> Self {
        let rpc = non_empty(cli.rpc)
            .or(env.rpc)
            .or(non_empty(file.rpc))
            .unwrap_or_else(|| DEFAULT_RPC.to_string());
        let name = non_empty(cli.name)
            .or(env.name)
            .or(non_empty(file.name))
            .unwrap_or_else(|| DEFAULT_NAME.to_string());
        let inscriptions_url = non_empty(cli.inscriptions_url)
            .or(non_empty(file.inscriptions_url))
            .unwrap_or_else(|| DEFAULT_INSCRIPTIONS_URL.to_string());
        let max_rows = cli
            .max_rows
            .or(file.max_rows)
            .unwrap_or(DEFAULT_MAX_ROWS)
            .clamp(1, MAX_ROWS_LIMIT);

        Self {
            rpc,
            name,
            inscriptions_url,
            max_rows,
            poll_interval: Duration::from_millis(
                file.poll_interval_ms
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                    .max(100),
            ),
            inscription_poll: Duration::from_secs(
                file.inscription_poll_secs
                    .unwrap_or(DEFAULT_INSCRIPTION_POLL_SECS)
                    .max(1),
            ),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                    .max(1),
            ),
        }
    }
}

/// Load the config file; a missing or unreadable file yields defaults
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    load_from(&path).unwrap_or_else(|err| {
        warn!(path = %path.display(), "ignoring config: {err:#}");
        Config::default()
    })
}

pub fn load_from(path: &Path) -> anyhow::Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str::<Config>(&content).with_context(|| format!("Invalid config {}", path.display()))
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("SURGE_EXPLORER_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("surge-explorer").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("surge-explorer").join("config.toml"));
    }

    directories::ProjectDirs::from("dev", "surge", "surge-explorer")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("surge-explorer"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("surge-explorer"));
    }
    directories::ProjectDirs::from("dev", "surge", "surge-explorer")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn default_log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("surge-explorer.log"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
