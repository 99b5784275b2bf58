//! Layered configuration: CLI flags override environment variables override
//! an optional `conf/application.yml`, the same precedence the Nacos-derived
//! server uses via `clap` + the `config` crate.

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "ezekiel-server")]
struct Cli {
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    short_timeout: Option<u64>,
    #[arg(long)]
    long_timeout: Option<u64>,
    #[arg(long)]
    log_dir: Option<String>,
}

/// Wire/runtime settings (`short_timeout`, `long_timeout`, `keep_alive`),
/// plus the transport bind address this service actually needs to start.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_short_timeout")]
    pub short_timeout: u64,
    #[serde(default = "default_long_timeout")]
    pub long_timeout: u64,
    /// Keep-alive ping period in seconds for the pull (SSE) session;
    /// `None`/absent disables it, matching spec.md §6's documented
    /// `keep_alive:int|false=false` default.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: Option<u64>,
    pub log_dir: Option<String>,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8090
}
fn default_short_timeout() -> u64 {
    60
}
fn default_long_timeout() -> u64 {
    3600
}
fn default_keep_alive() -> Option<u64> {
    None
}

impl Settings {
    /// Load from (lowest to highest precedence) `conf/application.yml`,
    /// `EZEKIEL_*` environment variables, then CLI flags.
    pub fn load() -> anyhow::Result<Self> {
        let cli = Cli::parse();

        let mut builder = Config::builder()
            .add_source(File::new("conf/application", FileFormat::Yaml).required(false))
            .add_source(Environment::with_prefix("ezekiel").separator("_"));

        if let Some(v) = &cli.address {
            builder = builder.set_override("address", v.clone())?;
        }
        if let Some(v) = cli.port {
            builder = builder.set_override("port", v as i64)?;
        }
        if let Some(v) = cli.short_timeout {
            builder = builder.set_override("short_timeout", v as i64)?;
        }
        if let Some(v) = cli.long_timeout {
            builder = builder.set_override("long_timeout", v as i64)?;
        }
        if let Some(v) = &cli.log_dir {
            builder = builder.set_override("log_dir", v.clone())?;
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::builder().build().unwrap();
        let settings: Settings = config.try_deserialize().unwrap();
        assert_eq!(settings.short_timeout, 60);
        assert_eq!(settings.long_timeout, 3600);
        assert_eq!(settings.keep_alive, None);
        assert_eq!(settings.port, 8090);
    }
}
