use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::optimizer::OptimizerSettings;

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub broadcast_period: Duration,
    pub optimizer: OptimizerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8001,
            rust_log: "info".to_string(),
            broadcast_period: Duration::from_secs(2),
            optimizer: OptimizerSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let period_secs: f64 = optional_env("BROADCAST_PERIOD_SECS")?
            .unwrap_or(defaults.broadcast_period.as_secs_f64());
        ensure!(
            period_secs.is_finite() && period_secs > 0.0,
            "BROADCAST_PERIOD_SECS must be a positive number of seconds"
        );

        let optimizer = OptimizerSettings {
            max_new_machines: optional_env("MAX_NEW_MACHINES")?
                .unwrap_or(defaults.optimizer.max_new_machines),
            overload_threshold: optional_env("OVERLOAD_THRESHOLD")?
                .unwrap_or(defaults.optimizer.overload_threshold),
            transfer_fraction: optional_env("TRANSFER_FRACTION")?
                .unwrap_or(defaults.optimizer.transfer_fraction),
            early_stop_fraction: optional_env("EARLY_STOP_FRACTION")?
                .unwrap_or(defaults.optimizer.early_stop_fraction),
        };
        optimizer.validate()?;

        Ok(Config {
            port: optional_env("PORT")?.unwrap_or(defaults.port),
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            broadcast_period: Duration::from_secs_f64(period_secs),
            optimizer,
        })
    }
}

fn optional_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(None),
    }
}
