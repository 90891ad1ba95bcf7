use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use threads_api::toggle::ToggleKind;
use threads_db::StoreConfig;
use threads_types::models::DeletePolicy;

const DEV_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub jwt_secret: String,
    pub delete_policy: DeletePolicy,
    pub toggle_mode: ToggleKind,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys fall back to defaults; set but
    /// unparseable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("THREADS_JWT_SECRET").unwrap_or_else(|| {
            warn!("THREADS_JWT_SECRET not set, using the development secret");
            DEV_SECRET.into()
        });

        Ok(Self {
            host: try_load(&lookup, "THREADS_HOST", "0.0.0.0")?,
            port: try_load(&lookup, "THREADS_PORT", "3000")?,
            store: StoreConfig {
                path: try_load::<PathBuf, _>(&lookup, "THREADS_DB_PATH", "threads.db")?,
                readers: try_load(&lookup, "THREADS_DB_READERS", "4")?,
            },
            jwt_secret,
            delete_policy: try_load(&lookup, "THREADS_DELETE_POLICY", "cascade")?,
            toggle_mode: try_load(&lookup, "THREADS_TOGGLE_MODE", "client-flag")?,
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("invalid {key} value '{raw}'"))
}
