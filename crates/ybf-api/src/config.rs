use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Placeholder session secrets that MUST NOT be used.
pub const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "changeme",
];

/// Runtime knobs the handlers read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub public_url: String,
    pub session_ttl: chrono::Duration,
    pub gate_attempts_per_minute: u32,
    pub testimony_auto_approve: bool,
    pub contact_email: String,
    /// International format without `+`, e.g. `2348012345678`.
    pub whatsapp_number: Option<String>,
    pub sweep_interval: Duration,
    pub sweep_grace: chrono::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3000".into(),
            session_ttl: chrono::Duration::minutes(60),
            gate_attempts_per_minute: 5,
            testimony_auto_approve: true,
            contact_email: "info@youngbuildersfoundation.org".into(),
            whatsapp_number: None,
            sweep_interval: Duration::from_secs(3600),
            sweep_grace: chrono::Duration::hours(24),
        }
    }
}

/// Process configuration, read from `YBF_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub session_secret: String,
    pub max_body_bytes: usize,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Settings::default();

        let session_secret = std::env::var("YBF_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("YBF_SESSION_SECRET is unset or still a placeholder");
        }

        let whatsapp_number = std::env::var("YBF_WHATSAPP_NUMBER")
            .ok()
            .map(|n| n.trim().trim_start_matches('+').to_string())
            .filter(|n| !n.is_empty());

        let settings = Settings {
            public_url: env_or("YBF_PUBLIC_URL", &defaults.public_url),
            session_ttl: chrono::Duration::minutes(parsed_or("YBF_SESSION_TTL_MINUTES", 60)?),
            gate_attempts_per_minute: parsed_or("YBF_GATE_ATTEMPTS_PER_MINUTE", 5)?,
            testimony_auto_approve: parsed_or("YBF_TESTIMONY_AUTO_APPROVE", true)?,
            contact_email: env_or("YBF_CONTACT_EMAIL", &defaults.contact_email),
            whatsapp_number,
            sweep_interval: Duration::from_secs(parsed_or("YBF_SWEEP_INTERVAL_SECS", 3600)?),
            sweep_grace: chrono::Duration::hours(parsed_or("YBF_SWEEP_GRACE_HOURS", 24)?),
        };

        let max_body_mb: usize = parsed_or("YBF_MAX_BODY_MB", 64)?;

        Ok(Self {
            host: env_or("YBF_HOST", "0.0.0.0"),
            port: parsed_or("YBF_PORT", 3000)?,
            db_path: env_or("YBF_DB_PATH", "ybf.db").into(),
            storage_dir: env_or("YBF_STORAGE_DIR", "./storage").into(),
            session_secret,
            max_body_bytes: max_body_mb * 1024 * 1024,
            settings,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
