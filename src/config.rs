use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Root URL of the registry lookup service; identifiers are appended as a path segment.
    pub lookup_base_url: String,
    pub lookup_timeout_secs: u64,
    /// Pause after every input row. Zero disables the pause.
    pub row_delay_ms: u64,
    pub dedup_cooldown_secs: u64,
    pub dedup_max_entries: u64,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            lookup_base_url: "https://minhareceita.org".to_string(),
            lookup_timeout_secs: 30,
            row_delay_ms: 1000,
            dedup_cooldown_secs: 2 * 60 * 60,
            dedup_max_entries: 100_000,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: parse_var("PORT", defaults.port)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            lookup_base_url: match std::env::var("LOOKUP_BASE_URL") {
                Ok(raw) => validate_base_url(&raw)?,
                Err(_) => defaults.lookup_base_url,
            },
            lookup_timeout_secs: parse_var("LOOKUP_TIMEOUT_SECS", defaults.lookup_timeout_secs)
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("LOOKUP_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            row_delay_ms: parse_var("ROW_DELAY_MS", defaults.row_delay_ms)?,
            dedup_cooldown_secs: parse_var("DEDUP_COOLDOWN_SECS", defaults.dedup_cooldown_secs)?,
            dedup_max_entries: parse_var("DEDUP_MAX_ENTRIES", defaults.dedup_max_entries)
                .and_then(|n| {
                    if n == 0 {
                        anyhow::bail!("DEDUP_MAX_ENTRIES must be greater than zero");
                    }
                    Ok(n)
                })?,
            output_dir: std::env::var("OUTPUT_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Lookup Base URL: {}", config.lookup_base_url);
        tracing::debug!(
            "Lookup timeout: {}s, row delay: {}ms",
            config.lookup_timeout_secs,
            config.row_delay_ms
        );
        tracing::debug!(
            "Dedup cooldown: {}s, capacity: {}",
            config.dedup_cooldown_secs,
            config.dedup_max_entries
        );
        tracing::debug!("Output directory: {}", config.output_dir.display());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }

    pub fn dedup_cooldown(&self) -> Duration {
        Duration::from_secs(self.dedup_cooldown_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, raw)),
        _ => Ok(default),
    }
}

fn validate_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("LOOKUP_BASE_URL cannot be empty");
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("LOOKUP_BASE_URL is not a valid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("LOOKUP_BASE_URL must start with http:// or https://");
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
