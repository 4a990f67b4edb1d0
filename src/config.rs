//! Configuration loading and management.
//!
//! Loads bot configuration from `./stratus.toml`, falling back to
//! `~/.stratus/stratus.toml` (`$STRATUS_CONFIG_PATH` overrides both).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

// ── Top-level config ────────────────────────────────────────────

/// Top-level bot configuration loaded from TOML.
///
/// Path: `./stratus.toml` or `$STRATUS_CONFIG_PATH`.
/// Env vars override file values; file values override defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Core runtime settings.
    pub core: CoreConfig,
    /// Filesystem paths for persistent state.
    pub paths: PathsConfig,
    /// Weather provider selection and display thresholds.
    pub weather: WeatherConfig,
    /// Telegram channel settings.
    pub telegram: TelegramConfig,
}

impl BotConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$STRATUS_CONFIG_PATH`, else `./stratus.toml`, else
    /// `~/.stratus/stratus.toml`. If no file exists, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: BotConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(BotConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    ///
    /// `$STRATUS_CONFIG_PATH` wins; otherwise `./stratus.toml` when present,
    /// then `~/.stratus/stratus.toml`.
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(p) = env("STRATUS_CONFIG_PATH") {
            return PathBuf::from(p);
        }
        let local = PathBuf::from("stratus.toml");
        if local.exists() {
            return local;
        }
        match home_config_path() {
            Some(home) if home.exists() => home,
            _ => local,
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Core.
        if let Some(v) = env("STRATUS_LOG_LEVEL") {
            self.core.log_level = v;
        }
        if let Some(v) = env("STRATUS_SHUTDOWN_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.core.shutdown_timeout_seconds = n,
                Err(_) => tracing::warn!(
                    var = "STRATUS_SHUTDOWN_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        // Paths.
        if let Some(v) = env("STRATUS_USERS_FILE") {
            self.paths.users_file = v;
        }
        if let Some(v) = env("STRATUS_LOGS_DIR") {
            self.paths.logs_dir = v;
        }

        // Weather provider.
        if let Some(v) = env("STRATUS_WX_PROVIDER") {
            self.weather.provider = v;
        }
        if let Some(v) = env("STRATUS_WX_API_KEY") {
            self.weather.api_key = v;
        }

        // Telegram.
        if let Some(v) = env("STRATUS_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
    }

    /// Parse a TOML string into config (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML does not parse.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: BotConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

/// Per-user config location (`~/.stratus/stratus.toml`).
fn home_config_path() -> Option<PathBuf> {
    let base = directories::BaseDirs::new()?;
    Some(base.home_dir().join(".stratus").join("stratus.toml"))
}

// ── Core config ─────────────────────────────────────────────────

/// Core runtime settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Tracing log level filter.
    pub log_level: String,
    /// Channel buffer size for adapter <-> engine mpsc.
    pub channel_buffer_size: usize,
    /// Graceful shutdown timeout in seconds.
    pub shutdown_timeout_seconds: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            channel_buffer_size: 100,
            shutdown_timeout_seconds: 30,
        }
    }
}

// ── Paths config ────────────────────────────────────────────────

/// Filesystem paths for persistent state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// User registry JSON path.
    pub users_file: String,
    /// Directory for rotated log files.
    pub logs_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            users_file: "users.json".to_string(),
            logs_dir: "logs".to_string(),
        }
    }
}

// ── Weather config ──────────────────────────────────────────────

/// Weather provider selection and display thresholds.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Active provider id: "weather.gov" or "weatherbit.io".
    pub provider: String,
    /// Provider API key, for providers that need one.
    pub api_key: String,
    /// Keywords that flag a forecast description as bad weather.
    pub bad_weather_words: Vec<String>,
    /// Highlight highs above this, degrees F.
    pub temp_hot: f64,
    /// Replacement hot threshold during summer months, degrees F.
    pub summer_temp_hot: f64,
    /// Highlight lows below this, degrees F.
    pub temp_cold: f64,
}

impl WeatherConfig {
    /// Hot threshold effective in a given month (1-12); June through
    /// September use the summer threshold.
    pub fn effective_temp_hot(&self, month: u32) -> f64 {
        if (6..=9).contains(&month) {
            self.summer_temp_hot
        } else {
            self.temp_hot
        }
    }
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("provider", &self.provider)
            .field("api_key", &"__REDACTED__")
            .field("bad_weather_words", &self.bad_weather_words)
            .field("temp_hot", &self.temp_hot)
            .field("summer_temp_hot", &self.summer_temp_hot)
            .field("temp_cold", &self.temp_cold)
            .finish()
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: "weather.gov".to_string(),
            api_key: String::new(),
            bad_weather_words: default_bad_weather_words(),
            temp_hot: 75.0,
            summer_temp_hot: 85.0,
            temp_cold: 50.0,
        }
    }
}

fn default_bad_weather_words() -> Vec<String> {
    [
        "thunderstorm",
        "thunderstorms",
        "hail",
        "tornado",
        "hurricane",
        "tropical storm",
        "blizzard",
        "freezing rain",
        "ice storm",
        "sleet",
        "snow",
        "flood",
        "flooding",
        "damaging winds",
        "dust storm",
        "dense fog",
        "smoke",
        "severe",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

// ── Telegram config ─────────────────────────────────────────────

/// Telegram channel configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Whether the Telegram channel is enabled.
    pub enabled: bool,
    /// Bot token; usually supplied via `STRATUS_TELEGRAM_BOT_TOKEN`.
    pub bot_token: Option<String>,
    /// Long-poll timeout in seconds.
    pub poll_timeout_seconds: u32,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("enabled", &self.enabled)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "__REDACTED__"))
            .field("poll_timeout_seconds", &self.poll_timeout_seconds)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            poll_timeout_seconds: 30,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
