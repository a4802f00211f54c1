// =============================================================================
// Service Configuration: JSON file with per-field defaults + env credentials
// =============================================================================
//
// All tunables live in `AppConfig`, loaded once at startup. Every field carries
// a serde default so a missing or partial config file still yields a working
// service. Broker credentials are never part of the file: they come from the
// environment only and are redacted from `Debug` output.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::broker::TotpAlgorithm;

/// Upper bound on identifiers per quote call imposed by the broker.
pub const MAX_BATCH_SIZE: usize = 50;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_base_url() -> String {
    "https://apiconnect.angelone.in".to_string()
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_history_capacity() -> usize {
    100
}

fn default_historical_oi_delay_ms() -> u64 {
    500
}

// =============================================================================
// OI fallback mode
// =============================================================================

/// How to fill the net OI change of a futures record when no historical OI is
/// available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OiFallbackMode {
    /// Random ±5 % perturbation of current OI. Placeholder, not market data.
    #[default]
    Random,
    /// Report no change.
    Zero,
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP façade listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Broker API root, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Identifiers per quote call. Clamped to `1..=MAX_BATCH_SIZE`.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between consecutive quote batches; none follows the last one.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Timeout applied to every broker call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Points kept per history sequence.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Query the broker for the previous session's OI.
    #[serde(default)]
    pub historical_oi_enabled: bool,

    /// Pause before each historical OI call.
    #[serde(default = "default_historical_oi_delay_ms")]
    pub historical_oi_delay_ms: u64,

    #[serde(default)]
    pub oi_fallback: OiFallbackMode,

    /// Seed for the random OI fallback. Unseeded draws from OS entropy.
    #[serde(default)]
    pub oi_fallback_seed: Option<u64>,

    /// Attach PCR listing values to matching futures records.
    #[serde(default)]
    pub attach_pcr: bool,

    /// Background refresh period. Refresh is request-driven when unset.
    #[serde(default)]
    pub auto_refresh_secs: Option<u64>,

    #[serde(default)]
    pub totp_algorithm: TotpAlgorithm,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_url: default_base_url(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            history_capacity: default_history_capacity(),
            historical_oi_enabled: false,
            historical_oi_delay_ms: default_historical_oi_delay_ms(),
            oi_fallback: OiFallbackMode::default(),
            oi_fallback_seed: None,
            attach_pcr: false,
            auto_refresh_secs: None,
            totp_algorithm: TotpAlgorithm::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            base_url = %config.base_url,
            batch_size = config.batch_size,
            "config loaded"
        );

        Ok(config.normalised())
    }

    /// Apply environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("SENTIMETER_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
    }

    /// Clamp values the broker or the history store cannot accept.
    pub fn normalised(mut self) -> Self {
        self.batch_size = self.batch_size.clamp(1, MAX_BATCH_SIZE);
        self.history_capacity = self.history_capacity.max(1);
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn historical_oi_delay(&self) -> Duration {
        Duration::from_millis(self.historical_oi_delay_ms)
    }
}

// =============================================================================
// Broker credentials
// =============================================================================

/// Login material for the broker. Read from the environment only.
#[derive(Clone, Default)]
pub struct BrokerCredentials {
    pub api_key: String,
    pub client_code: String,
    pub password: String,
    /// Base32 TOTP shared secret.
    pub totp_secret: String,
}

impl BrokerCredentials {
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).unwrap_or_default().trim().to_string();
        Self {
            api_key: var("BROKER_API_KEY"),
            client_code: var("BROKER_CLIENT_CODE"),
            password: var("BROKER_PASSWORD"),
            totp_secret: var("BROKER_TOTP_SECRET"),
        }
    }

    /// Name of the first missing credential, if any.
    pub fn missing(&self) -> Option<&'static str> {
        [
            ("BROKER_API_KEY", &self.api_key),
            ("BROKER_CLIENT_CODE", &self.client_code),
            ("BROKER_PASSWORD", &self.password),
            ("BROKER_TOTP_SECRET", &self.totp_secret),
        ]
        .into_iter()
        .find(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
    }
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("api_key", &"<redacted>")
            .field("client_code", &"<redacted>")
            .field("password", &"<redacted>")
            .field("totp_secret", &"<redacted>")
            .finish()
    }
}
