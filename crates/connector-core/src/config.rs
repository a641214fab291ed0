//! Connector configuration loading and validation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::address::validate_prefix;
use crate::error::CoreError;

/// Full configuration for a connector.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectorConfig {
    /// Quoting and forwarding parameters.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Peer accounts known to this connector.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    /// Static routes (prefix -> next hop).
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Asset-code rates against a common base, used by the static backend.
    #[serde(default)]
    pub rates: BTreeMap<String, Decimal>,

    /// Liquidity curves advertised by peers for destinations beyond them.
    #[serde(default)]
    pub remote_curves: Vec<RemoteCurveConfig>,
}

/// Which rate backend supplies local exchange rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    /// Same-asset rate adjusted only for scale and spread.
    OneToOne,
    /// Fixed per-asset rates from the `[rates]` table.
    Static,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one-to-one"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// The read-only parameters the route builder consults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Rate backend selection.
    #[serde(default = "default_backend")]
    pub backend: BackendType,
    /// Fraction subtracted from every rate, in `[0, 1)`.
    #[serde(default)]
    pub spread: Decimal,
    /// Allow routing a payment back to the account it came from.
    #[serde(default = "default_true")]
    pub reflect_payments: bool,
    /// How long an issued quote stays valid (ms).
    #[serde(default = "default_quote_expiry_ms")]
    pub quote_expiry_ms: u64,
    /// Minimum time this connector needs to react before its own
    /// commitment upstream expires (ms).
    #[serde(default = "default_min_message_window_ms")]
    pub min_message_window_ms: u64,
    /// Longest time a forwarded packet may be held (ms).
    #[serde(default = "default_max_hold_time_ms")]
    pub max_hold_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    pub asset_code: String,
    pub asset_scale: u8,
    /// Whether the account's plugin is considered connected at startup.
    #[serde(default = "default_true")]
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub prefix: String,
    pub next_hop: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCurveConfig {
    pub next_hop: String,
    /// Address prefix the curve is valid for.
    pub prefix: String,
    /// `[input, output]` breakpoints.
    pub points: Vec<[Decimal; 2]>,
    #[serde(default = "default_min_message_window_ms")]
    pub min_message_window_ms: u64,
    /// Lifetime of the advertised curve from load time (ms).
    #[serde(default = "default_quote_expiry_ms")]
    pub ttl_ms: u64,
}

// Default value functions
fn default_backend() -> BackendType {
    BackendType::OneToOne
}
fn default_true() -> bool {
    true
}
fn default_quote_expiry_ms() -> u64 {
    45_000
}
fn default_min_message_window_ms() -> u64 {
    1_000
}
fn default_max_hold_time_ms() -> u64 {
    30_000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

fn millis(ms: u64) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            spread: Decimal::ZERO,
            reflect_payments: true,
            quote_expiry_ms: default_quote_expiry_ms(),
            min_message_window_ms: default_min_message_window_ms(),
            max_hold_time_ms: default_max_hold_time_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl RoutingConfig {
    pub fn quote_expiry(&self) -> chrono::Duration {
        millis(self.quote_expiry_ms)
    }

    pub fn min_message_window(&self) -> chrono::Duration {
        millis(self.min_message_window_ms)
    }

    pub fn max_hold_time(&self) -> chrono::Duration {
        millis(self.max_hold_time_ms)
    }

    /// True when the backend is the one-to-one backend with zero spread,
    /// i.e. rates are exact powers of ten.
    pub fn is_trivial_rate(&self) -> bool {
        self.backend == BackendType::OneToOne && self.spread.is_zero()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.spread.is_sign_negative() || self.spread >= Decimal::ONE {
            return Err(CoreError::InvalidConfig(format!(
                "spread must be in [0, 1), got {}",
                self.spread
            )));
        }
        if self.quote_expiry_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "quote_expiry_ms must be greater than zero".into(),
            ));
        }
        if self.min_message_window_ms > self.max_hold_time_ms {
            return Err(CoreError::InvalidConfig(format!(
                "min_message_window_ms ({}) exceeds max_hold_time_ms ({})",
                self.min_message_window_ms, self.max_hold_time_ms
            )));
        }
        for (name, ms) in [
            ("quote_expiry_ms", self.quote_expiry_ms),
            ("min_message_window_ms", self.min_message_window_ms),
            ("max_hold_time_ms", self.max_hold_time_ms),
        ] {
            if i64::try_from(ms).is_err() {
                return Err(CoreError::InvalidConfig(format!("{} out of range: {}", name, ms)));
            }
        }
        Ok(())
    }
}

impl ConnectorConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(
            path = %path.display(),
            accounts = config.accounts.len(),
            routes = config.routes.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, CoreError> {
        let config: ConnectorConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check cross-references between sections.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.routing.validate()?;

        let mut ids = HashSet::new();
        for account in &self.accounts {
            if account.id.is_empty() {
                return Err(CoreError::InvalidConfig("account id is empty".into()));
            }
            if !ids.insert(account.id.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "duplicate account id: {}",
                    account.id
                )));
            }
        }

        for route in &self.routes {
            validate_prefix(&route.prefix)?;
            if !ids.contains(route.next_hop.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "route {} points to unknown account {}",
                    route.prefix, route.next_hop
                )));
            }
        }

        for (code, rate) in &self.rates {
            if *rate <= Decimal::ZERO {
                return Err(CoreError::InvalidConfig(format!(
                    "rate for {} must be positive, got {}",
                    code, rate
                )));
            }
        }

        for curve in &self.remote_curves {
            validate_prefix(&curve.prefix)?;
            if !ids.contains(curve.next_hop.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "remote curve for {} points to unknown account {}",
                    curve.prefix, curve.next_hop
                )));
            }
            if curve.points.is_empty() {
                return Err(CoreError::InvalidConfig(format!(
                    "remote curve for {} has no points",
                    curve.prefix
                )));
            }
        }

        Ok(())
    }
}
