//! # Client Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COMPTOIR_API_URL=https://api.boutique.mg/api                       │
//! │     COMPTOIR_STORE_PATH=/var/lib/comptoir/session.db                   │
//! │     COMPTOIR_TIMEOUT_SECS=20                                           │
//! │     COMPTOIR_CURRENCY=MGA                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/comptoir/comptoir.toml (Linux)                           │
//! │     ~/Library/Application Support/mg.comptoir.comptoir/… (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://api.boutique.mg/api"
//! timeout_secs = 15
//!
//! [store]
//! path = "/var/lib/comptoir/session.db"
//! in_memory = false
//!
//! [currency]
//! code = "MGA"
//! symbol = "Ar"
//! decimals = 0
//!
//! [sale]
//! default_payment_method = "cash"
//! default_payment_condition = "comptant"
//! products_per_page = 20
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use comptoir_core::{Cart, Money, PaymentMethod, SaleDraft};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// API Settings
// =============================================================================

/// REST backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout.
    /// Default: 15 seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP connect timeout.
    /// Default: 5 seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ApiSettings {
    /// Settings pointing at `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiSettings {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Where the session is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Session database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Keep the session in memory only (nothing survives a restart).
    #[serde(default)]
    pub in_memory: bool,
}

// =============================================================================
// Currency Settings
// =============================================================================

/// How amounts are displayed. Amounts themselves are always minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySettings {
    /// ISO 4217 code.
    #[serde(default = "default_currency_code")]
    pub code: String,

    /// Symbol printed after the amount.
    #[serde(default = "default_currency_symbol")]
    pub symbol: String,

    /// Minor-unit decimals (0 for MGA, 2 for EUR).
    #[serde(default)]
    pub decimals: u32,
}

fn default_currency_code() -> String {
    "MGA".to_string()
}

fn default_currency_symbol() -> String {
    "Ar".to_string()
}

impl Default for CurrencySettings {
    fn default() -> Self {
        CurrencySettings {
            code: default_currency_code(),
            symbol: default_currency_symbol(),
            decimals: 0,
        }
    }
}

impl CurrencySettings {
    /// Settings for a known currency code; unknown codes show the code itself.
    pub fn for_code(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        let (symbol, decimals) = match code.as_str() {
            "MGA" => ("Ar", 0),
            "EUR" => ("€", 2),
            "USD" => ("$", 2),
            "XOF" | "XAF" => ("FCFA", 0),
            _ => (code.as_str(), 2),
        };
        CurrencySettings {
            symbol: symbol.to_string(),
            code,
            decimals,
        }
    }

    /// Formats an amount with space-grouped thousands.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_client::config::CurrencySettings;
    /// use comptoir_core::Money;
    ///
    /// let mga = CurrencySettings::default();
    /// assert_eq!(mga.format(Money::from_minor(1_250_000)), "1 250 000 Ar");
    ///
    /// let eur = CurrencySettings::for_code("EUR");
    /// assert_eq!(eur.format(Money::from_minor(123_456)), "1 234,56 €");
    /// ```
    pub fn format(&self, amount: Money) -> String {
        let minor = amount.minor();
        let sign = if minor < 0 { "-" } else { "" };
        let abs = minor.unsigned_abs();
        let scale = 10u64.pow(self.decimals);
        let whole = group_thousands(abs / scale);

        if self.decimals == 0 {
            format!("{}{} {}", sign, whole, self.symbol)
        } else {
            format!(
                "{}{},{:0width$} {}",
                sign,
                whole,
                abs % scale,
                self.symbol,
                width = self.decimals as usize
            )
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Sale Settings
// =============================================================================

/// Defaults applied to new sale drafts and list screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSettings {
    #[serde(default)]
    pub default_payment_method: PaymentMethod,

    #[serde(default = "default_payment_condition")]
    pub default_payment_condition: String,

    #[serde(default = "default_products_per_page")]
    pub products_per_page: usize,
}

fn default_payment_condition() -> String {
    "comptant".to_string()
}

fn default_products_per_page() -> usize {
    20
}

impl Default for SaleSettings {
    fn default() -> Self {
        SaleSettings {
            default_payment_method: PaymentMethod::default(),
            default_payment_condition: default_payment_condition(),
            products_per_page: default_products_per_page(),
        }
    }
}

impl SaleSettings {
    /// Starts a draft with the configured payment method and condition.
    pub fn new_draft(&self, items: Cart) -> SaleDraft {
        SaleDraft {
            payment_method: self.default_payment_method,
            payment_condition: self.default_payment_condition.clone(),
            ..SaleDraft::new(items)
        }
    }
}

// =============================================================================
// Client Config
// =============================================================================

/// Full client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub currency: CurrencySettings,

    #[serde(default)]
    pub sale: SaleSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (comptoir.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| ClientError::Config(format!("Invalid API URL '{}': {}", self.api.base_url, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ClientError::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.sale.products_per_page == 0 {
            return Err(ClientError::Config(
                "products_per_page must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `COMPTOIR_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("COMPTOIR_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(path) = lookup("COMPTOIR_STORE_PATH") {
            debug!(path = %path, "Overriding store path from environment");
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(timeout) = lookup("COMPTOIR_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric COMPTOIR_TIMEOUT_SECS"),
            }
        }

        if let Some(code) = lookup("COMPTOIR_CURRENCY") {
            debug!(currency = %code, "Overriding currency from environment");
            self.currency = CurrencySettings::for_code(&code);
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("mg", "comptoir", "comptoir")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("comptoir.toml"))
    }

    /// Resolves the session database path.
    pub fn store_path(&self) -> ClientResult<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join("session.db"))
            .ok_or_else(|| ClientError::Config("Could not determine app data directory".into()))
    }
}
