//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BASKET_LIVE_URL` - Live-update socket URL (`ws://` or `wss://`)
//! - `BASKET_ORDER_API_URL` - Base URL of the order API
//!
//! ## Optional
//! - `BASKET_STORAGE_KEY` - Storage key for the cart blob (default: cart)
//! - `BASKET_TAX_RATE` - Default tax rate as a decimal fraction (default: 0.08)
//! - `BASKET_CURRENCY` - ISO 4217 currency for totals (default: USD)
//! - `BASKET_RECONNECT_BASE_MS` - First reconnect delay (default: 1000)
//! - `BASKET_RECONNECT_MAX_MS` - Reconnect delay ceiling (default: 30000)
//! - `BASKET_RECONNECT_MAX_ATTEMPTS` - Give up after this many failed attempts (default: unlimited)
//! - `BASKET_ORDER_API_TOKEN` - Bearer token for the order API
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::str::FromStr;
use std::time::Duration;

use basket_core::CurrencyCode;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::connection::ReconnectPolicy;

/// Default storage key for the cart blob.
pub const DEFAULT_STORAGE_KEY: &str = "cart";

/// Default tax rate (8%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Cart persistence and pricing
    pub cart: CartConfig,
    /// Live-update channel
    pub live: LiveConfig,
    /// Order API collaborator
    pub order_api: OrderApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Cart persistence and pricing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Storage key the cart blob is written under
    pub storage_key: String,
    /// Default tax rate applied by `tax()` and `total()`
    pub tax_rate: Decimal,
    /// Currency of all cart amounts
    pub currency: CurrencyCode,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            tax_rate: DEFAULT_TAX_RATE,
            currency: CurrencyCode::default(),
        }
    }
}

/// Live-update channel configuration.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Socket URL
    pub url: Url,
    /// Reconnect policy
    pub reconnect: ReconnectPolicy,
}

/// Order API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct OrderApiConfig {
    /// Base URL; endpoints are resolved relative to it
    pub base_url: Url,
    /// Bearer token, if the API requires one
    pub api_token: Option<SecretString>,
}

impl std::fmt::Debug for OrderApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let cart = CartConfig {
            storage_key: env.or_default("BASKET_STORAGE_KEY", DEFAULT_STORAGE_KEY),
            tax_rate: env.parsed_or("BASKET_TAX_RATE", DEFAULT_TAX_RATE)?,
            currency: env.parsed_or("BASKET_CURRENCY", CurrencyCode::default())?,
        };
        if cart.tax_rate.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "BASKET_TAX_RATE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let live = LiveConfig {
            url: env.url("BASKET_LIVE_URL")?,
            reconnect: ReconnectPolicy::exponential(
                Duration::from_millis(env.parsed_or("BASKET_RECONNECT_BASE_MS", 1000_u64)?),
                Duration::from_millis(env.parsed_or("BASKET_RECONNECT_MAX_MS", 30_000_u64)?),
            )
            .with_max_attempts(env.parsed_optional("BASKET_RECONNECT_MAX_ATTEMPTS")?),
        };

        let order_api = OrderApiConfig {
            base_url: env.url("BASKET_ORDER_API_URL")?,
            api_token: env.optional("BASKET_ORDER_API_TOKEN").map(SecretString::from),
        };

        Ok(Self {
            cart,
            live,
            order_api,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an optional variable.
    fn parsed_optional<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parsed_optional(key)?.unwrap_or(default))
    }

    /// Get a required variable as a URL.
    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        Url::parse(&self.required(key)?)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}
