//! Runtime Configuration
//!
//! All deployment-sensitive values come from environment variables; the
//! gateway secret in particular is never accepted on the command line and
//! never logged.
//!
//! # Environment Variables
//!
//! - `ACADPAY_GATEWAY_SECRET` (required): bearer secret for the provider's
//!   verification endpoint
//! - `ACADPAY_GATEWAY_URL`: verification API base (default
//!   `https://api.flutterwave.com/v3`)
//! - `ACADPAY_GATEWAY_TIMEOUT_SECS`: outbound call bound (default 15)
//! - `ACADPAY_CURRENCY`: operating currency (default `NGN`)
//! - `ACADPAY_AMOUNT_TOLERANCE_BPS`: permitted fee undershoot in basis
//!   points, at most 1000 (default 0)
//! - `ACADPAY_SUBSCRIPTION_VALIDITY_DAYS`: subscription grant window
//!   (default 30)
//! - `ACADPAY_HOST` / `ACADPAY_PORT`: bind address (default 127.0.0.1:3000)

use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::payment::orchestrator::ReconcilerConfig;

/// Largest tolerance the service will run with (10 %)
pub const MAX_TOLERANCE_BPS: u32 = 1000;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required secret environment variable
    #[error("ACADPAY_GATEWAY_SECRET environment variable not set")]
    MissingSecret,

    /// Gateway base URL did not parse
    #[error("invalid gateway URL: {0}")]
    InvalidUrl(String),

    /// A numeric setting did not parse
    #[error("invalid value for {name}: {value}")]
    InvalidNumber {
        /// Environment variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// Tolerance above [`MAX_TOLERANCE_BPS`]
    #[error("amount tolerance {0} bps exceeds the {MAX_TOLERANCE_BPS} bps maximum")]
    ToleranceTooLarge(u32),
}

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Outbound gateway settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Verification API base URL
    pub base_url: Url,
    /// Server-held bearer secret. Never logged.
    pub secret_key: String,
    /// Bound on each verification call
    pub timeout: Duration,
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Outbound gateway settings
    pub gateway: GatewayConfig,
    /// Single currency all payments must settle in
    pub operating_currency: String,
    /// Permitted fee undershoot in basis points
    pub tolerance_bps: u32,
    /// Subscription grant window in days
    pub subscription_validity_days: i64,
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] when the gateway secret is
    /// absent, and parse errors for malformed numeric or URL values.
    pub fn from_env() -> ConfigResult<Self> {
        let secret_key =
            env::var("ACADPAY_GATEWAY_SECRET").map_err(|_| ConfigError::MissingSecret)?;
        if secret_key.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        let base_url = env::var("ACADPAY_GATEWAY_URL")
            .unwrap_or_else(|_| "https://api.flutterwave.com/v3".to_string());
        let base_url = Url::parse(&base_url).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }

        let timeout_secs: u64 = parse_env("ACADPAY_GATEWAY_TIMEOUT_SECS", 15)?;
        let tolerance_bps: u32 = parse_env("ACADPAY_AMOUNT_TOLERANCE_BPS", 0)?;
        if tolerance_bps > MAX_TOLERANCE_BPS {
            return Err(ConfigError::ToleranceTooLarge(tolerance_bps));
        }
        let subscription_validity_days: i64 = parse_env("ACADPAY_SUBSCRIPTION_VALIDITY_DAYS", 30)?;
        let port: u16 = parse_env("ACADPAY_PORT", 3000)?;

        Ok(Self {
            gateway: GatewayConfig {
                base_url,
                secret_key,
                timeout: Duration::from_secs(timeout_secs),
            },
            operating_currency: env::var("ACADPAY_CURRENCY")
                .unwrap_or_else(|_| "NGN".to_string()),
            tolerance_bps,
            subscription_validity_days,
            host: env::var("ACADPAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
        })
    }

    /// Policy slice handed to the reconciler.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            operating_currency: self.operating_currency.clone(),
            tolerance_bps: self.tolerance_bps,
            subscription_validity_days: self.subscription_validity_days,
        }
    }

    /// Fixed configuration for tests; no environment access.
    pub fn test_config() -> Self {
        Self {
            gateway: GatewayConfig {
                base_url: Url::parse("https://api.gateway.test/v3").unwrap(),
                secret_key: "sk_test_secret".to_string(),
                timeout: Duration::from_secs(2),
            },
            operating_currency: "NGN".to_string(),
            tolerance_bps: 500,
            subscription_validity_days: 30,
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> ConfigResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-global, so everything env-related
    // lives in this single test.
    #[test]
    fn test_from_env_round_trip() {
        env::remove_var("ACADPAY_GATEWAY_SECRET");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::MissingSecret)
        ));

        env::set_var("ACADPAY_GATEWAY_SECRET", "sk_live_abc");
        env::set_var("ACADPAY_GATEWAY_URL", "https://api.gateway.test/v3");
        env::set_var("ACADPAY_AMOUNT_TOLERANCE_BPS", "500");
        env::set_var("ACADPAY_SUBSCRIPTION_VALIDITY_DAYS", "45");
        env::set_var("ACADPAY_PORT", "8080");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.gateway.secret_key, "sk_live_abc");
        assert_eq!(config.gateway.base_url.as_str(), "https://api.gateway.test/v3");
        assert_eq!(config.tolerance_bps, 500);
        assert_eq!(config.subscription_validity_days, 45);
        assert_eq!(config.port, 8080);
        assert_eq!(config.operating_currency, "NGN");

        env::set_var("ACADPAY_AMOUNT_TOLERANCE_BPS", "5000");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::ToleranceTooLarge(5000))
        ));

        env::set_var("ACADPAY_AMOUNT_TOLERANCE_BPS", "lots");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::InvalidNumber { .. })
        ));

        env::remove_var("ACADPAY_GATEWAY_SECRET");
        env::remove_var("ACADPAY_GATEWAY_URL");
        env::remove_var("ACADPAY_AMOUNT_TOLERANCE_BPS");
        env::remove_var("ACADPAY_SUBSCRIPTION_VALIDITY_DAYS");
        env::remove_var("ACADPAY_PORT");
    }

    #[test]
    fn test_reconciler_config_slice() {
        let config = AppConfig::test_config();
        let rc = config.reconciler_config();
        assert_eq!(rc.operating_currency, "NGN");
        assert_eq!(rc.tolerance_bps, 500);
        assert_eq!(rc.subscription_validity_days, 30);
    }
}
