//! Application configuration loaded from environment variables.

use common::Money;
use domain::PricingPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — Postgres connection string; the in-memory store is
///   used when unset
/// - `TAX_RATE_BPS` — checkout tax rate in basis points (default: `1000`)
/// - `SHIPPING_FLAT_CENTS` — flat shipping fee in cents (default: `1000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub tax_rate_bps: u32,
    pub shipping_flat_cents: i64,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            tax_rate_bps: std::env::var("TAX_RATE_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            shipping_flat_cents: std::env::var("SHIPPING_FLAT_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the pricing policy configured for checkout.
    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy::new(self.tax_rate_bps, Money::from_cents(self.shipping_flat_cents))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            tax_rate_bps: 1000,
            shipping_flat_cents: 1000,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_default_pricing_matches_policy_default() {
        let pricing = Config::default().pricing();
        assert_eq!(pricing.tax_rate_bps, 1000);
        assert_eq!(pricing.shipping_flat, Money::from_dollars(10));
    }
}
