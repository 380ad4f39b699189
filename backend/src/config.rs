//! Configuration management for the Equipment Inventory Management server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with EIM_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Bootstrap administrator account
    pub admin: AdminConfig,

    /// Inventory business rules
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens and hashing refresh tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Created on first start when no users exist
    pub email: String,
    /// No bootstrap account is created while unset
    pub password: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Loan length used when a demo has no expected return date
    pub demo_default_days: i64,

    /// Active units per category at or below which a category is low on stock
    pub low_stock_threshold: i64,

    /// Tax rate applied to invoices when none is given (fraction)
    pub default_tax_rate: Decimal,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("EIM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("admin.email", "admin@example.com")?
            .set_default("admin.name", "Administrator")?
            .set_default("inventory.demo_default_days", 14)?
            .set_default("inventory.low_stock_threshold", 2)?
            .set_default("inventory.default_tax_rate", "0.07")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (EIM prefix)
            .add_source(
                Environment::with_prefix("EIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            demo_default_days: 14,
            low_stock_threshold: 2,
            default_tax_rate: Decimal::new(7, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_defaults() {
        let cfg = InventoryConfig::default();
        assert_eq!(cfg.demo_default_days, 14);
        assert_eq!(cfg.default_tax_rate.to_string(), "0.07");
    }
}
