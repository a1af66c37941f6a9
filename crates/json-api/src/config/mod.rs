//! Server configuration module

use clap::Parser;
use jiff::SignedDuration;
use lectern_app::context::AppConfig;

use crate::config::{
    db::DatabaseConfig, observability::LoggingConfig, payments::PaymentsConfig,
    server::ServerRuntimeConfig, tenancy::TenancyConfig,
};

pub(crate) mod db;
pub(crate) mod observability;
pub(crate) mod payments;
pub(crate) mod server;
pub(crate) mod tenancy;

/// Lectern JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "lectern-json", about = "Lectern JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Tenant resolution settings.
    #[command(flatten)]
    pub tenancy: TenancyConfig,

    /// Payment gateway settings.
    #[command(flatten)]
    pub payments: PaymentsConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }

    /// Settings for the application services.
    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database.database_url.clone(),
            central_domains: self.tenancy.central_domains.clone(),
            tenant_cache_ttl: seconds(self.tenancy.tenant_cache_ttl_seconds),
            coupon_cache_ttl: seconds(self.payments.coupon_cache_ttl_seconds),
            gateways: self.payments.gateways_config(),
        }
    }
}

fn seconds(value: u64) -> SignedDuration {
    SignedDuration::from_secs(i64::try_from(value).unwrap_or(i64::MAX))
}
