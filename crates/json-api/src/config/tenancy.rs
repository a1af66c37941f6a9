//! Tenancy Config

use clap::Args;

/// Tenant resolution settings.
#[derive(Debug, Args)]
pub struct TenancyConfig {
    /// Hosts that serve the central application without a tenant
    #[arg(long, env = "CENTRAL_DOMAINS", value_delimiter = ',')]
    pub central_domains: Vec<String>,

    /// Header carrying an explicit tenant id
    #[arg(long, env = "TENANT_HEADER", default_value = "x-tenant-id")]
    pub tenant_header: String,

    /// How long resolved tenants are cached
    #[arg(long, env = "TENANT_CACHE_TTL_SECONDS", default_value_t = 3_600)]
    pub tenant_cache_ttl_seconds: u64,
}
