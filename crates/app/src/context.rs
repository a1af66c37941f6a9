//! App Context

use std::{sync::Arc, time::Duration};

use jiff::SignedDuration;
use thiserror::Error;

use crate::{
    database::{self, Db},
    domain::{
        coupons::{CouponCache, CouponsService, PgCouponsService},
        enrollments::{EnrollmentsService, PgEnrollmentsService},
        events::BroadcastEventPublisher,
        payments::{
            GatewayError, PaymentGateway, PaymentGateways, PaymentsService, PgPaymentsService,
            fawry::{FawryConfig, FawryGateway},
            paymob::{PaymobConfig, PaymobGateway},
            paytabs::{PaytabsConfig, PaytabsGateway},
            registry::RegistryError,
        },
        tenants::{PgTenantsService, TenantsService, resolver::TenantResolver},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to build payment gateway")]
    Gateway(#[source] GatewayError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Provider settings; gateways without settings are not offered.
#[derive(Debug, Clone)]
pub struct GatewaysConfig {
    /// Gateway new enrollments pay through.
    pub default: String,

    /// Upper bound on a whole provider interaction.
    pub timeout: Duration,

    pub fawry: Option<FawryConfig>,
    pub paymob: Option<PaymobConfig>,
    pub paytabs: Option<PaytabsConfig>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,

    /// Hosts served without a tenant.
    pub central_domains: Vec<String>,

    pub tenant_cache_ttl: SignedDuration,
    pub coupon_cache_ttl: SignedDuration,
    pub gateways: GatewaysConfig,
}

#[derive(Clone)]
pub struct AppContext {
    pub tenants: Arc<dyn TenantsService>,
    pub resolver: Arc<TenantResolver>,
    pub coupons: Arc<dyn CouponsService>,
    pub enrollments: Arc<dyn EnrollmentsService>,
    pub payments: Arc<dyn PaymentsService>,
    pub events: BroadcastEventPublisher,
}

impl AppContext {
    /// Connect to the database and wire up every service.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting fails, the database role bypasses row-level
    /// security, or the payment gateways are misconfigured.
    pub async fn from_config(config: AppConfig) -> Result<Self, AppInitError> {
        let gateways = Arc::new(build_gateways(config.gateways)?);

        let pool = database::connect(&config.database_url)
            .await
            .map_err(AppInitError::Database)?;

        database::ensure_rls_enforced_role(&pool)
            .await
            .map_err(AppInitError::Database)?;

        let db = Db::new(pool.clone());
        let tenants: Arc<dyn TenantsService> = Arc::new(PgTenantsService::new(pool));
        let coupon_cache = Arc::new(CouponCache::new(config.coupon_cache_ttl));
        let events = BroadcastEventPublisher::default();

        Ok(Self {
            resolver: Arc::new(TenantResolver::new(
                Arc::clone(&tenants),
                config.central_domains,
                config.tenant_cache_ttl,
            )),
            tenants,
            coupons: Arc::new(PgCouponsService::new(db.clone(), Arc::clone(&coupon_cache))),
            enrollments: Arc::new(PgEnrollmentsService::new(
                db.clone(),
                coupon_cache,
                Arc::clone(&gateways),
                Arc::new(events.clone()),
            )),
            payments: Arc::new(PgPaymentsService::new(
                db,
                gateways,
                Arc::new(events.clone()),
            )),
            events,
        })
    }
}

/// Build the registry from whichever providers are configured.
///
/// # Errors
///
/// Returns an error when a provider's HTTP client cannot be built or the default
/// gateway is not configured.
pub fn build_gateways(config: GatewaysConfig) -> Result<PaymentGateways, AppInitError> {
    let mut gateways: Vec<Arc<dyn PaymentGateway>> = Vec::new();

    if let Some(fawry) = config.fawry {
        gateways.push(Arc::new(FawryGateway::new(fawry).map_err(AppInitError::Gateway)?));
    }

    if let Some(paymob) = config.paymob {
        gateways.push(Arc::new(PaymobGateway::new(paymob).map_err(AppInitError::Gateway)?));
    }

    if let Some(paytabs) = config.paytabs {
        gateways.push(Arc::new(PaytabsGateway::new(paytabs).map_err(AppInitError::Gateway)?));
    }

    Ok(PaymentGateways::new(gateways, &config.default, config.timeout)?)
}
