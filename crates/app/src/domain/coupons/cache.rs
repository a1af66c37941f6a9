//! Tenant-namespaced coupon cache.

use jiff::{SignedDuration, Timestamp};
use sqlx::{Postgres, Transaction};

use crate::{
    cache::TtlCache,
    domain::{
        coupons::{records::CouponRecord, repository::PgCouponsRepository},
        tenants::records::TenantUuid,
    },
};

/// Default lifetime of a cached coupon.
pub const DEFAULT_COUPON_CACHE_TTL: SignedDuration = SignedDuration::from_mins(5);

/// Coupon snapshots keyed by tenant and code.
///
/// Snapshots may lag behind `uses_count`; redemption is always re-checked by the
/// conditional increment in the database.
#[derive(Debug)]
pub struct CouponCache {
    entries: TtlCache<(TenantUuid, String), CouponRecord>,
}

impl Default for CouponCache {
    fn default() -> Self {
        Self::new(DEFAULT_COUPON_CACHE_TTL)
    }
}

impl CouponCache {
    #[must_use]
    pub fn new(ttl: SignedDuration) -> Self {
        Self {
            entries: TtlCache::new(ttl),
        }
    }

    /// Look a coupon up in the cache, then in the tenant's store.
    pub(crate) async fn fetch(
        &self,
        repository: &PgCouponsRepository,
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantUuid,
        code: &str,
        now: Timestamp,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        let key = (tenant, code.to_string());

        if let Some(coupon) = self.entries.get(&key, now).await {
            return Ok(Some(coupon));
        }

        let coupon = repository.find_by_code(tx, code).await?;

        if let Some(coupon) = &coupon {
            self.entries.insert(key, coupon.clone(), now).await;
        }

        Ok(coupon)
    }

    pub(crate) async fn invalidate(&self, tenant: TenantUuid, code: &str) {
        self.entries.invalidate(&(tenant, code.to_string())).await;
    }
}
