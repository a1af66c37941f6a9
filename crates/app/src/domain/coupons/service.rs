//! Coupons service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        coupons::{
            CouponCache,
            errors::CouponsServiceError,
            evaluator::{self, CouponQuote},
            repository::PgCouponsRepository,
        },
        courses::{records::CourseUuid, repository::PgCoursesRepository},
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCouponsService {
    db: Db,
    cache: Arc<CouponCache>,
    coupons_repository: PgCouponsRepository,
    courses_repository: PgCoursesRepository,
}

impl PgCouponsService {
    #[must_use]
    pub fn new(db: Db, cache: Arc<CouponCache>) -> Self {
        Self {
            db,
            cache,
            coupons_repository: PgCouponsRepository::new(),
            courses_repository: PgCoursesRepository::new(),
        }
    }
}

#[async_trait]
impl CouponsService for PgCouponsService {
    async fn preview(
        &self,
        tenant: TenantUuid,
        course: CourseUuid,
        code: &str,
    ) -> Result<CouponQuote, CouponsServiceError> {
        let now = Timestamp::now();
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let course = self
            .courses_repository
            .find_course(&mut tx, course)
            .await?
            .ok_or(CouponsServiceError::CourseNotFound)?;

        let coupon = self
            .cache
            .fetch(&self.coupons_repository, &mut tx, tenant, code.trim(), now)
            .await?;

        tx.commit().await?;

        coupon
            .and_then(|coupon| evaluator::quote(&coupon, &course, now))
            .ok_or(CouponsServiceError::InvalidCoupon)
    }
}

#[automock]
#[async_trait]
pub trait CouponsService: Send + Sync {
    /// Price a course with a coupon without redeeming it.
    async fn preview(
        &self,
        tenant: TenantUuid,
        course: CourseUuid,
        code: &str,
    ) -> Result<CouponQuote, CouponsServiceError>;
}
