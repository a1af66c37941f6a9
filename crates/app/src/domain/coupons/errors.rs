//! Coupons service errors.

use sqlx::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CouponsServiceError {
    #[error("course not found")]
    CourseNotFound,

    /// Coupon is unknown, expired, exhausted, or not applicable to the course.
    #[error("invalid coupon")]
    InvalidCoupon,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CouponsServiceError {
    fn from(error: Error) -> Self {
        Self::Sql(error)
    }
}
