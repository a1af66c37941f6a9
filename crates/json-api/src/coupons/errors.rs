//! Errors

use salvo::http::StatusError;
use tracing::error;

use lectern_app::domain::coupons::CouponsServiceError;

pub(crate) fn into_status_error(error: CouponsServiceError) -> StatusError {
    match error {
        CouponsServiceError::CourseNotFound => StatusError::not_found().brief("Course not found"),
        CouponsServiceError::InvalidCoupon => {
            StatusError::unprocessable_entity().brief("Invalid or expired coupon")
        }
        CouponsServiceError::Sql(source) => {
            error!("failed to price coupon: {source}");

            StatusError::internal_server_error()
        }
    }
}
