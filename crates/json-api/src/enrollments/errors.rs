//! Errors

use salvo::http::StatusError;
use tracing::error;

use lectern_app::domain::enrollments::EnrollmentsServiceError;

pub(crate) fn into_status_error(error: EnrollmentsServiceError) -> StatusError {
    match error {
        EnrollmentsServiceError::AlreadyEnrolled => {
            StatusError::conflict().brief("Already enrolled in this course")
        }
        EnrollmentsServiceError::NotFound => StatusError::not_found().brief("Enrollment not found"),
        EnrollmentsServiceError::CourseNotFound => {
            StatusError::not_found().brief("Course not found")
        }
        EnrollmentsServiceError::CourseUnavailable => {
            StatusError::unprocessable_entity().brief("Course is not open for enrollment")
        }
        EnrollmentsServiceError::SelfEnrollmentForbidden => {
            StatusError::unprocessable_entity().brief("Instructors cannot enroll in their own course")
        }
        EnrollmentsServiceError::InvalidCoupon => {
            StatusError::unprocessable_entity().brief("Invalid or expired coupon")
        }
        EnrollmentsServiceError::Forbidden => {
            StatusError::forbidden().brief("Only the course instructor may do this")
        }
        EnrollmentsServiceError::InvalidTransition { from, to } => {
            StatusError::conflict().brief(format!("Cannot move enrollment from {from} to {to}"))
        }
        EnrollmentsServiceError::PaymentSession {
            enrollment,
            gateway,
            source,
        } => {
            error!(%enrollment, gateway = %gateway, "payment session failed: {source}");

            StatusError::bad_gateway()
                .brief(format!("{gateway} could not open a payment session"))
                .detail(format!("enrollment_uuid={enrollment} gateway={gateway}"))
        }
        EnrollmentsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid enrollment payload")
        }
        EnrollmentsServiceError::Sql(source) => {
            error!("enrollment storage failed: {source}");

            StatusError::internal_server_error()
        }
    }
}
