//! Enrollments service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::{
    enrollments::records::{EnrollmentUuid, PaymentStatus},
    payments::errors::GatewayError,
};

#[derive(Debug, Error)]
pub enum EnrollmentsServiceError {
    #[error("user is already enrolled in this course")]
    AlreadyEnrolled,

    #[error("enrollment not found")]
    NotFound,

    #[error("course not found")]
    CourseNotFound,

    #[error("course is not open for enrollment")]
    CourseUnavailable,

    #[error("instructors cannot enroll in their own course")]
    SelfEnrollmentForbidden,

    #[error("invalid coupon")]
    InvalidCoupon,

    #[error("only the course instructor may do this")]
    Forbidden,

    #[error("cannot move enrollment from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The enrollment was stored and marked failed; the gateway refused a session.
    #[error("{gateway} could not open a payment session for enrollment {enrollment}")]
    PaymentSession {
        enrollment: EnrollmentUuid,
        gateway: String,
        #[source]
        source: GatewayError,
    },

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for EnrollmentsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyEnrolled,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
