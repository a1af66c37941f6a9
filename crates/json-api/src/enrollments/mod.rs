//! Enrollment Handlers

pub(crate) mod enroll;
pub(crate) mod errors;
pub(crate) mod get;
pub(crate) mod refund;

use jiff::Timestamp;
use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lectern_app::domain::enrollments::records::EnrollmentRecord;

/// Enrollment Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct EnrollmentResponse {
    /// The unique identifier of the enrollment
    pub uuid: Uuid,

    /// The enrolled course
    pub course_uuid: Uuid,

    /// Course price in minor units at enrollment time
    pub price: u64,

    /// Amount due after discounts, in minor units
    pub paid_amount: u64,

    /// Gateway name, or `free`
    pub payment_method: String,

    /// One of `pending`, `completed`, `failed`, `refunded`
    pub payment_status: String,

    /// Provider payment reference
    pub transaction_id: Option<String>,

    /// Where the buyer pays while the enrollment is pending
    pub payment_url: Option<String>,

    /// The date and time payment completed
    pub completed_at: Option<String>,

    /// The date and time the enrollment was created
    pub created_at: String,
}

impl From<EnrollmentRecord> for EnrollmentResponse {
    fn from(enrollment: EnrollmentRecord) -> Self {
        Self {
            uuid: enrollment.uuid.into_uuid(),
            course_uuid: enrollment.course_uuid.into_uuid(),
            price: enrollment.price,
            paid_amount: enrollment.paid_amount,
            payment_method: enrollment.payment_method,
            payment_status: enrollment.payment_status.as_str().to_string(),
            transaction_id: enrollment.transaction_id,
            payment_url: enrollment.metadata.payment_url,
            completed_at: enrollment.completed_at.as_ref().map(Timestamp::to_string),
            created_at: enrollment.created_at.to_string(),
        }
    }
}
