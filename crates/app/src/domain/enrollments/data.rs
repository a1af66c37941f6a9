//! Enrollment Data

use crate::domain::{
    courses::records::CourseUuid,
    enrollments::records::{EnrollmentMetadata, EnrollmentRecord, EnrollmentUuid, PaymentStatus},
    payments::gateway::CustomerDetails,
    users::UserUuid,
};

/// A request to enroll a user in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRequest {
    pub user: UserUuid,
    pub course: CourseUuid,
    pub coupon_code: Option<String>,
    pub customer: CustomerDetails,
}

/// Outcome of a successful enrollment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentResult {
    pub enrollment: EnrollmentRecord,

    /// Where the buyer pays; `None` for free enrollments.
    pub payment_url: Option<String>,

    pub reference: Option<String>,

    /// Gateway handling payment; `None` for free enrollments.
    pub gateway: Option<String>,
}

/// A request to refund a completed enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub enrollment: EnrollmentUuid,

    /// Must be the course instructor.
    pub requested_by: UserUuid,

    pub reason: Option<String>,
}

/// Row to insert for a new enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewEnrollment {
    pub uuid: EnrollmentUuid,
    pub user_uuid: UserUuid,
    pub course_uuid: CourseUuid,
    pub price: u64,
    pub paid_amount: u64,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub metadata: EnrollmentMetadata,
}
