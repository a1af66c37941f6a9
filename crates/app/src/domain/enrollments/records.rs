//! Enrollment Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{courses::records::CourseUuid, tenants::records::TenantUuid, users::UserUuid},
    uuids::TypedUuid,
};

/// Enrollment UUID
pub type EnrollmentUuid = TypedUuid<EnrollmentRecord>;

/// Payment method recorded for enrollments that cost nothing.
pub const FREE_PAYMENT_METHOD: &str = "free";

/// Payment lifecycle of an enrollment.
///
/// Transitions only move forward: `pending -> completed`, `pending -> failed`,
/// `completed -> refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed | Self::Failed) | (Self::Completed, Self::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown payment status: {0}")]
pub struct UnknownPaymentStatus(String);

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(UnknownPaymentStatus(other.to_string())),
        }
    }
}

/// Audit details stored alongside an enrollment.
///
/// Updates are merged into the stored document key by key, so unset fields leave
/// existing values untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantUuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_created_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Enrollment Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRecord {
    pub uuid: EnrollmentUuid,
    pub user_uuid: UserUuid,
    pub course_uuid: CourseUuid,

    /// Listed course price at enrollment time.
    pub price: u64,

    /// Amount charged after discounts; never more than `price`.
    pub paid_amount: u64,

    /// Gateway name, or `free`.
    pub payment_method: String,

    pub payment_status: PaymentStatus,

    /// Gateway reference, once a session was opened.
    pub transaction_id: Option<String>,

    pub enrolled_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub metadata: EnrollmentMetadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
