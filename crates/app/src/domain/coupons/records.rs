//! Coupon Records

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{courses::records::CourseUuid, users::UserUuid},
    uuids::TypedUuid,
};

/// Coupon UUID
pub type CouponUuid = TypedUuid<CouponRecord>;

/// How a coupon's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a whole percentage of the amount.
    Percentage,

    /// `value` is an amount in minor units.
    Fixed,
}

impl CouponKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl fmt::Display for CouponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown coupon kind: {0}")]
pub struct UnknownCouponKind(String);

impl FromStr for CouponKind {
    type Err = UnknownCouponKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(UnknownCouponKind(other.to_string())),
        }
    }
}

/// Coupon Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponRecord {
    pub uuid: CouponUuid,
    pub code: String,
    pub kind: CouponKind,
    pub value: u64,
    pub min_amount: Option<u64>,
    pub max_uses: Option<u64>,
    pub uses_count: u64,
    pub is_active: bool,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,

    /// Course the coupon is limited to; `None` covers every course of the instructor.
    pub course_uuid: Option<CourseUuid>,

    pub instructor_uuid: UserUuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
