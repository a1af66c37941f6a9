//! Coupon evaluation.
//!
//! Pure functions over a coupon snapshot; nothing here touches storage.

use jiff::Timestamp;
use serde::Serialize;

use crate::domain::{
    coupons::records::{CouponKind, CouponRecord},
    courses::records::CourseRecord,
};

/// Price breakdown after applying a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponQuote {
    pub code: String,
    pub original_price: u64,
    pub discount_amount: u64,
    pub final_price: u64,
}

/// Whether the coupon can be redeemed at `now`, independent of any course.
#[must_use]
pub fn is_valid(coupon: &CouponRecord, now: Timestamp) -> bool {
    coupon.is_active
        && coupon.starts_at.is_none_or(|starts_at| starts_at <= now)
        && coupon.expires_at.is_none_or(|expires_at| expires_at >= now)
        && coupon
            .max_uses
            .is_none_or(|max_uses| coupon.uses_count < max_uses)
}

/// Whether the coupon can be redeemed against `course` for `amount` at `now`.
///
/// Coupons without a course apply to every course taught by the coupon's instructor.
#[must_use]
pub fn applies_to(
    coupon: &CouponRecord,
    course: &CourseRecord,
    amount: u64,
    now: Timestamp,
) -> bool {
    let course_matches = match coupon.course_uuid {
        Some(scoped) => scoped == course.uuid,
        None => coupon.instructor_uuid == course.instructor_uuid,
    };

    is_valid(coupon, now)
        && course_matches
        && coupon.min_amount.is_none_or(|min_amount| amount >= min_amount)
}

/// Discount granted on `amount`, always within `0..=amount`.
#[must_use]
pub fn discount(coupon: &CouponRecord, amount: u64) -> u64 {
    let raw = match coupon.kind {
        CouponKind::Percentage => {
            let scaled = u128::from(amount) * u128::from(coupon.value) / 100;

            u64::try_from(scaled).unwrap_or(u64::MAX)
        }
        CouponKind::Fixed => coupon.value,
    };

    raw.min(amount)
}

/// Quote `course` with `coupon`, or `None` when it does not apply.
#[must_use]
pub fn quote(coupon: &CouponRecord, course: &CourseRecord, now: Timestamp) -> Option<CouponQuote> {
    if !applies_to(coupon, course, course.price, now) {
        return None;
    }

    let discount_amount = discount(coupon, course.price);

    Some(CouponQuote {
        code: coupon.code.clone(),
        original_price: course.price,
        discount_amount,
        final_price: course.price.saturating_sub(discount_amount),
    })
}
