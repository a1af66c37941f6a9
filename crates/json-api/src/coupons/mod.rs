//! Coupon Handlers

pub(crate) mod apply;
mod errors;
