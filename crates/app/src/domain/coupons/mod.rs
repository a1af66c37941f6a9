//! Coupons

mod cache;
pub mod errors;
pub mod evaluator;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use cache::CouponCache;
pub use errors::CouponsServiceError;
pub use service::*;
