//! Lectern Domain Concerns

pub(crate) mod amounts;
pub mod coupons;
pub mod courses;
pub mod enrollments;
pub mod events;
pub mod payments;
pub mod tenants;
pub mod users;
