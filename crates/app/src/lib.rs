//! Tenant-scoped enrollment and payment orchestration.

pub mod cache;
pub mod context;
pub mod database;
pub mod domain;

#[cfg(test)]
mod test;

mod uuids;

pub use uuids::TypedUuid;
