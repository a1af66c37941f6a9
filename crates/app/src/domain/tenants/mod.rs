//! Tenants

pub mod data;
pub mod errors;
pub mod records;
mod repository;
pub mod resolver;
pub mod scope;
pub mod service;

pub use errors::TenantsServiceError;
pub use service::*;
