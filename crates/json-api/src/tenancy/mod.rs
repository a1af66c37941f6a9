//! Tenant resolution for inbound requests.

mod errors;
pub(crate) mod middleware;
