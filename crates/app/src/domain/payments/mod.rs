//! Payments

pub mod errors;
pub mod fawry;
pub mod gateway;
pub mod paymob;
pub mod paytabs;
pub mod reference;
pub mod registry;
pub mod return_link;
pub mod service;

pub use errors::{CallbackError, GatewayError, PaymentsServiceError};
pub use gateway::*;
pub use registry::PaymentGateways;
pub use service::*;
