//! Payment gateway registry.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::domain::payments::{errors::GatewayError, gateway::PaymentGateway};

/// Upper bound on a whole gateway interaction when none is configured.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("default payment gateway {0} is not configured")]
    MissingDefault(String),
}

/// The configured payment gateways, by name.
#[derive(Clone)]
pub struct PaymentGateways {
    default: Arc<dyn PaymentGateway>,
    by_name: FxHashMap<&'static str, Arc<dyn PaymentGateway>>,
    timeout: Duration,
}

impl fmt::Debug for PaymentGateways {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.by_name.keys().copied().collect();
        names.sort_unstable();

        f.debug_struct("PaymentGateways")
            .field("default", &self.default.name())
            .field("gateways", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PaymentGateways {
    /// Build a registry whose default is the gateway named `default`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingDefault`] when no gateway has that name.
    pub fn new(
        gateways: Vec<Arc<dyn PaymentGateway>>,
        default: &str,
        timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let by_name: FxHashMap<&'static str, Arc<dyn PaymentGateway>> = gateways
            .into_iter()
            .map(|gateway| (gateway.name(), gateway))
            .collect();

        let default = by_name
            .get(default)
            .cloned()
            .ok_or_else(|| RegistryError::MissingDefault(default.to_string()))?;

        Ok(Self {
            default,
            by_name,
            timeout,
        })
    }

    /// Gateway used for new enrollments.
    #[must_use]
    pub fn default_gateway(&self) -> Arc<dyn PaymentGateway> {
        Arc::clone(&self.default)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn PaymentGateway>> {
        self.by_name.get(name).cloned()
    }

    /// Run a gateway interaction under the registry-wide timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Timeout`] when `call` does not finish in time, or the
    /// call's own error.
    pub async fn bounded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))?
    }
}
