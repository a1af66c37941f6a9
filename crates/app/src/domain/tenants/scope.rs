//! Per-task tenant scope.
//!
//! The active tenant is bound with a tokio task-local, so concurrent requests served
//! by the same worker threads never observe each other's tenant. Leaving the scope
//! (normally, through `?`, or by unwinding) always restores the previous binding.

use std::future::Future;

use thiserror::Error;

use crate::domain::tenants::records::TenantUuid;

tokio::task_local! {
    static ACTIVE_TENANT: TenantUuid;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TenantScopeError {
    /// A different tenant was requested while one is already bound.
    #[error("tenant {requested} requested while tenant {active} is active")]
    Mismatch {
        active: TenantUuid,
        requested: TenantUuid,
    },
}

/// The tenant bound to the current task, if any.
#[must_use]
pub fn active_tenant() -> Option<TenantUuid> {
    ACTIVE_TENANT.try_with(|tenant| *tenant).ok()
}

/// Run `future` with `tenant` bound as the active tenant.
///
/// Re-entering with the tenant already in scope runs `future` inside the existing
/// scope.
///
/// # Errors
///
/// Returns [`TenantScopeError::Mismatch`] without polling `future` when a different
/// tenant is already active.
pub async fn with_tenant<F>(tenant: TenantUuid, future: F) -> Result<F::Output, TenantScopeError>
where
    F: Future,
{
    match active_tenant() {
        Some(active) if active == tenant => Ok(future.await),
        Some(active) => Err(TenantScopeError::Mismatch {
            active,
            requested: tenant,
        }),
        None => Ok(ACTIVE_TENANT.scope(tenant, future).await),
    }
}

/// Check that `tenant` may be used from the current task.
///
/// Tasks without a bound tenant (CLI, background jobs) may use any tenant explicitly.
///
/// # Errors
///
/// Returns [`TenantScopeError::Mismatch`] when another tenant is active.
pub fn ensure_active(tenant: TenantUuid) -> Result<(), TenantScopeError> {
    match active_tenant() {
        Some(active) if active != tenant => Err(TenantScopeError::Mismatch {
            active,
            requested: tenant,
        }),
        _ => Ok(()),
    }
}
