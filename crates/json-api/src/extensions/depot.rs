//! Depot helper extensions.

use std::any::Any;

use salvo::prelude::{Depot, StatusError};

use lectern_app::domain::{
    tenants::records::{TenantRecord, TenantUuid},
    users::UserUuid,
};

const TENANT_DEPOT_KEY: &str = "tenant";
const USER_DEPOT_KEY: &str = "user_uuid";

/// Helpers for mapping depot extraction failures to HTTP errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;

    fn insert_tenant(&mut self, tenant: TenantRecord);

    fn tenant(&self) -> Option<&TenantRecord>;

    /// The resolved tenant; central-domain requests have none.
    fn tenant_uuid_or_404(&self) -> Result<TenantUuid, StatusError>;

    fn insert_user_uuid(&mut self, user: UserUuid);

    fn user_uuid_or_401(&self) -> Result<UserUuid, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>()
            .map_err(|_ignored| StatusError::internal_server_error())
    }

    fn insert_tenant(&mut self, tenant: TenantRecord) {
        self.insert(TENANT_DEPOT_KEY, tenant);
    }

    fn tenant(&self) -> Option<&TenantRecord> {
        self.get::<TenantRecord>(TENANT_DEPOT_KEY).ok()
    }

    fn tenant_uuid_or_404(&self) -> Result<TenantUuid, StatusError> {
        self.tenant()
            .map(|tenant| tenant.uuid)
            .ok_or_else(|| StatusError::not_found().brief("Tenant not found"))
    }

    fn insert_user_uuid(&mut self, user: UserUuid) {
        self.insert(USER_DEPOT_KEY, user);
    }

    fn user_uuid_or_401(&self) -> Result<UserUuid, StatusError> {
        self.get::<UserUuid>(USER_DEPOT_KEY)
            .copied()
            .map_err(|_ignored| StatusError::unauthorized().brief("Missing user identity"))
    }
}
