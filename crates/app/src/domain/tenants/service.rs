//! Tenants service.

use async_trait::async_trait;
use mockall::automock;
use sqlx::PgPool;

use crate::domain::tenants::{
    data::NewTenant, errors::TenantsServiceError, records::TenantRecord,
    repository::PgTenantsRepository,
};

#[derive(Debug, Clone)]
pub struct PgTenantsService {
    repository: PgTenantsRepository,
}

impl PgTenantsService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: PgTenantsRepository::new(pool),
        }
    }
}

#[async_trait]
impl TenantsService for PgTenantsService {
    async fn create_tenant(&self, tenant: NewTenant) -> Result<TenantRecord, TenantsServiceError> {
        self.repository
            .create_tenant(tenant)
            .await
            .map_err(Into::into)
    }

    async fn find_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<TenantRecord>, TenantsServiceError> {
        self.repository
            .find_by_domain(domain)
            .await
            .map_err(Into::into)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>, TenantsServiceError> {
        self.repository
            .find_by_slug(slug)
            .await
            .map_err(Into::into)
    }
}

#[automock]
#[async_trait]
/// Tenant lookup and provisioning.
pub trait TenantsService: Send + Sync {
    /// Creates a new tenant along with its bound domains.
    async fn create_tenant(&self, tenant: NewTenant) -> Result<TenantRecord, TenantsServiceError>;

    /// Finds the tenant owning an exact domain.
    async fn find_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<TenantRecord>, TenantsServiceError>;

    /// Finds a tenant by its slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>, TenantsServiceError>;
}
