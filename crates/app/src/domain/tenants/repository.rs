//! Tenants Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as};

use crate::domain::tenants::{
    data::NewTenant,
    records::{TenantRecord, TenantUuid},
};

const CREATE_TENANT_SQL: &str = include_str!("sql/create_tenant.sql");
const CREATE_TENANT_DOMAIN_SQL: &str = include_str!("sql/create_tenant_domain.sql");
const FIND_TENANT_BY_DOMAIN_SQL: &str = include_str!("sql/find_tenant_by_domain.sql");
const FIND_TENANT_BY_SLUG_SQL: &str = include_str!("sql/find_tenant_by_slug.sql");

/// PostgreSQL-backed tenants repository.
///
/// Tenants live in central tables without row-level security, so queries run
/// straight against the pool.
#[derive(Debug, Clone)]
pub(crate) struct PgTenantsRepository {
    pool: PgPool,
}

impl PgTenantsRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) async fn create_tenant(
        &self,
        tenant: NewTenant,
    ) -> Result<TenantRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let created = query_as::<Postgres, TenantRecord>(CREATE_TENANT_SQL)
            .bind(tenant.uuid.into_uuid())
            .bind(tenant.slug.to_lowercase())
            .bind(tenant.name)
            .bind(tenant.email)
            .bind(tenant.is_active)
            .bind(tenant.subscription_ends_at.map(SqlxTimestamp::from))
            .fetch_one(&mut *tx)
            .await?;

        for domain in tenant.domains {
            query(CREATE_TENANT_DOMAIN_SQL)
                .bind(created.uuid.into_uuid())
                .bind(domain)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    pub(crate) async fn find_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<TenantRecord>, sqlx::Error> {
        query_as::<Postgres, TenantRecord>(FIND_TENANT_BY_DOMAIN_SQL)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
    }

    pub(crate) async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>, sqlx::Error> {
        query_as::<Postgres, TenantRecord>(FIND_TENANT_BY_SLUG_SQL)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for TenantRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: TenantUuid::from_uuid(row.try_get("uuid")?),
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            is_active: row.try_get("is_active")?,
            subscription_ends_at: row
                .try_get::<Option<SqlxTimestamp>, _>("subscription_ends_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
