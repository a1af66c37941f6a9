//! Tenant Data

use jiff::Timestamp;

use crate::domain::tenants::records::TenantUuid;

/// New Tenant Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewTenant {
    /// UUID to assign to the tenant row.
    pub uuid: TenantUuid,

    /// Tenant id used for subdomain and header resolution.
    pub slug: String,

    /// Tenant name to persist.
    pub name: String,

    /// Contact address reported on inactive or expired responses.
    pub email: String,

    /// Fully qualified domains bound to the tenant.
    pub domains: Vec<String>,

    pub is_active: bool,

    pub subscription_ends_at: Option<Timestamp>,
}
