use clap::Args;
use jiff::Timestamp;
use lectern_app::{
    database,
    domain::tenants::{PgTenantsService, TenantsService, data::NewTenant, records::TenantUuid},
};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct CreateTenantArgs {
    /// Tenant id used in subdomains and the X-Tenant header
    #[arg(long)]
    slug: String,

    /// Tenant display name
    #[arg(long)]
    name: String,

    /// Support address shown when the tenant is unavailable
    #[arg(long)]
    email: String,

    /// Domain bound to the tenant; repeat for several
    #[arg(long = "domain")]
    domains: Vec<String>,

    /// Subscription end (RFC 3339); unlimited when omitted
    #[arg(long)]
    subscription_ends_at: Option<Timestamp>,

    /// Create the tenant disabled
    #[arg(long)]
    inactive: bool,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Optional tenant UUID; generated when omitted
    #[arg(long)]
    tenant_uuid: Option<Uuid>,
}

pub(crate) async fn run(args: CreateTenantArgs) -> Result<(), String> {
    let slug = args.slug.trim().to_lowercase();

    if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("slug must be non-empty and contain only letters, digits and '-'".to_string());
    }

    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let tenant = PgTenantsService::new(pool)
        .create_tenant(NewTenant {
            uuid: args
                .tenant_uuid
                .map_or_else(TenantUuid::new, TenantUuid::from_uuid),
            slug,
            name: args.name,
            email: args.email,
            domains: args.domains,
            is_active: !args.inactive,
            subscription_ends_at: args.subscription_ends_at,
        })
        .await
        .map_err(|error| format!("failed to create tenant: {error}"))?;

    println!("tenant_uuid: {}", tenant.uuid);
    println!("tenant_slug: {}", tenant.slug);
    println!("tenant_name: {}", tenant.name);
    if let Some(ends_at) = tenant.subscription_ends_at {
        println!("subscription_ends_at: {ends_at}");
    }

    Ok(())
}
