//! Tenant resolution for inbound requests.

use std::{fmt, sync::Arc};

use jiff::{SignedDuration, Timestamp};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cache::TtlCache,
    domain::tenants::{TenantsService, TenantsServiceError, records::TenantRecord},
};

/// Subdomain labels that never name a tenant.
pub const RESERVED_LABELS: [&str; 3] = ["www", "api", "central"];

/// Default lifetime of a cached lookup.
pub const DEFAULT_CACHE_TTL: SignedDuration = SignedDuration::from_hours(1);

#[derive(Debug, Error)]
pub enum TenantResolutionError {
    #[error("tenant not found")]
    NotFound,

    #[error("tenant {slug} is inactive")]
    Inactive { slug: String, support_email: String },

    #[error("tenant {slug} subscription expired at {expired_at}")]
    SubscriptionExpired {
        slug: String,
        expired_at: Timestamp,
        support_email: String,
    },

    #[error("tenant lookup failed")]
    Lookup(#[source] TenantsServiceError),
}

/// The request attributes that identify a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the `Host` header, with or without a port.
    pub host: Option<String>,

    /// Value of the explicit tenant id header.
    pub tenant_header: Option<String>,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The request targets a central domain and runs without a tenant.
    Central,

    Tenant(TenantRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LookupMethod {
    Domain,
    Subdomain,
    Header,
}

impl fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Domain => "domain",
            Self::Subdomain => "subdomain",
            Self::Header => "header",
        })
    }
}

/// Resolves tenants by domain, then subdomain, then explicit header.
pub struct TenantResolver {
    tenants: Arc<dyn TenantsService>,
    central_domains: Vec<String>,
    cache: TtlCache<(LookupMethod, String), TenantRecord>,
}

impl fmt::Debug for TenantResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantResolver")
            .field("central_domains", &self.central_domains)
            .finish_non_exhaustive()
    }
}

impl TenantResolver {
    #[must_use]
    pub fn new(
        tenants: Arc<dyn TenantsService>,
        central_domains: Vec<String>,
        cache_ttl: SignedDuration,
    ) -> Self {
        Self {
            tenants,
            central_domains: central_domains
                .into_iter()
                .map(|domain| domain.trim().to_ascii_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Resolve the tenant a request belongs to and check it may be served at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TenantResolutionError::NotFound`] when nothing matches,
    /// [`TenantResolutionError::Inactive`] or
    /// [`TenantResolutionError::SubscriptionExpired`] when the tenant exists but
    /// cannot be served, and [`TenantResolutionError::Lookup`] on storage failure.
    pub async fn resolve(
        &self,
        request: &RequestContext,
        now: Timestamp,
    ) -> Result<Resolution, TenantResolutionError> {
        let host = request.host.as_deref().map(normalize_host);

        if let Some(host) = &host
            && self.central_domains.iter().any(|central| central == host)
        {
            return Ok(Resolution::Central);
        }

        let Some(tenant) = self.lookup(host.as_deref(), request, now).await? else {
            warn!(host = host.as_deref().unwrap_or_default(), "tenant not found");

            return Err(TenantResolutionError::NotFound);
        };

        if !tenant.is_active {
            info!(tenant = %tenant.uuid, slug = %tenant.slug, "inactive tenant access attempt");

            return Err(TenantResolutionError::Inactive {
                slug: tenant.slug,
                support_email: tenant.email,
            });
        }

        if let Some(expired_at) = tenant.subscription_ends_at
            && tenant.subscription_expired(now)
        {
            return Err(TenantResolutionError::SubscriptionExpired {
                slug: tenant.slug,
                expired_at,
                support_email: tenant.email,
            });
        }

        Ok(Resolution::Tenant(tenant))
    }

    async fn lookup(
        &self,
        host: Option<&str>,
        request: &RequestContext,
        now: Timestamp,
    ) -> Result<Option<TenantRecord>, TenantResolutionError> {
        if let Some(host) = host {
            if let Some(tenant) = self.cached(LookupMethod::Domain, host, now).await? {
                return Ok(Some(tenant));
            }

            if let Some(label) = subdomain_label(host)
                && let Some(tenant) = self.cached(LookupMethod::Subdomain, label, now).await?
            {
                return Ok(Some(tenant));
            }
        }

        if let Some(header) = request
            .tenant_header
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return self
                .cached(LookupMethod::Header, &header.to_ascii_lowercase(), now)
                .await;
        }

        Ok(None)
    }

    async fn cached(
        &self,
        method: LookupMethod,
        value: &str,
        now: Timestamp,
    ) -> Result<Option<TenantRecord>, TenantResolutionError> {
        let key = (method, value.to_string());

        if let Some(tenant) = self.cache.get(&key, now).await {
            return Ok(Some(tenant));
        }

        let found = match method {
            LookupMethod::Domain => self.tenants.find_by_domain(value).await,
            LookupMethod::Subdomain | LookupMethod::Header => self.tenants.find_by_slug(value).await,
        }
        .map_err(TenantResolutionError::Lookup)?;

        if let Some(tenant) = &found {
            debug!(%method, value, tenant = %tenant.uuid, "caching tenant lookup");

            self.cache.insert(key, tenant.clone(), now).await;
        }

        Ok(found)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim();

    let without_port = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };

    without_port.trim_end_matches('.').to_ascii_lowercase()
}

fn subdomain_label(host: &str) -> Option<&str> {
    let (label, rest) = host.split_once('.')?;

    (!label.is_empty() && !rest.is_empty() && !RESERVED_LABELS.contains(&label)).then_some(label)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::tenants::{MockTenantsService, records::TenantUuid};

    use super::*;

    fn tenant(slug: &str) -> TenantRecord {
        TenantRecord {
            uuid: TenantUuid::new(),
            slug: slug.to_string(),
            name: format!("{slug} academy"),
            email: format!("support@{slug}.test"),
            is_active: true,
            subscription_ends_at: None,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn request(host: Option<&str>, header: Option<&str>) -> RequestContext {
        RequestContext {
            host: host.map(ToString::to_string),
            tenant_header: header.map(ToString::to_string),
        }
    }

    fn resolver(mock: MockTenantsService) -> TenantResolver {
        TenantResolver::new(
            Arc::new(mock),
            vec!["central.lectern.test".to_string(), "localhost".to_string()],
            DEFAULT_CACHE_TTL,
        )
    }

    #[test]
    fn normalize_host_strips_port_and_case() {
        assert_eq!(normalize_host("Acme.Example.COM:8443"), "acme.example.com");
        assert_eq!(normalize_host("acme.example.com."), "acme.example.com");
    }

    #[test]
    fn subdomain_label_skips_reserved_and_bare_hosts() {
        assert_eq!(subdomain_label("acme.lectern.test"), Some("acme"));
        assert_eq!(subdomain_label("www.lectern.test"), None);
        assert_eq!(subdomain_label("api.lectern.test"), None);
        assert_eq!(subdomain_label("localhost"), None);
    }

    #[tokio::test]
    async fn central_domain_bypasses_lookup() -> TestResult {
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain().never();
        mock.expect_find_by_slug().never();

        let resolution = resolver(mock)
            .resolve(
                &request(Some("localhost:8698"), Some("acme")),
                Timestamp::now(),
            )
            .await?;

        assert_eq!(resolution, Resolution::Central);

        Ok(())
    }

    #[tokio::test]
    async fn domain_match_wins() -> TestResult {
        let acme = tenant("acme");
        let expected = acme.clone();
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain()
            .once()
            .withf(|value| value == "learn.acme.test")
            .return_once(move |_| Ok(Some(acme)));
        mock.expect_find_by_slug().never();

        let resolution = resolver(mock)
            .resolve(&request(Some("learn.acme.test"), None), Timestamp::now())
            .await?;

        assert_eq!(resolution, Resolution::Tenant(expected));

        Ok(())
    }

    #[tokio::test]
    async fn subdomain_is_tried_after_domain() -> TestResult {
        let acme = tenant("acme");
        let expected = acme.clone();
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain()
            .once()
            .return_once(|_| Ok(None));
        mock.expect_find_by_slug()
            .once()
            .withf(|value| value == "acme")
            .return_once(move |_| Ok(Some(acme)));

        let resolution = resolver(mock)
            .resolve(&request(Some("acme.lectern.test"), None), Timestamp::now())
            .await?;

        assert_eq!(resolution, Resolution::Tenant(expected));

        Ok(())
    }

    #[tokio::test]
    async fn header_is_last_resort() -> TestResult {
        let acme = tenant("acme");
        let expected = acme.clone();
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain()
            .once()
            .return_once(|_| Ok(None));
        mock.expect_find_by_slug()
            .once()
            .withf(|value| value == "acme")
            .return_once(move |_| Ok(Some(acme)));

        let resolution = resolver(mock)
            .resolve(&request(Some("www.lectern.test"), Some(" ACME ")), Timestamp::now())
            .await?;

        assert_eq!(resolution, Resolution::Tenant(expected));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_domain_is_not_found() {
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain()
            .once()
            .return_once(|_| Ok(None));
        mock.expect_find_by_slug()
            .once()
            .withf(|value| value == "ghost")
            .return_once(|_| Ok(None));

        let result = resolver(mock)
            .resolve(&request(Some("ghost.example.com"), None), Timestamp::now())
            .await;

        assert!(
            matches!(result, Err(TenantResolutionError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn inactive_tenant_is_rejected() {
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain().once().return_once(|_| {
            Ok(Some(TenantRecord {
                is_active: false,
                ..tenant("dormant")
            }))
        });

        let result = resolver(mock)
            .resolve(&request(Some("dormant.example.com"), None), Timestamp::now())
            .await;

        assert!(
            matches!(
                result,
                Err(TenantResolutionError::Inactive { ref support_email, .. })
                    if support_email == "support@dormant.test"
            ),
            "expected Inactive, got {result:?}"
        );
    }

    #[tokio::test]
    async fn expired_subscription_reports_expiry() {
        let now = Timestamp::now();
        let ended = now - SignedDuration::from_hours(1);
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain().once().return_once(move |_| {
            Ok(Some(TenantRecord {
                subscription_ends_at: Some(ended),
                ..tenant("lapsed")
            }))
        });

        let result = resolver(mock)
            .resolve(&request(Some("lapsed.example.com"), None), now)
            .await;

        assert!(
            matches!(
                result,
                Err(TenantResolutionError::SubscriptionExpired { expired_at, .. }) if expired_at == ended
            ),
            "expected SubscriptionExpired, got {result:?}"
        );
    }

    #[tokio::test]
    async fn cached_lookup_skips_store() -> TestResult {
        let acme = tenant("acme");
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain()
            .once()
            .return_once(move |_| Ok(Some(acme)));

        let resolver = resolver(mock);
        let now = Timestamp::now();
        let req = request(Some("learn.acme.test"), None);

        resolver.resolve(&req, now).await?;
        resolver
            .resolve(&req, now + SignedDuration::from_mins(59))
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn lookup_failure_is_reported() {
        let mut mock = MockTenantsService::new();

        mock.expect_find_by_domain()
            .once()
            .return_once(|_| Err(TenantsServiceError::InvalidData));

        let result = resolver(mock)
            .resolve(&request(Some("learn.acme.test"), None), Timestamp::now())
            .await;

        assert!(matches!(result, Err(TenantResolutionError::Lookup(_))));
    }
}
