//! Tenancy middleware.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{http::header::HOST, prelude::*};
use tracing::error;

use lectern_app::domain::tenants::{
    records::TenantRecord,
    resolver::{RequestContext, Resolution},
    scope::with_tenant,
};

use crate::{extensions::*, state::State, tenancy::errors::render_resolution_error};

pub(crate) const TENANT_ID_HEADER: &str = "x-tenant-id";
pub(crate) const TENANT_NAME_HEADER: &str = "x-tenant-name";
pub(crate) const SUBSCRIPTION_WARNING_HEADER: &str = "x-subscription-warning";
pub(crate) const SUBSCRIPTION_EXPIRES_HEADER: &str = "x-subscription-expires";

/// Resolve the request's tenant and run the rest of the chain inside its scope.
///
/// Central-domain requests continue without a tenant.
#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let state = match depot.obtain::<Arc<State>>() {
        Ok(state) => Arc::clone(state),
        Err(_error) => {
            res.render(StatusError::internal_server_error());

            return;
        }
    };

    let request = RequestContext {
        host: request_host(req),
        tenant_header: req.header::<String>(state.tenant_header.as_str()),
    };

    let now = Timestamp::now();

    let tenant = match state.app.resolver.resolve(&request, now).await {
        Ok(Resolution::Tenant(tenant)) => tenant,
        Ok(Resolution::Central) => {
            ctrl.call_next(req, depot, res).await;

            return;
        }
        Err(resolution_error) => {
            render_resolution_error(res, resolution_error);

            return;
        }
    };

    add_tenant_headers(res, &tenant, now);

    let tenant_uuid = tenant.uuid;

    depot.insert_tenant(tenant);

    if let Err(scope_error) = with_tenant(tenant_uuid, ctrl.call_next(req, depot, res)).await {
        error!("failed to enter tenant scope: {scope_error}");

        res.render(StatusError::internal_server_error());
    }
}

fn request_host(req: &Request) -> Option<String> {
    req.header::<String>(HOST)
        .or_else(|| req.uri().host().map(ToString::to_string))
}

fn add_tenant_headers(res: &mut Response, tenant: &TenantRecord, now: Timestamp) {
    let mut headers = vec![
        (TENANT_ID_HEADER, tenant.slug.clone()),
        (TENANT_NAME_HEADER, tenant.name.clone()),
    ];

    if let Some(ends_at) = tenant.subscription_expiring(now) {
        headers.push((SUBSCRIPTION_WARNING_HEADER, "Subscription expires soon".to_string()));
        headers.push((SUBSCRIPTION_EXPIRES_HEADER, ends_at.to_string()));
    }

    for (name, value) in headers {
        if let Err(source) = res.add_header(name, value, true) {
            error!(header = name, "failed to set tenant header: {source}");
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use salvo::{
        affix_state::inject,
        test::{ResponseExt, TestClient},
    };
    use testresult::TestResult;

    use lectern_app::domain::tenants::{TenantsServiceError, scope::active_tenant};

    use crate::{
        tenancy::errors::TenantErrorBody,
        test_helpers::{Mocks, TEST_CENTRAL_DOMAIN, TEST_TENANT_UUID, tenant_record},
    };

    use super::*;

    #[salvo::handler]
    async fn echo_scope(depot: &mut Depot, res: &mut Response) {
        let scope = active_tenant().map_or_else(|| "none".to_string(), |uuid| uuid.to_string());
        let tenant = depot
            .tenant_uuid_or_404()
            .map_or_else(|_| "none".to_string(), |uuid| uuid.to_string());

        res.render(format!("{scope}|{tenant}"));
    }

    fn make_service(mocks: Mocks) -> Service {
        Service::new(
            Router::new()
                .hoop(inject(mocks.into_state()))
                .hoop(handler)
                .push(Router::new().get(echo_scope)),
        )
    }

    fn no_domain(mocks: &mut Mocks) {
        mocks
            .tenants
            .expect_find_by_domain()
            .returning(|_| Ok(None));
    }

    #[tokio::test]
    async fn subdomain_request_runs_in_tenant_scope() -> TestResult {
        let mut mocks = Mocks::default();

        no_domain(&mut mocks);

        mocks
            .tenants
            .expect_find_by_slug()
            .once()
            .withf(|slug| slug == "acme")
            .return_once(|_| Ok(Some(tenant_record("acme"))));

        let mut res = TestClient::get("http://acme.lectern.test/")
            .send(&make_service(mocks))
            .await;

        let tenant_id = res
            .headers()
            .get(TENANT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(tenant_id.as_deref(), Some("acme"));
        assert_eq!(
            res.take_string().await?,
            format!("{TEST_TENANT_UUID}|{TEST_TENANT_UUID}")
        );

        Ok(())
    }

    #[tokio::test]
    async fn tenant_header_is_used_when_host_does_not_match() -> TestResult {
        let mut mocks = Mocks::default();

        no_domain(&mut mocks);

        mocks
            .tenants
            .expect_find_by_slug()
            .withf(|slug| slug == "acme")
            .once()
            .return_once(|_| Ok(Some(tenant_record("acme"))));

        let res = TestClient::get("http://api.lectern.example/")
            .add_header("x-tenant-id", "acme", true)
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }

    #[tokio::test]
    async fn central_domain_runs_without_tenant() -> TestResult {
        let mut mocks = Mocks::default();

        mocks.tenants.expect_find_by_domain().never();
        mocks.tenants.expect_find_by_slug().never();

        let mut res = TestClient::get(format!("http://{TEST_CENTRAL_DOMAIN}/"))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(res.take_string().await?, "none|none");

        Ok(())
    }

    #[tokio::test]
    async fn unknown_tenant_returns_404() -> TestResult {
        let mut mocks = Mocks::default();

        no_domain(&mut mocks);
        mocks.tenants.expect_find_by_slug().returning(|_| Ok(None));

        let mut res = TestClient::get("http://nobody.lectern.example/")
            .send(&make_service(mocks))
            .await;

        let body: TenantErrorBody = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
        assert!(!body.success, "refusals are unsuccessful");
        assert_eq!(body.error_code, "TENANT_NOT_FOUND");

        Ok(())
    }

    #[tokio::test]
    async fn inactive_tenant_returns_403() -> TestResult {
        let mut mocks = Mocks::default();

        no_domain(&mut mocks);

        mocks.tenants.expect_find_by_slug().returning(|_| {
            Ok(Some(TenantRecord {
                is_active: false,
                ..tenant_record("acme")
            }))
        });

        let mut res = TestClient::get("http://acme.lectern.example/")
            .send(&make_service(mocks))
            .await;

        let body: TenantErrorBody = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
        assert_eq!(body.error_code, "TENANT_INACTIVE");
        assert_eq!(body.support_email.as_deref(), Some("support@acme.test"));

        Ok(())
    }

    #[tokio::test]
    async fn expired_subscription_returns_402_with_expiry() -> TestResult {
        let expired_at = Timestamp::now() - SignedDuration::from_hours(24);
        let mut mocks = Mocks::default();

        no_domain(&mut mocks);

        mocks.tenants.expect_find_by_slug().returning(move |_| {
            Ok(Some(TenantRecord {
                subscription_ends_at: Some(expired_at),
                ..tenant_record("acme")
            }))
        });

        let mut res = TestClient::get("http://acme.lectern.example/")
            .send(&make_service(mocks))
            .await;

        let body: TenantErrorBody = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::PAYMENT_REQUIRED));
        assert_eq!(body.error_code, "SUBSCRIPTION_EXPIRED");
        assert_eq!(body.expired_at, Some(expired_at));

        Ok(())
    }

    #[tokio::test]
    async fn expiring_subscription_adds_warning_headers() -> TestResult {
        let ends_at = Timestamp::now() + SignedDuration::from_hours(48);
        let mut mocks = Mocks::default();

        no_domain(&mut mocks);

        mocks.tenants.expect_find_by_slug().returning(move |_| {
            Ok(Some(TenantRecord {
                subscription_ends_at: Some(ends_at),
                ..tenant_record("acme")
            }))
        });

        let res = TestClient::get("http://acme.lectern.example/")
            .send(&make_service(mocks))
            .await;

        let expires = res
            .headers()
            .get(SUBSCRIPTION_EXPIRES_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert!(
            res.headers().contains_key(SUBSCRIPTION_WARNING_HEADER),
            "expected a subscription warning"
        );
        assert_eq!(expires, Some(ends_at.to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn lookup_failure_returns_500() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .tenants
            .expect_find_by_domain()
            .returning(|_| Err(TenantsServiceError::InvalidData));

        let res = TestClient::get("http://acme.lectern.example/")
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));

        Ok(())
    }
}
