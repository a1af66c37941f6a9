//! Caller identity supplied by the upstream identity layer.

use salvo::prelude::*;
use uuid::Uuid;

use lectern_app::domain::users::UserUuid;

use crate::extensions::*;

pub(crate) const USER_ID_HEADER: &str = "x-user-id";

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let Some(user) = req
        .header::<String>(USER_ID_HEADER)
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
    else {
        res.render(StatusError::unauthorized().brief("Missing or invalid x-user-id header"));

        return;
    };

    depot.insert_user_uuid(UserUuid::from_uuid(user));

    ctrl.call_next(req, depot, res).await;
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use super::*;

    #[salvo::handler]
    async fn echo_user(depot: &mut Depot, res: &mut Response) {
        let user = depot
            .user_uuid_or_401()
            .map_or_else(|_| "missing".to_string(), |uuid| uuid.to_string());

        res.render(user);
    }

    fn make_service() -> Service {
        Service::new(Router::new().hoop(handler).push(Router::new().get(echo_user)))
    }

    #[tokio::test]
    async fn user_header_is_recorded() -> TestResult {
        let user = Uuid::now_v7();

        let mut res = TestClient::get("http://example.com")
            .add_header(USER_ID_HEADER, user.to_string(), true)
            .send(&make_service())
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(res.take_string().await?, user.to_string());

        Ok(())
    }

    #[tokio::test]
    async fn missing_user_header_returns_401() -> TestResult {
        let res = TestClient::get("http://example.com")
            .send(&make_service())
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn malformed_user_header_returns_401() -> TestResult {
        let res = TestClient::get("http://example.com")
            .add_header(USER_ID_HEADER, "not-a-uuid", true)
            .send(&make_service())
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }
}
