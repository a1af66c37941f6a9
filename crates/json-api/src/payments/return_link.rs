//! Payment Return Handler

use std::sync::Arc;

use salvo::{http::header::LOCATION, oapi::extract::PathParam, prelude::*};

use lectern_app::domain::payments::{CallbackRequest, return_link::build_return_link};

use crate::{extensions::*, state::State};

/// Payment Return Handler
///
/// Sends a buyer coming back from a provider to the client app. Nothing is recorded
/// here; the app verifies the payment itself.
#[endpoint(
    tags("payments"),
    summary = "Payment Return",
    responses((status_code = StatusCode::FOUND, description = "Redirect to the client app")),
)]
pub(crate) async fn handler(
    gateway: PathParam<String>,
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let query = CallbackRequest {
        query: req
            .queries()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        ..CallbackRequest::default()
    };

    let link = build_return_link(&state.app_scheme, &gateway.into_inner(), &query)
        .or_500("failed to build return link")?;

    res.add_header(LOCATION, link, true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::FOUND);

    Ok(())
}
