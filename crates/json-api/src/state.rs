//! State

use std::sync::Arc;

use lectern_app::context::AppContext;

#[derive(Clone)]
pub(crate) struct State {
    pub(crate) app: AppContext,

    /// Header carrying an explicit tenant id.
    pub(crate) tenant_header: String,

    /// Client-app scheme returning buyers are redirected to.
    pub(crate) app_scheme: String,
}

impl State {
    #[must_use]
    pub(crate) fn new(app: AppContext, tenant_header: String, app_scheme: String) -> Self {
        Self {
            app,
            tenant_header,
            app_scheme,
        }
    }

    #[must_use]
    pub(crate) fn shared(app: AppContext, tenant_header: String, app_scheme: String) -> Arc<Self> {
        Arc::new(Self::new(app, tenant_header, app_scheme))
    }
}
