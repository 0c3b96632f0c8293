pub mod api;
pub mod form;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Assemble the page and API routes.
pub fn app_router() -> Router<Arc<AppState>> {
    Router::new().merge(form::routes()).merge(api::routes())
}
