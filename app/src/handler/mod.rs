//! Route table of the application.

mod user;

use axum::routing::MethodRouter;
use web_toolset::{common_routes, AppState, Router};

pub fn route() -> Router<MethodRouter<AppState>> {
    let mut route = Router::new();
    route.mount_router("", &common_routes());
    route.mount_router("/user", &user::route());
    route
}
