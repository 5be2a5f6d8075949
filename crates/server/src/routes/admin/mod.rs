//! Admin API. Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin).

pub mod analytics;
pub mod announcements;
pub mod inquiries;
pub mod popups;
pub mod settings;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(analytics::report))
        .route("/users", get(users::list))
        .route("/users/{id}/subscription", patch(users::update_subscription))
        .route("/users/{id}/token", post(users::issue_token))
        .route(
            "/announcements",
            get(announcements::list).post(announcements::create),
        )
        .route(
            "/announcements/{id}",
            patch(announcements::update).delete(announcements::delete),
        )
        .route("/inquiries", get(inquiries::list))
        .route("/inquiries/{id}/reply", post(inquiries::reply))
        .route("/inquiries/{id}/close", post(inquiries::close))
        .route("/popups", get(popups::list).post(popups::create))
        .route("/popups/{id}", patch(popups::update).delete(popups::delete))
        .route("/settings", get(settings::show).put(settings::update))
}
