pub(crate) mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(handlers::list_tags))
        .route(
            "/tags/new",
            get(handlers::new_tag_form).post(handlers::create_tag),
        )
        .route("/tags/:id", get(handlers::show_tag))
        .route(
            "/tags/:id/edit",
            get(handlers::edit_tag_form).post(handlers::update_tag),
        )
        .route("/tags/:id/delete", post(handlers::delete_tag))
}
