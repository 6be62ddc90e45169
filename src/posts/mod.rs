pub(crate) mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Homepage plus post routes, including creation nested under a user.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::homepage))
        .route(
            "/users/:id/posts/new",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        .route("/posts/:id", get(handlers::show_post))
        .route(
            "/posts/:id/edit",
            get(handlers::edit_post_form).post(handlers::update_post),
        )
        .route("/posts/:id/delete", post(handlers::delete_post))
}
