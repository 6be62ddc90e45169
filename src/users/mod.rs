pub(crate) mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/users/new",
            get(handlers::new_user_form).post(handlers::create_user),
        )
        .route("/users/:id", get(handlers::show_user))
        .route(
            "/users/:id/edit",
            get(handlers::edit_user_form).post(handlers::update_user),
        )
        .route("/users/:id/delete", post(handlers::delete_user))
}
