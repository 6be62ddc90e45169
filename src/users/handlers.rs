use axum::{extract::State, response::{Html, Redirect}};
use axum_extra::extract::{cookie::CookieJar, Form};
use tera::Context;
use tracing::{info, instrument};

use crate::{
    error::AppError,
    extractors::EntityId,
    flash,
    posts::dto::PostView,
    state::AppState,
};

use super::dto::{UserForm, UserView};

type Page = Result<(CookieJar, Html<String>), AppError>;
type Done = Result<(CookieJar, Redirect), AppError>;

#[instrument(skip(state, jar))]
pub async fn list_users(State(state): State<AppState>, jar: CookieJar) -> Page {
    let users = state.store.list_users().await?;
    let mut ctx = Context::new();
    ctx.insert("users", &users.iter().map(UserView::from).collect::<Vec<_>>());
    state.views.page("users/index.html", jar, ctx)
}

#[instrument(skip(state, jar))]
pub async fn new_user_form(State(state): State<AppState>, jar: CookieJar) -> Page {
    state.views.page("users/new.html", jar, Context::new())
}

#[instrument(skip(state, jar, form))]
pub async fn create_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<UserForm>,
) -> Done {
    let user = state.store.create_user(form.into()).await?;
    info!(user_id = user.id, "user created");
    let jar = flash::set_notice(jar, format!("User {} added.", user.full_name()));
    Ok((jar, Redirect::to("/users")))
}

#[instrument(skip(state, jar))]
pub async fn show_user(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Page {
    let user = state.store.get_user(id).await?;
    let posts = state.store.posts_by_user(id).await?;
    let mut ctx = Context::new();
    ctx.insert("user", &UserView::from(&user));
    ctx.insert("posts", &posts.iter().map(PostView::from).collect::<Vec<_>>());
    state.views.page("users/show.html", jar, ctx)
}

#[instrument(skip(state, jar))]
pub async fn edit_user_form(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Page {
    let user = state.store.get_user(id).await?;
    let mut ctx = Context::new();
    ctx.insert("user", &UserView::from(&user));
    state.views.page("users/edit.html", jar, ctx)
}

#[instrument(skip(state, jar, form))]
pub async fn update_user(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
    Form(form): Form<UserForm>,
) -> Done {
    let user = state.store.update_user(id, form.into()).await?;
    info!(user_id = user.id, "user edited");
    let jar = flash::set_notice(jar, format!("User {} edited.", user.full_name()));
    Ok((jar, Redirect::to("/users")))
}

#[instrument(skip(state, jar))]
pub async fn delete_user(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Done {
    let user = state.store.delete_user(id).await?;
    info!(user_id = user.id, "user deleted");
    let jar = flash::set_notice(jar, format!("User {} deleted.", user.full_name()));
    Ok((jar, Redirect::to("/users")))
}
