use axum::{extract::State, response::{Html, Redirect}};
use axum_extra::extract::{cookie::CookieJar, Form};
use tera::Context;
use tracing::{debug, info, instrument};

use crate::{
    error::AppError,
    extractors::EntityId,
    flash,
    posts::dto::PostView,
    state::AppState,
    store::{Post, TagFields},
};

use super::dto::{TagForm, TagView};

type Page = Result<(CookieJar, Html<String>), AppError>;
type Done = Result<(CookieJar, Redirect), AppError>;

fn post_views(posts: &[Post]) -> Vec<PostView> {
    posts.iter().map(PostView::from).collect()
}

/// Resolves a submitted post selection; unknown ids are dropped.
async fn tag_fields(state: &AppState, form: TagForm) -> Result<TagFields, AppError> {
    let posts = state.store.posts_by_ids(&form.posts).await?;
    if posts.len() != form.posts.len() {
        debug!(submitted = form.posts.len(), kept = posts.len(), "ignoring unknown posts");
    }
    Ok(TagFields {
        name: form.name,
        post_ids: posts.iter().map(|p| p.id).collect(),
    })
}

#[instrument(skip(state, jar))]
pub async fn list_tags(State(state): State<AppState>, jar: CookieJar) -> Page {
    let tags = state.store.list_tags().await?;
    let mut ctx = Context::new();
    ctx.insert("tags", &tags.iter().map(TagView::from).collect::<Vec<_>>());
    state.views.page("tags/index.html", jar, ctx)
}

#[instrument(skip(state, jar))]
pub async fn new_tag_form(State(state): State<AppState>, jar: CookieJar) -> Page {
    let posts = state.store.list_posts().await?;
    let mut ctx = Context::new();
    ctx.insert("posts", &post_views(&posts));
    state.views.page("tags/new.html", jar, ctx)
}

#[instrument(skip(state, jar, form))]
pub async fn create_tag(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<TagForm>,
) -> Done {
    let fields = tag_fields(&state, form).await?;
    let tag = state.store.create_tag(fields).await?;
    info!(tag_id = tag.id, "tag created");
    let jar = flash::set_notice(jar, format!("Tag '{}' added.", tag.name));
    Ok((jar, Redirect::to("/tags")))
}

#[instrument(skip(state, jar))]
pub async fn show_tag(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Page {
    let tag = state.store.get_tag(id).await?;
    let posts = state.store.posts_for_tag(id).await?;
    let mut ctx = Context::new();
    ctx.insert("tag", &TagView::from(&tag));
    ctx.insert("posts", &post_views(&posts));
    state.views.page("tags/show.html", jar, ctx)
}

#[instrument(skip(state, jar))]
pub async fn edit_tag_form(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Page {
    let tag = state.store.get_tag(id).await?;
    let posts = state.store.list_posts().await?;
    let selected: Vec<i64> = state
        .store
        .posts_for_tag(id)
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    let mut ctx = Context::new();
    ctx.insert("tag", &TagView::from(&tag));
    ctx.insert("posts", &post_views(&posts));
    ctx.insert("selected", &selected);
    state.views.page("tags/edit.html", jar, ctx)
}

#[instrument(skip(state, jar, form))]
pub async fn update_tag(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
    Form(form): Form<TagForm>,
) -> Done {
    state.store.get_tag(id).await?;
    let fields = tag_fields(&state, form).await?;
    let tag = state.store.update_tag(id, fields).await?;
    info!(tag_id = tag.id, "tag edited");
    let jar = flash::set_notice(jar, format!("Tag '{}' edited.", tag.name));
    Ok((jar, Redirect::to("/tags")))
}

#[instrument(skip(state, jar))]
pub async fn delete_tag(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Done {
    let tag = state.store.delete_tag(id).await?;
    info!(tag_id = tag.id, "tag deleted");
    let jar = flash::set_notice(jar, format!("Tag '{}' deleted.", tag.name));
    Ok((jar, Redirect::to("/tags")))
}
