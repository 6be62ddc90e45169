use axum::{extract::State, response::{Html, Redirect}};
use axum_extra::extract::{cookie::CookieJar, Form};
use tera::Context;
use tracing::{debug, info, instrument};

use crate::{
    error::AppError,
    extractors::EntityId,
    flash,
    state::AppState,
    store::{PostFields, Tag},
    tags::dto::TagView,
    users::dto::UserView,
};

use super::dto::{HomepageEntry, PostForm, PostView};

const HOMEPAGE_POSTS: i64 = 5;

type Page = Result<(CookieJar, Html<String>), AppError>;
type Done = Result<(CookieJar, Redirect), AppError>;

fn tag_views(tags: &[Tag]) -> Vec<TagView> {
    tags.iter().map(TagView::from).collect()
}

/// Resolves a submitted tag selection; unknown ids are dropped.
async fn post_fields(state: &AppState, form: PostForm) -> Result<PostFields, AppError> {
    let tags = state.store.tags_by_ids(&form.tags).await?;
    if tags.len() != form.tags.len() {
        debug!(submitted = form.tags.len(), kept = tags.len(), "ignoring unknown tags");
    }
    Ok(PostFields {
        title: form.title,
        content: form.content,
        tag_ids: tags.iter().map(|t| t.id).collect(),
    })
}

#[instrument(skip(state, jar))]
pub async fn homepage(State(state): State<AppState>, jar: CookieJar) -> Page {
    let posts = state.store.latest_posts(HOMEPAGE_POSTS).await?;
    let mut entries = Vec::with_capacity(posts.len());
    for post in &posts {
        let author = state.store.get_user(post.user_id).await?;
        entries.push(HomepageEntry {
            post: PostView::from(post),
            author: UserView::from(&author),
        });
    }
    let mut ctx = Context::new();
    ctx.insert("entries", &entries);
    state.views.page("posts/homepage.html", jar, ctx)
}

#[instrument(skip(state, jar))]
pub async fn new_post_form(
    State(state): State<AppState>,
    EntityId(user_id): EntityId,
    jar: CookieJar,
) -> Page {
    let user = state.store.get_user(user_id).await?;
    let tags = state.store.list_tags().await?;
    let mut ctx = Context::new();
    ctx.insert("user", &UserView::from(&user));
    ctx.insert("tags", &tag_views(&tags));
    state.views.page("posts/new.html", jar, ctx)
}

#[instrument(skip(state, jar, form))]
pub async fn create_post(
    State(state): State<AppState>,
    EntityId(user_id): EntityId,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Done {
    let user = state.store.get_user(user_id).await?;
    let fields = post_fields(&state, form).await?;
    let post = state.store.create_post(user.id, fields).await?;
    info!(post_id = post.id, user_id = user.id, "post created");
    let jar = flash::set_notice(jar, format!("Post '{}' added.", post.title));
    Ok((jar, Redirect::to(&format!("/users/{}", user.id))))
}

#[instrument(skip(state, jar))]
pub async fn show_post(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Page {
    let post = state.store.get_post(id).await?;
    let author = state.store.get_user(post.user_id).await?;
    let tags = state.store.tags_for_post(id).await?;
    let mut ctx = Context::new();
    ctx.insert("post", &PostView::from(&post));
    ctx.insert("author", &UserView::from(&author));
    ctx.insert("tags", &tag_views(&tags));
    state.views.page("posts/show.html", jar, ctx)
}

#[instrument(skip(state, jar))]
pub async fn edit_post_form(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Page {
    let post = state.store.get_post(id).await?;
    let tags = state.store.list_tags().await?;
    let selected: Vec<i64> = state
        .store
        .tags_for_post(id)
        .await?
        .iter()
        .map(|t| t.id)
        .collect();
    let mut ctx = Context::new();
    ctx.insert("post", &PostView::from(&post));
    ctx.insert("tags", &tag_views(&tags));
    ctx.insert("selected", &selected);
    state.views.page("posts/edit.html", jar, ctx)
}

#[instrument(skip(state, jar, form))]
pub async fn update_post(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
    Form(form): Form<PostForm>,
) -> Done {
    state.store.get_post(id).await?;
    let fields = post_fields(&state, form).await?;
    let post = state.store.update_post(id, fields).await?;
    info!(post_id = post.id, "post edited");
    let jar = flash::set_notice(jar, format!("Post '{}' edited.", post.title));
    Ok((jar, Redirect::to(&format!("/users/{}", post.user_id))))
}

#[instrument(skip(state, jar))]
pub async fn delete_post(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    jar: CookieJar,
) -> Done {
    let post = state.store.delete_post(id).await?;
    info!(post_id = post.id, "post deleted");
    let jar = flash::set_notice(jar, format!("Post '{}' deleted.", post.title));
    Ok((jar, Redirect::to(&format!("/users/{}", post.user_id))))
}
