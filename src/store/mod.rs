mod memory;
mod postgres;
pub mod repo_types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repo_types::{Post, PostFields, Tag, TagFields, User, UserFields};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("tag name {0:?} is already taken")]
    DuplicateTagName(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users, posts, tags and the post/tag association.
///
/// Every mutating call is one unit of work: it either fully applies and is
/// committed before returning, or leaves the store untouched. Updates are full
/// overwrites. Deletes report the removed row so callers can describe it.
///
/// Selections (`tag_ids` / `post_ids`) naming rows that do not exist are
/// dropped silently, as are duplicates.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// All users, ordered by last name then first name.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: i64) -> StoreResult<User>;
    async fn create_user(&self, fields: UserFields) -> StoreResult<User>;
    async fn update_user(&self, id: i64, fields: UserFields) -> StoreResult<User>;
    /// Removes the user together with every post it owns.
    async fn delete_user(&self, id: i64) -> StoreResult<User>;
    async fn posts_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>>;

    async fn list_posts(&self) -> StoreResult<Vec<Post>>;
    /// Newest first, at most `limit` rows.
    async fn latest_posts(&self, limit: i64) -> StoreResult<Vec<Post>>;
    async fn get_post(&self, id: i64) -> StoreResult<Post>;
    async fn posts_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Post>>;
    async fn create_post(&self, user_id: i64, fields: PostFields) -> StoreResult<Post>;
    /// Overwrites title and content and replaces the tag set.
    async fn update_post(&self, id: i64, fields: PostFields) -> StoreResult<Post>;
    /// Removes the post and its tag links; the tags themselves stay.
    async fn delete_post(&self, id: i64) -> StoreResult<Post>;
    async fn tags_for_post(&self, post_id: i64) -> StoreResult<Vec<Tag>>;

    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;
    async fn get_tag(&self, id: i64) -> StoreResult<Tag>;
    async fn tags_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Tag>>;
    async fn create_tag(&self, fields: TagFields) -> StoreResult<Tag>;
    /// Overwrites the name and replaces the post set.
    async fn update_tag(&self, id: i64, fields: TagFields) -> StoreResult<Tag>;
    /// Removes the tag and its post links; the posts themselves stay.
    async fn delete_tag(&self, id: i64) -> StoreResult<Tag>;
    async fn posts_for_tag(&self, tag_id: i64) -> StoreResult<Vec<Post>>;
}
