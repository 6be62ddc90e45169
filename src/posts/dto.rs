use serde::{Deserialize, Serialize};

use crate::{store::Post, users::dto::UserView};

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    /// Repeated `tags` fields; absent when nothing is ticked.
    #[serde(default)]
    pub tags: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub friendly_date: String,
    pub user_id: i64,
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            content: post.content.clone(),
            friendly_date: post.friendly_date(),
            user_id: post.user_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HomepageEntry {
    pub post: PostView,
    pub author: UserView,
}
