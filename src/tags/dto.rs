use serde::{Deserialize, Serialize};

use crate::store::Tag;

#[derive(Debug, Deserialize)]
pub struct TagForm {
    pub name: String,
    /// Repeated `posts` fields; absent when nothing is ticked.
    #[serde(default)]
    pub posts: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct TagView {
    pub id: i64,
    pub name: String,
}

impl From<&Tag> for TagView {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
        }
    }
}
