use sqlx::FromRow;
use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, UtcOffset};

/// Shown for users who never supplied a picture.
pub const DEFAULT_IMAGE_URL: &str =
    "https://www.freeiconspng.com/uploads/icon-user-blue-symbol-people-person-generic--public-domain--21.png";

// e.g. "Tue Mar 5 2024, 3:07 PM"
const FRIENDLY_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short] [month repr:short] [day padding:none] [year], [hour repr:12 padding:none]:[minute] [period]"
);

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub image_url: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Blog post; always owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
}

impl Post {
    pub fn friendly_date(&self) -> String {
        let utc = self.created_at.to_offset(UtcOffset::UTC);
        utc.format(FRIENDLY_DATE).unwrap_or_else(|_| utc.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Editable user columns. Used for both insert and full overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub first_name: String,
    pub last_name: String,
    pub image_url: String,
}

impl UserFields {
    /// An empty image URL falls back to [`DEFAULT_IMAGE_URL`].
    pub fn new(first_name: String, last_name: String, image_url: String) -> Self {
        let image_url = if image_url.is_empty() {
            DEFAULT_IMAGE_URL.to_string()
        } else {
            image_url
        };
        Self {
            first_name,
            last_name,
            image_url,
        }
    }
}

/// Editable post columns plus the complete tag selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub tag_ids: Vec<i64>,
}

/// Editable tag columns plus the complete post selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFields {
    pub name: String,
    pub post_ids: Vec<i64>,
}
