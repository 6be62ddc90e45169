use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::debug;

use super::{
    BlogStore, Post, PostFields, StoreError, StoreResult, Tag, TagFields, User, UserFields,
};

/// [`BlogStore`] backed by PostgreSQL.
///
/// Multi-statement writes take a transaction from the pool for the duration of
/// the call; returning early without `commit` drops it, which rolls back.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(db))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

fn tag_write_error(err: sqlx::Error, name: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateTagName(name.to_string())
        }
        _ => StoreError::Database(err),
    }
}

fn post_write_error(err: sqlx::Error, user_id: i64) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::not_found("user", user_id)
        }
        _ => StoreError::Database(err),
    }
}

async fn replace_post_tags(
    tx: &mut Transaction<'_, Postgres>,
    post_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM posts_tags WHERE post_id = $1"#)
        .bind(post_id)
        .execute(&mut **tx)
        .await?;
    // Selecting from `tags` drops unknown and repeated ids.
    let linked = sqlx::query(
        r#"
        INSERT INTO posts_tags (post_id, tag_id)
        SELECT $1, id FROM tags WHERE id = ANY($2)
        "#,
    )
    .bind(post_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await?;
    debug!(post_id, requested = tag_ids.len(), linked = linked.rows_affected(), "post tags replaced");
    Ok(())
}

async fn replace_tag_posts(
    tx: &mut Transaction<'_, Postgres>,
    tag_id: i64,
    post_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"DELETE FROM posts_tags WHERE tag_id = $1"#)
        .bind(tag_id)
        .execute(&mut **tx)
        .await?;
    let linked = sqlx::query(
        r#"
        INSERT INTO posts_tags (post_id, tag_id)
        SELECT id, $1 FROM posts WHERE id = ANY($2)
        "#,
    )
    .bind(tag_id)
    .bind(post_ids)
    .execute(&mut **tx)
    .await?;
    debug!(tag_id, requested = post_ids.len(), linked = linked.rows_affected(), "tag posts replaced");
    Ok(())
}

#[async_trait]
impl BlogStore for PgStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, image_url
            FROM users
            ORDER BY last_name, first_name
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn get_user(&self, id: i64) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, first_name, last_name, image_url FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn create_user(&self, fields: UserFields) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, image_url)
            VALUES ($1, $2, $3)
            RETURNING id, first_name, last_name, image_url
            "#,
        )
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.image_url)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, id: i64, fields: UserFields) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, image_url = $4
            WHERE id = $1
            RETURNING id, first_name, last_name, image_url
            "#,
        )
        .bind(id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.image_url)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<User> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM posts_tags
            WHERE post_id IN (SELECT id FROM posts WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let posts = sqlx::query(r#"DELETE FROM posts WHERE user_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, first_name, last_name, image_url
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))?;

        tx.commit().await?;
        debug!(user_id = id, posts = posts.rows_affected(), "user deleted with posts");
        Ok(user)
    }

    async fn posts_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, created_at, user_id
            FROM posts
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(posts)
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"SELECT id, title, content, created_at, user_id FROM posts ORDER BY id"#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(posts)
    }

    async fn latest_posts(&self, limit: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, created_at, user_id
            FROM posts
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Post> {
        sqlx::query_as::<_, Post>(
            r#"SELECT id, title, content, created_at, user_id FROM posts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| StoreError::not_found("post", id))
    }

    async fn posts_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, created_at, user_id
            FROM posts
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(posts)
    }

    async fn create_post(&self, user_id: i64, fields: PostFields) -> StoreResult<Post> {
        let mut tx = self.db.begin().await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, content, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, created_at, user_id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| post_write_error(e, user_id))?;

        replace_post_tags(&mut tx, post.id, &fields.tag_ids).await?;
        tx.commit().await?;
        Ok(post)
    }

    async fn update_post(&self, id: i64, fields: PostFields) -> StoreResult<Post> {
        let mut tx = self.db.begin().await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = $2, content = $3
            WHERE id = $1
            RETURNING id, title, content, created_at, user_id
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.content)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("post", id))?;

        replace_post_tags(&mut tx, id, &fields.tag_ids).await?;
        tx.commit().await?;
        Ok(post)
    }

    async fn delete_post(&self, id: i64) -> StoreResult<Post> {
        let mut tx = self.db.begin().await?;

        sqlx::query(r#"DELETE FROM posts_tags WHERE post_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            DELETE FROM posts
            WHERE id = $1
            RETURNING id, title, content, created_at, user_id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("post", id))?;

        tx.commit().await?;
        Ok(post)
    }

    async fn tags_for_post(&self, post_id: i64) -> StoreResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name
            FROM tags t
            JOIN posts_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.db)
        .await?;
        Ok(tags)
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(r#"SELECT id, name FROM tags ORDER BY id"#)
            .fetch_all(&self.db)
            .await?;
        Ok(tags)
    }

    async fn get_tag(&self, id: i64) -> StoreResult<Tag> {
        sqlx::query_as::<_, Tag>(r#"SELECT id, name FROM tags WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::not_found("tag", id))
    }

    async fn tags_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Tag>> {
        let tags =
            sqlx::query_as::<_, Tag>(r#"SELECT id, name FROM tags WHERE id = ANY($1) ORDER BY id"#)
                .bind(ids)
                .fetch_all(&self.db)
                .await?;
        Ok(tags)
    }

    async fn create_tag(&self, fields: TagFields) -> StoreResult<Tag> {
        let mut tx = self.db.begin().await?;

        let tag = sqlx::query_as::<_, Tag>(
            r#"INSERT INTO tags (name) VALUES ($1) RETURNING id, name"#,
        )
        .bind(&fields.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| tag_write_error(e, &fields.name))?;

        replace_tag_posts(&mut tx, tag.id, &fields.post_ids).await?;
        tx.commit().await?;
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, fields: TagFields) -> StoreResult<Tag> {
        let mut tx = self.db.begin().await?;

        let tag = sqlx::query_as::<_, Tag>(
            r#"UPDATE tags SET name = $2 WHERE id = $1 RETURNING id, name"#,
        )
        .bind(id)
        .bind(&fields.name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| tag_write_error(e, &fields.name))?
        .ok_or_else(|| StoreError::not_found("tag", id))?;

        replace_tag_posts(&mut tx, id, &fields.post_ids).await?;
        tx.commit().await?;
        Ok(tag)
    }

    async fn delete_tag(&self, id: i64) -> StoreResult<Tag> {
        let mut tx = self.db.begin().await?;

        sqlx::query(r#"DELETE FROM posts_tags WHERE tag_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let tag = sqlx::query_as::<_, Tag>(r#"DELETE FROM tags WHERE id = $1 RETURNING id, name"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("tag", id))?;

        tx.commit().await?;
        Ok(tag)
    }

    async fn posts_for_tag(&self, tag_id: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.title, p.content, p.created_at, p.user_id
            FROM posts p
            JOIN posts_tags pt ON pt.post_id = p.id
            WHERE pt.tag_id = $1
            ORDER BY p.id
            "#,
        )
        .bind(tag_id)
        .fetch_all(&self.db)
        .await?;
        Ok(posts)
    }
}
