//! In-process [`BlogStore`] used by tests and `STORE=memory` runs.
//! Data is lost on process restart.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    BlogStore, Post, PostFields, StoreError, StoreResult, Tag, TagFields, User, UserFields,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    tags: BTreeMap<i64, Tag>,
    /// (post id, tag id)
    posts_tags: BTreeSet<(i64, i64)>,
    last_user_id: i64,
    last_post_id: i64,
    last_tag_id: i64,
}

impl Tables {
    fn tag_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.tags
            .values()
            .any(|t| t.name == name && Some(t.id) != except)
    }

    fn replace_post_tags(&mut self, post_id: i64, tag_ids: &[i64]) {
        self.posts_tags.retain(|&(p, _)| p != post_id);
        for &tag_id in tag_ids {
            if self.tags.contains_key(&tag_id) {
                self.posts_tags.insert((post_id, tag_id));
            }
        }
    }

    fn replace_tag_posts(&mut self, tag_id: i64, post_ids: &[i64]) {
        self.posts_tags.retain(|&(_, t)| t != tag_id);
        for &post_id in post_ids {
            if self.posts.contains_key(&post_id) {
                self.posts_tags.insert((post_id, tag_id));
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });
        Ok(users)
    }

    async fn get_user(&self, id: i64) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn create_user(&self, fields: UserFields) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            image_url: fields.image_url,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, fields: UserFields) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user.first_name = fields.first_name;
        user.last_name = fields.last_name;
        user.image_url = fields.image_url;
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(StoreError::not_found("user", id));
        }

        let owned: BTreeSet<i64> = tables
            .posts
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts_tags.retain(|(post_id, _)| !owned.contains(post_id));
        tables.posts.retain(|post_id, _| !owned.contains(post_id));

        tables
            .users
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn posts_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.values().cloned().collect())
    }

    async fn latest_posts(&self, limit: i64) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables.posts.values().cloned().collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Post> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("post", id))
    }

    async fn posts_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<i64> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.posts.get(&id).cloned())
            .collect())
    }

    async fn create_post(&self, user_id: i64, fields: PostFields) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::not_found("user", user_id));
        }
        tables.last_post_id += 1;
        let post = Post {
            id: tables.last_post_id,
            title: fields.title,
            content: fields.content,
            created_at: OffsetDateTime::now_utc(),
            user_id,
        };
        tables.posts.insert(post.id, post.clone());
        tables.replace_post_tags(post.id, &fields.tag_ids);
        Ok(post)
    }

    async fn update_post(&self, id: i64, fields: PostFields) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("post", id))?;
        post.title = fields.title;
        post.content = fields.content;
        let post = post.clone();
        tables.replace_post_tags(id, &fields.tag_ids);
        Ok(post)
    }

    async fn delete_post(&self, id: i64) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("post", id))?;
        tables.posts_tags.retain(|&(post_id, _)| post_id != id);
        Ok(post)
    }

    async fn tags_for_post(&self, post_id: i64) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts_tags
            .iter()
            .filter(|&&(p, _)| p == post_id)
            .filter_map(|(_, tag_id)| tables.tags.get(tag_id).cloned())
            .collect())
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().cloned().collect())
    }

    async fn get_tag(&self, id: i64) -> StoreResult<Tag> {
        let tables = self.tables.read().await;
        tables
            .tags
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("tag", id))
    }

    async fn tags_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<i64> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.tags.get(&id).cloned())
            .collect())
    }

    async fn create_tag(&self, fields: TagFields) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if tables.tag_name_taken(&fields.name, None) {
            return Err(StoreError::DuplicateTagName(fields.name));
        }
        tables.last_tag_id += 1;
        let tag = Tag {
            id: tables.last_tag_id,
            name: fields.name,
        };
        tables.tags.insert(tag.id, tag.clone());
        tables.replace_tag_posts(tag.id, &fields.post_ids);
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, fields: TagFields) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if !tables.tags.contains_key(&id) {
            return Err(StoreError::not_found("tag", id));
        }
        if tables.tag_name_taken(&fields.name, Some(id)) {
            return Err(StoreError::DuplicateTagName(fields.name));
        }
        let tag = Tag {
            id,
            name: fields.name,
        };
        tables.tags.insert(id, tag.clone());
        tables.replace_tag_posts(id, &fields.post_ids);
        Ok(tag)
    }

    async fn delete_tag(&self, id: i64) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        let tag = tables
            .tags
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("tag", id))?;
        tables.posts_tags.retain(|&(_, tag_id)| tag_id != id);
        Ok(tag)
    }

    async fn posts_for_tag(&self, tag_id: i64) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts_tags
            .iter()
            .filter(|&&(_, t)| t == tag_id)
            .filter_map(|(post_id, _)| tables.posts.get(post_id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::repo_types::DEFAULT_IMAGE_URL;

    fn user(first: &str, last: &str) -> UserFields {
        UserFields::new(first.into(), last.into(), String::new())
    }

    fn post(title: &str, tag_ids: Vec<i64>) -> PostFields {
        PostFields {
            title: title.into(),
            content: "body".into(),
            tag_ids,
        }
    }

    fn tag(name: &str, post_ids: Vec<i64>) -> TagFields {
        TagFields {
            name: name.into(),
            post_ids,
        }
    }

    #[tokio::test]
    async fn created_rows_read_back_identically() {
        let store = MemoryStore::new();
        let ada = store.create_user(user("Ada", "Lovelace")).await.unwrap();
        assert_eq!(store.get_user(ada.id).await.unwrap(), ada);
        assert_eq!(ada.image_url, DEFAULT_IMAGE_URL);

        let p = store.create_post(ada.id, post("Notes", vec![])).await.unwrap();
        assert_eq!(store.get_post(p.id).await.unwrap(), p);

        let t = store.create_tag(tag("math", vec![p.id])).await.unwrap();
        assert_eq!(store.get_tag(t.id).await.unwrap(), t);
        assert_eq!(store.posts_for_tag(t.id).await.unwrap(), vec![p]);
    }

    #[tokio::test]
    async fn ids_are_fresh_per_table() {
        let store = MemoryStore::new();
        let a = store.create_user(user("A", "A")).await.unwrap();
        let b = store.create_user(user("B", "B")).await.unwrap();
        assert_ne!(a.id, b.id);
        store.delete_user(b.id).await.unwrap();
        let c = store.create_user(user("C", "C")).await.unwrap();
        assert!(c.id > b.id);
    }

    #[tokio::test]
    async fn users_are_listed_by_last_then_first_name() {
        let store = MemoryStore::new();
        store.create_user(user("Grace", "Hopper")).await.unwrap();
        store.create_user(user("Charles", "Babbage")).await.unwrap();
        store.create_user(user("Alan", "Hopper")).await.unwrap();

        let names: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .iter()
            .map(User::full_name)
            .collect();
        assert_eq!(names, ["Charles Babbage", "Alan Hopper", "Grace Hopper"]);
    }

    #[tokio::test]
    async fn update_overwrites_every_field() {
        let store = MemoryStore::new();
        let ada = store
            .create_user(UserFields::new("Ada".into(), "Byron".into(), "http://a".into()))
            .await
            .unwrap();
        let updated = store
            .update_user(ada.id, UserFields::new("Augusta".into(), "King".into(), String::new()))
            .await
            .unwrap();
        assert_eq!(updated.full_name(), "Augusta King");
        assert_eq!(updated.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(store.get_user(ada.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn missing_rows_report_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_user(999_999).await,
            Err(StoreError::NotFound { entity: "user", id: 999_999 })
        ));
        assert!(matches!(
            store.update_post(3, post("x", vec![])).await,
            Err(StoreError::NotFound { entity: "post", .. })
        ));
        assert!(matches!(
            store.delete_tag(3).await,
            Err(StoreError::NotFound { entity: "tag", .. })
        ));
        assert!(matches!(
            store.create_post(42, post("orphan", vec![])).await,
            Err(StoreError::NotFound { entity: "user", id: 42 })
        ));
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_its_posts_only() {
        let store = MemoryStore::new();
        let ada = store.create_user(user("Ada", "Lovelace")).await.unwrap();
        let alan = store.create_user(user("Alan", "Turing")).await.unwrap();
        let math = store.create_tag(tag("math", vec![])).await.unwrap();

        for n in 0..3 {
            store
                .create_post(ada.id, post(&format!("ada {n}"), vec![math.id]))
                .await
                .unwrap();
        }
        let kept = store
            .create_post(alan.id, post("alan", vec![math.id]))
            .await
            .unwrap();

        let removed = store.delete_user(ada.id).await.unwrap();
        assert_eq!(removed, ada);

        assert!(store.posts_by_user(ada.id).await.unwrap().is_empty());
        assert_eq!(store.list_posts().await.unwrap(), vec![kept.clone()]);
        assert_eq!(store.posts_for_tag(math.id).await.unwrap(), vec![kept]);
        assert_eq!(store.get_tag(math.id).await.unwrap(), math);
    }

    #[tokio::test]
    async fn deleting_post_or_tag_only_removes_links() {
        let store = MemoryStore::new();
        let ada = store.create_user(user("Ada", "Lovelace")).await.unwrap();
        let math = store.create_tag(tag("math", vec![])).await.unwrap();
        let logic = store.create_tag(tag("logic", vec![])).await.unwrap();
        let first = store
            .create_post(ada.id, post("first", vec![math.id, logic.id]))
            .await
            .unwrap();
        let second = store
            .create_post(ada.id, post("second", vec![math.id]))
            .await
            .unwrap();

        store.delete_post(first.id).await.unwrap();
        assert_eq!(store.get_tag(logic.id).await.unwrap(), logic);
        assert!(store.posts_for_tag(logic.id).await.unwrap().is_empty());
        assert_eq!(store.posts_for_tag(math.id).await.unwrap(), vec![second.clone()]);

        store.delete_tag(math.id).await.unwrap();
        assert_eq!(store.get_post(second.id).await.unwrap(), second);
        assert!(store.tags_for_post(second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_posts_are_newest_first_and_capped() {
        let store = MemoryStore::new();
        let ada = store.create_user(user("Ada", "Lovelace")).await.unwrap();
        for n in 1..=7 {
            store
                .create_post(ada.id, post(&format!("post {n}"), vec![]))
                .await
                .unwrap();
        }

        let latest = store.latest_posts(5).await.unwrap();
        let ids: Vec<i64> = latest.iter().map(|p| p.id).collect();
        assert_eq!(ids, [7, 6, 5, 4, 3]);
        assert!(latest.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn id_filters_drop_unknown_and_repeated_ids() {
        let store = MemoryStore::new();
        let ada = store.create_user(user("Ada", "Lovelace")).await.unwrap();
        let math = store.create_tag(tag("math", vec![])).await.unwrap();
        let p = store.create_post(ada.id, post("p", vec![])).await.unwrap();

        assert_eq!(
            store.tags_by_ids(&[math.id, 77, math.id]).await.unwrap(),
            vec![math.clone()]
        );
        assert_eq!(store.posts_by_ids(&[88, p.id]).await.unwrap(), vec![p.clone()]);
        assert!(store.tags_by_ids(&[]).await.unwrap().is_empty());

        let linked = store
            .create_post(ada.id, post("q", vec![math.id, 77, math.id]))
            .await
            .unwrap();
        assert_eq!(store.tags_for_post(linked.id).await.unwrap(), vec![math]);
    }

    #[tokio::test]
    async fn tag_names_are_unique() {
        let store = MemoryStore::new();
        let rust = store.create_tag(tag("rust", vec![])).await.unwrap();
        let go = store.create_tag(tag("go", vec![])).await.unwrap();

        let err = store.create_tag(tag("rust", vec![])).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTagName(ref name) if name == "rust"));

        let err = store.update_tag(go.id, tag("rust", vec![])).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTagName(_)));

        // Keeping its own name is not a clash.
        assert_eq!(store.update_tag(rust.id, tag("rust", vec![])).await.unwrap(), rust);
        assert_eq!(store.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_selection_clears_associations_idempotently() {
        let store = MemoryStore::new();
        let ada = store.create_user(user("Ada", "Lovelace")).await.unwrap();
        let p1 = store.create_post(ada.id, post("one", vec![])).await.unwrap();
        let p2 = store.create_post(ada.id, post("two", vec![])).await.unwrap();
        let math = store.create_tag(tag("math", vec![p1.id, p2.id])).await.unwrap();
        assert_eq!(store.posts_for_tag(math.id).await.unwrap().len(), 2);

        store.update_tag(math.id, tag("math", vec![])).await.unwrap();
        assert!(store.posts_for_tag(math.id).await.unwrap().is_empty());

        store.update_tag(math.id, tag("math", vec![])).await.unwrap();
        assert!(store.posts_for_tag(math.id).await.unwrap().is_empty());
        assert_eq!(store.list_posts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn post_edit_replaces_tag_set() {
        let store = MemoryStore::new();
        let ada = store.create_user(user("Ada", "Lovelace")).await.unwrap();
        let math = store.create_tag(tag("math", vec![])).await.unwrap();
        let logic = store.create_tag(tag("logic", vec![])).await.unwrap();
        let p = store.create_post(ada.id, post("p", vec![math.id])).await.unwrap();

        let edited = store
            .update_post(
                p.id,
                PostFields {
                    title: "p2".into(),
                    content: "new".into(),
                    tag_ids: vec![logic.id],
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.title, "p2");
        assert_eq!(edited.created_at, p.created_at);
        assert_eq!(store.tags_for_post(p.id).await.unwrap(), vec![logic]);
    }
}
