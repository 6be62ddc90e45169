use serde::{Deserialize, Serialize};

use crate::store::{User, UserFields};

#[derive(Debug, Deserialize)]
pub struct UserForm {
    pub first_name: String,
    pub last_name: String,
    pub image_url: String,
}

impl From<UserForm> for UserFields {
    fn from(form: UserForm) -> Self {
        UserFields::new(form.first_name, form.last_name, form.image_url)
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub image_url: String,
    pub full_name: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            image_url: user.image_url.clone(),
            full_name: user.full_name(),
        }
    }
}
