use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
    #[serde(default)]
    pub avatar_public_id: Option<String>,
    /// SHA-256 of the single active refresh token, if any.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, rename = "userQuizes")]
    pub user_quizzes: Vec<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        username: &str,
        email: &str,
        password_hash: &str,
        avatar: &str,
        avatar_public_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        User {
            id: Some(ObjectId::new()),
            username: username.to_lowercase(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            avatar: avatar.to_string(),
            avatar_public_id,
            refresh_token: None,
            user_quizzes: Vec::new(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn id_hex(&self) -> Option<String> {
        self.id.as_ref().map(|oid| oid.to_hex())
    }

    /// Public id of the current avatar on the image host. Older records only
    /// carry the URL, so fall back to its last path segment without extension.
    pub fn avatar_public_id(&self) -> Option<String> {
        if let Some(public_id) = &self.avatar_public_id {
            return Some(public_id.clone());
        }

        let file_name = self.avatar.rsplit('/').next()?;
        let public_id = file_name.split('.').next()?;
        (!public_id.is_empty()).then(|| public_id.to_string())
    }
}

#[cfg(test)]
impl User {
    pub fn test_user(username: &str) -> Self {
        User::new(
            username,
            &format!("{}@example.com", username),
            "$argon2id$not-a-real-hash",
            "https://res.cloudinary.com/demo/image/upload/v1/sample.jpg",
            None,
        )
    }
}
