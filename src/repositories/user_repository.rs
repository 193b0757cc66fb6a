use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{IndexOptions, ReplaceOptions},
    Collection, IndexModel,
};

use crate::{
    errors::{AppError, AppResult},
    models::domain::User,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>>;
    /// Matches on username OR email; either may be absent but not both.
    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<User>>;
    /// Any other user already holding the given username or email.
    async fn find_conflict(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<&ObjectId>,
    ) -> AppResult<Option<User>>;
    async fn update(&self, user: User) -> AppResult<User>;
    /// Appends a quiz reference; `Ok(None)` when the user does not exist.
    async fn push_quiz(&self, user_id: &ObjectId, quiz_id: &ObjectId) -> AppResult<Option<User>>;
    async fn pull_quiz(&self, user_id: &ObjectId, quiz_id: &ObjectId) -> AppResult<()>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(collection: Collection<User>) -> Self {
        Self { collection }
    }
}

fn identity_filter(username: Option<&str>, email: Option<&str>) -> Option<Vec<Document>> {
    let mut clauses = Vec::new();
    if let Some(username) = username {
        clauses.push(doc! { "username": username });
    }
    if let Some(email) = email {
        clauses.push(doc! { "email": email });
    }
    (!clauses.is_empty()).then_some(clauses)
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, mut user: User) -> AppResult<User> {
        if user.id.is_none() {
            user.id = Some(ObjectId::new());
        }
        self.collection.insert_one(&user).await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(user)
    }

    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AppResult<Option<User>> {
        let Some(clauses) = identity_filter(username, email) else {
            return Ok(None);
        };
        let user = self.collection.find_one(doc! { "$or": clauses }).await?;
        Ok(user)
    }

    async fn find_conflict(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<&ObjectId>,
    ) -> AppResult<Option<User>> {
        let Some(clauses) = identity_filter(username, email) else {
            return Ok(None);
        };
        let mut filter = doc! { "$or": clauses };
        if let Some(exclude) = exclude {
            filter.insert("_id", doc! { "$ne": exclude });
        }
        let user = self.collection.find_one(filter).await?;
        Ok(user)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let id = user
            .id
            .ok_or_else(|| AppError::InternalError("Cannot update a user without id".to_string()))?;
        let options = ReplaceOptions::builder().upsert(false).build();

        let result = self
            .collection
            .replace_one(doc! { "_id": id }, &user)
            .with_options(options)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User with id '{}' not found", id)));
        }

        Ok(user)
    }

    async fn push_quiz(&self, user_id: &ObjectId, quiz_id: &ObjectId) -> AppResult<Option<User>> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": user_id },
                doc! { "$push": { "userQuizes": quiz_id } },
            )
            .await?;

        if result.matched_count == 0 {
            return Ok(None);
        }
        self.find_by_id(user_id).await
    }

    async fn pull_quiz(&self, user_id: &ObjectId, quiz_id: &ObjectId) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "_id": user_id },
                doc! { "$pull": { "userQuizes": quiz_id } },
            )
            .await?;
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        for field in ["username", "email"] {
            let options = IndexOptions::builder()
                .unique(true)
                .name(format!("{}_unique", field))
                .build();
            let model = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(options)
                .build();

            self.collection.create_index(model).await?;
            log::info!("Created unique index on users.{}", field);
        }

        Ok(())
    }
}
