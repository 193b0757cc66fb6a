use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    errors::{AppError, AppResult},
    models::domain::Quiz,
};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<Quiz>>;
    async fn update(&self, quiz: Quiz) -> AppResult<Quiz>;
    /// Returns whether a document was removed.
    async fn delete(&self, id: &ObjectId) -> AppResult<bool>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(collection: Collection<Quiz>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create(&self, mut quiz: Quiz) -> AppResult<Quiz> {
        if quiz.id.is_none() {
            quiz.id = Some(ObjectId::new());
        }
        self.collection.insert_one(&quiz).await?;
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(quiz)
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<Quiz>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .collection
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        let quizzes: Vec<Quiz> = cursor.try_collect().await?;
        Ok(quizzes)
    }

    async fn update(&self, quiz: Quiz) -> AppResult<Quiz> {
        let id = quiz
            .id
            .ok_or_else(|| AppError::InternalError("Cannot update a quiz without id".to_string()))?;

        let result = self.collection.replace_one(doc! { "_id": id }, &quiz).await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Quiz with id '{}' not found", id)));
        }
        Ok(quiz)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let owner_index = IndexModel::builder()
            .keys(doc! { "userId": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(owner_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}
