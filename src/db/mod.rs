use std::time::Duration;

use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};

use crate::{
    config::Config,
    errors::AppResult,
    models::domain::{Quiz, User},
};

const APP_NAME: &str = "quizzii-server";

/// Handle to the quiz database and its two collections.
#[derive(Clone)]
pub struct Database {
    client: Client,
    database: mongodb::Database,
    users_collection: String,
    quizzes_collection: String,
}

impl Database {
    /// Connects and pings the deployment before returning.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut options = ClientOptions::parse(&config.mongo_conn_string).await?;
        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        options.app_name = Some(APP_NAME.to_string());
        options.min_pool_size = Some(2);
        options.max_pool_size = Some(10);
        options.connect_timeout = Some(Duration::from_secs(5));
        options.server_selection_timeout = Some(Duration::from_secs(5));

        let client = Client::with_options(options)?;
        let db = Self {
            database: client.database(&config.mongo_db_name),
            client,
            users_collection: config.users_collection.clone(),
            quizzes_collection: config.quizzes_collection.clone(),
        };
        db.ping().await?;

        log::info!(
            "Connected to MongoDB database '{}' (users: {}, quizzes: {})",
            config.mongo_db_name,
            db.users_collection,
            db.quizzes_collection
        );
        Ok(db)
    }

    pub fn users(&self) -> Collection<User> {
        self.database.collection(&self.users_collection)
    }

    pub fn quizzes(&self) -> Collection<Quiz> {
        self.database.collection(&self.quizzes_collection)
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}
