use secrecy::SecretString;
use std::env;

const DEV_JWT_SECRET: &str = "dev_secret_key_change_in_production";

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub users_collection: String,
    pub quizzes_collection: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub cors_origin: String,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub refresh_token_expiration_hours: i64,
    pub cookie_secure: bool,
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub generation_timeout_secs: u64,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: SecretString,
    pub http_timeout_secs: u64,
    pub max_avatar_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "quizzii-local".to_string()),
            users_collection: env::var("USERS_COLLECTION").unwrap_or_else(|_| "users".to_string()),
            quizzes_collection: env::var("QUIZZES_COLLECTION")
                .unwrap_or_else(|_| "quizzes".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: parse_env("WEB_SERVER_PORT", 8080),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            ),
            jwt_expiration_hours: parse_env("JWT_EXPIRATION_HOURS", 24),
            refresh_token_expiration_hours: parse_env("REFRESH_TOKEN_EXPIRATION_HOURS", 240),
            cookie_secure: parse_env("COOKIE_SECURE", true),
            gemini_api_key: SecretString::from(env::var("GEMINI_API_KEY").unwrap_or_default()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
            }),
            generation_timeout_secs: parse_env("GENERATION_TIMEOUT_SECS", 60),
            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
            cloudinary_api_secret: SecretString::from(
                env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
            ),
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", 30),
            max_avatar_bytes: parse_env("MAX_AVATAR_BYTES", 5 * 1024 * 1024),
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are missing or using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEV_JWT_SECRET {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.gemini_api_key.expose_secret().is_empty() {
            panic!("FATAL: GEMINI_API_KEY is not set! Quiz generation cannot work without it.");
        }

        if self.cloudinary_cloud_name.is_empty()
            || self.cloudinary_api_key.is_empty()
            || self.cloudinary_api_secret.expose_secret().is_empty()
        {
            panic!(
                "FATAL: Cloudinary credentials are incomplete! Set CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET."
            );
        }
    }

    pub fn is_production() -> bool {
        env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false)
    }

    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "quizzii-test".to_string(),
            users_collection: "users".to_string(),
            quizzes_collection: "quizzes".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            cors_origin: "http://localhost:5173".to_string(),
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            refresh_token_expiration_hours: 24,
            cookie_secure: false,
            gemini_api_key: SecretString::from("test-gemini-key".to_string()),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_base_url: "http://localhost:9999/openai".to_string(),
            generation_timeout_secs: 60,
            cloudinary_cloud_name: "test-cloud".to_string(),
            cloudinary_api_key: "123456".to_string(),
            cloudinary_api_secret: SecretString::from("cloud-secret".to_string()),
            http_timeout_secs: 5,
            max_avatar_bytes: 1024 * 1024,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
