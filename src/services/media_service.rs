use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::{
    config::Config,
    errors::{AppError, AppResult},
};

/// Raw image bytes received from a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: Option<String>,
}

/// Where the image host put an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload_image(&self, image: ImageUpload) -> AppResult<StoredImage>;
    async fn delete_image(&self, public_id: &str) -> AppResult<()>;
}

pub struct CloudinaryMediaStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

impl CloudinaryMediaStore {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cloud_name: config.cloudinary_cloud_name.clone(),
            api_key: config.cloudinary_api_key.clone(),
            api_secret: config.cloudinary_api_secret.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.cloud_name, action
        )
    }

    fn signed_form(&self, params: BTreeMap<&'static str, String>) -> Form {
        let signature = sign_params(&params, self.api_secret.expose_secret());

        params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
    }

    async fn send(&self, action: &str, form: Form) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(action))
            .multipart(form)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = match response.json::<CloudinaryErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("image host returned {}", status),
        };
        log::error!("Cloudinary {} failed ({}): {}", action, status, message);
        Err(AppError::UpstreamError(message))
    }
}

/// Cloudinary request signature: `k=v` pairs sorted by key and joined by `&`,
/// followed by the API secret, hashed with SHA-1.
fn sign_params(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryMediaStore {
    async fn upload_image(&self, image: ImageUpload) -> AppResult<StoredImage> {
        let mut params = BTreeMap::new();
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let mut part = Part::bytes(image.bytes).file_name(image.file_name);
        if let Some(content_type) = image.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| AppError::ValidationError(format!("Invalid content type: {}", e)))?;
        }

        let form = self.signed_form(params).part("file", part);
        let uploaded: UploadResponse = self.send("upload", form).await?.json().await?;

        log::info!("Uploaded image {}", uploaded.public_id);
        Ok(StoredImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete_image(&self, public_id: &str) -> AppResult<()> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let destroyed: DestroyResponse = self
            .send("destroy", self.signed_form(params))
            .await?
            .json()
            .await?;

        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                log::warn!("Image {} was already gone from the image host", public_id);
                Ok(())
            }
            other => Err(AppError::UpstreamError(format!(
                "Failed to delete image {}: {}",
                public_id, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_known_vector() {
        // Worked example from the image host's signing documentation.
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());

        assert_eq!(
            sign_params(&params, "abcd"),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn test_endpoint_uses_cloud_name() {
        let store = CloudinaryMediaStore::new(&Config::test_config()).expect("client");
        assert!(store
            .endpoint("upload")
            .ends_with(&format!("/{}/image/upload", Config::test_config().cloudinary_cloud_name)));
    }
}
