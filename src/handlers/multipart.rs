use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::TryStreamExt;

use crate::{
    errors::{AppError, AppResult},
    services::media_service::ImageUpload,
};

/// Upper bound for any single text part.
pub const MAX_TEXT_FIELD_BYTES: usize = 4 * 1024;

/// Text fields and the (optional) file of a multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub file: Option<ImageUpload>,
}

impl FormData {
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Drains a multipart payload, keeping the part named `file_field` as bytes
/// (capped at `max_file_bytes`) and every other part as UTF-8 text capped at
/// [`MAX_TEXT_FIELD_BYTES`].
pub async fn read_form(
    mut payload: Multipart,
    file_field: &str,
    max_file_bytes: usize,
) -> AppResult<FormData> {
    let mut form = FormData::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .unwrap_or("upload")
                .to_string();
            let content_type = field.content_type().map(|m| m.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.try_next().await? {
                if bytes.len() + chunk.len() > max_file_bytes {
                    return Err(AppError::ValidationError(format!(
                        "{} exceeds the {} byte limit",
                        file_field, max_file_bytes
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            if !bytes.is_empty() {
                form.file = Some(ImageUpload {
                    bytes,
                    file_name,
                    content_type,
                });
            }
            continue;
        }

        let mut value = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if value.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                return Err(AppError::ValidationError(format!(
                    "{} exceeds the {} byte limit",
                    name, MAX_TEXT_FIELD_BYTES
                )));
            }
            value.extend_from_slice(&chunk);
        }
        let value = String::from_utf8(value)
            .map_err(|_| AppError::ValidationError(format!("{} must be text", name)))?;
        form.fields.insert(name, value);
    }

    Ok(form)
}
