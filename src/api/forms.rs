//! Multipart form collection for the upload endpoints.

use axum::extract::Multipart;
use std::collections::HashMap;

use super::ApiError;
use crate::storage::Upload;

/// Text fields and files of one multipart request.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("Multipart error: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(filename) if !filename.is_empty() => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::validation(format!("Failed to read '{name}': {e}")))?;
                    form.files.insert(
                        name,
                        Upload {
                            filename,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                // A file input submitted without a file.
                Some(_) => {}
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::validation(format!("Failed to read '{name}': {e}")))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A text field, or an empty string when absent.
    #[must_use]
    pub fn text_or_default(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    /// An integer field; absent or blank gives `default`.
    pub fn int_or(&self, name: &str, default: i32) -> Result<i32, ApiError> {
        match self.text(name).map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::validation(format!("'{name}' must be a whole number"))),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
