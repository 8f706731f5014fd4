use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::settings::CloudinarySettings;
use crate::media::{MediaError, MediaResolver, MediaUpload};

/// Media backend over the Cloudinary upload API, using signed requests
/// (SHA-256 request signatures, which Cloudinary accepts alongside SHA-1).
pub struct CloudinaryResolver {
    http: reqwest::Client,
    settings: CloudinarySettings,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryResolver {
    pub fn new(settings: CloudinarySettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// Cloudinary request signature: the signed params sorted by name,
    /// joined `k=v` with `&`, with the API secret appended, hashed.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort();
        let joined = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.settings.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{action}",
            self.settings.cloud_name
        )
    }
}

#[async_trait]
impl MediaResolver for CloudinaryResolver {
    async fn upload(
        &self,
        file: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<MediaUpload, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", folder), ("timestamp", &timestamp)]);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(file).file_name(file_name.to_string()),
            )
            .text("api_key", self.settings.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_string())
            .text("signature", signature);

        let response = self
            .http
            .post(self.endpoint("auto/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Cloudinary upload error: {e}");
                MediaError::new("Failed to upload file to Cloudinary")
            })?;

        if !response.status().is_success() {
            tracing::error!("Cloudinary upload rejected: {}", response.status());
            return Err(MediaError::new("Failed to upload file to Cloudinary"));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|_| MediaError::new("Failed to upload file to Cloudinary"))?;

        Ok(MediaUpload {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let response = self
            .http
            .post(self.endpoint("image/destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", &self.settings.api_key),
                ("timestamp", &timestamp),
                ("signature", &signature),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Cloudinary delete error: {e}");
                MediaError::new("Failed to delete file from Cloudinary")
            })?;

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|_| MediaError::new("Failed to delete file from Cloudinary"))?;

        // "not found" acks are fine: the asset is already gone.
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => {
                tracing::error!("Cloudinary destroy returned {other:?} for {public_id}");
                Err(MediaError::new("Failed to delete file from Cloudinary"))
            }
        }
    }
}
