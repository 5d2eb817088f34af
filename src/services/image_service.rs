use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;
use crate::error::{AppError, AppResult};

pub const HOUSE_IMAGES_FOLDER: &str = "bondihub/houses";
const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed uploads to the Cloudinary image CDN.
pub struct ImageService {
    client: reqwest::Client,
    config: CloudinaryConfig,
    api_base: String,
}

impl ImageService {
    pub fn new(config: CloudinaryConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_base(client, config, CLOUDINARY_API))
    }

    pub fn with_base(client: reqwest::Client, config: CloudinaryConfig, api_base: &str) -> Self {
        Self {
            client,
            config,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Uploads one image and returns its HTTPS URL.
    pub async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> AppResult<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", folder), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let file = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::File(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(format!("{}/{}/image/upload", self.api_base, self.config.cloud_name))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Image upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(AppError::External(format!("Image upload failed: {}", reason)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("Unexpected image CDN response: {}", e)))?;

        Ok(uploaded.secure_url)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as a
/// query string, suffixed with the secret and hashed.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{:x}", Sha256::digest(format!("{}{}", joined, secret).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Multipart, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    use crate::services::payment::testing::spawn_mock;

    fn config() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "bondihub".to_string(),
            api_key: "123".to_string(),
            api_secret: "abc".to_string(),
        }
    }

    #[test]
    fn signature_is_order_independent() {
        let a = sign(&[("timestamp", "1"), ("folder", "f")], "secret");
        let b = sign(&[("folder", "f"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign(&[("folder", "f"), ("timestamp", "1")], "other"));
    }

    #[tokio::test]
    async fn upload_returns_secure_url() {
        let router = Router::new().route(
            "/bondihub/image/upload",
            post(|mut multipart: Multipart| async move {
                let mut names = Vec::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    names.push(field.name().unwrap_or_default().to_string());
                }
                let signed = names.iter().any(|n| n == "signature");
                let has_file = names.iter().any(|n| n == "file");
                if signed && has_file {
                    (
                        StatusCode::OK,
                        Json(json!({"secure_url": "https://res.cloudinary.com/bondihub/x.jpg"})),
                    )
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"error": {"message": "Missing required parameter"}})),
                    )
                }
            }),
        );
        let base = spawn_mock(router).await;
        let service = ImageService::with_base(reqwest::Client::new(), config(), &base);

        let url = service
            .upload(HOUSE_IMAGES_FOLDER, "front.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF])
            .await
            .unwrap();

        assert_eq!(url, "https://res.cloudinary.com/bondihub/x.jpg");
    }

    #[tokio::test]
    async fn cdn_error_message_is_surfaced() {
        let router = Router::new().route(
            "/bondihub/image/upload",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {"message": "Invalid Signature"}})),
                )
            }),
        );
        let base = spawn_mock(router).await;
        let service = ImageService::with_base(reqwest::Client::new(), config(), &base);

        let err = service
            .upload(HOUSE_IMAGES_FOLDER, "a.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::External(msg) if msg.contains("Invalid Signature")));
    }
}
