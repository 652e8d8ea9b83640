use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// External object-storage collaborator. Uploads happen before the aggregate
/// transaction opens; a later rollback leaves the uploaded image orphaned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, data: Bytes, file_name: &str, folder: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Clone)]
pub struct HttpImageStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpImageStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, data: Bytes, file_name: &str, folder: &str) -> Result<String> {
        let part = multipart::Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = multipart::Form::new()
            .part("file", part)
            .text("folder", folder.to_string());

        let mut request = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Image store rejected upload: {}",
                response.status()
            )));
        }

        let body: UploadResponse = response.json().await?;
        info!(url = %body.url, "Image uploaded");
        Ok(body.url)
    }
}
