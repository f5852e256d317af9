//! Object-store writes over the storage REST API.

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use cruxclip_upload::{AccessToken, ObjectStore, StoreError, WriteOptions};

use crate::error::{check_status, HttpClientError};
use crate::settings::{join, parse_base_url, HttpSettings};

/// Header asking the store to overwrite an existing object.
pub const UPSERT_HEADER: &str = "x-upsert";
/// Header carrying the project API key, when configured.
pub const API_KEY_HEADER: &str = "apikey";

/// `ObjectStore` implementation writing `POST {base}/object/{bucket}/{location}`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    http: reqwest::Client,
    base_url: Url,
    bucket: String,
    api_key: Option<String>,
}

impl HttpObjectStore {
    /// Create a store client.
    ///
    /// # Arguments
    /// * `base_url` - Storage API root, e.g. `https://project.example.com/storage/v1`
    /// * `bucket` - Bucket every object is written to
    /// * `settings` - Timeouts and user agent
    pub fn new(
        base_url: &str,
        bucket: impl Into<String>,
        settings: &HttpSettings,
    ) -> Result<Self, HttpClientError> {
        Self::with_client(settings.build_client()?, base_url, bucket)
    }

    /// Create a store client sharing an existing reqwest client.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        bucket: impl Into<String>,
    ) -> Result<Self, HttpClientError> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            bucket: bucket.into(),
            api_key: None,
        })
    }

    /// Send `api_key` with every write.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The bucket objects are written to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// URL of the object at `location`.
    pub fn object_url(&self, location: &str) -> Result<Url, HttpClientError> {
        join(
            &self.base_url,
            &format!("object/{}/{}", self.bucket, location.trim_start_matches('/')),
        )
    }

    async fn post_object(
        &self,
        location: &str,
        data: Bytes,
        options: &WriteOptions,
        token: &AccessToken,
    ) -> Result<(), HttpClientError> {
        let url: Url = self.object_url(location)?;
        log::debug!("POST {} ({} bytes)", url, data.len());

        let mut request: reqwest::RequestBuilder = self
            .http
            .post(url)
            .bearer_auth(token.as_str())
            .header(reqwest::header::CONTENT_TYPE, options.content_type.as_str())
            .header(
                reqwest::header::CACHE_CONTROL,
                format!("max-age={}", options.cache_control),
            )
            .header(UPSERT_HEADER, if options.upsert { "true" } else { "false" })
            .body(data);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key.as_str());
        }

        check_status(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn write(
        &self,
        location: &str,
        data: Bytes,
        options: &WriteOptions,
        token: &AccessToken,
    ) -> Result<(), StoreError> {
        Ok(self.post_object(location, data, options, token).await?)
    }
}
