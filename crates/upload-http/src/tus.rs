//! tus 1.0.0 resumable upload transport.
//!
//! Implements the three protocol primitives the resumable session needs:
//!
//! - **Creation** - `POST endpoint` with `Upload-Length` and `Upload-Metadata`,
//!   the upload URL comes back in `Location`
//! - **Offset** - `HEAD upload_url`, the server offset comes back in `Upload-Offset`
//! - **Append** - `PATCH upload_url` with `Upload-Offset` and the chunk body

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use url::Url;

use cruxclip_upload::{ResumableEndpoint, ResumableTransport, StoreError};

use crate::error::{check_status, HttpClientError};
use crate::settings::HttpSettings;

pub const TUS_RESUMABLE_HEADER: &str = "Tus-Resumable";
pub const TUS_VERSION: &str = "1.0.0";
pub const UPLOAD_LENGTH_HEADER: &str = "Upload-Length";
pub const UPLOAD_OFFSET_HEADER: &str = "Upload-Offset";
pub const UPLOAD_METADATA_HEADER: &str = "Upload-Metadata";
pub const OFFSET_OCTET_STREAM: &str = "application/offset+octet-stream";

/// `ResumableTransport` speaking the tus protocol over reqwest.
#[derive(Debug, Clone)]
pub struct TusTransport {
    http: reqwest::Client,
    bucket: Option<String>,
}

impl TusTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, HttpClientError> {
        Ok(Self::with_client(settings.build_client()?))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http, bucket: None }
    }

    /// Announce `bucket` as `bucketName` metadata on every created upload.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        endpoint: &ResumableEndpoint,
    ) -> reqwest::RequestBuilder {
        let mut request: reqwest::RequestBuilder = self
            .http
            .request(method, url)
            .header(TUS_RESUMABLE_HEADER, TUS_VERSION);
        for (name, value) in &endpoint.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    async fn create_upload(
        &self,
        endpoint: &ResumableEndpoint,
        total_size: u64,
        metadata: &[(String, String)],
    ) -> Result<String, HttpClientError> {
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(metadata.len() + 1);
        if let Some(bucket) = &self.bucket {
            pairs.push(("bucketName".to_string(), bucket.clone()));
        }
        pairs.extend(metadata.iter().cloned());

        log::debug!("tus create at {} ({} bytes)", endpoint.url, total_size);
        let response: reqwest::Response = self
            .request(reqwest::Method::POST, &endpoint.url, endpoint)
            .header(UPLOAD_LENGTH_HEADER, total_size.to_string())
            .header(UPLOAD_METADATA_HEADER, encode_metadata(&pairs))
            .send()
            .await?;
        let response: reqwest::Response = check_status(response).await?;

        let location: &str = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value: &reqwest::header::HeaderValue| value.to_str().ok())
            .ok_or_else(|| HttpClientError::Decode {
                message: "tus create response has no Location header".to_string(),
            })?;
        resolve_location(&endpoint.url, location)
    }

    async fn head_offset(
        &self,
        endpoint: &ResumableEndpoint,
        upload_url: &str,
    ) -> Result<u64, HttpClientError> {
        let response: reqwest::Response = self
            .request(reqwest::Method::HEAD, upload_url, endpoint)
            .send()
            .await?;
        let response: reqwest::Response = check_status(response).await?;
        upload_offset(&response)
    }

    async fn append(
        &self,
        endpoint: &ResumableEndpoint,
        upload_url: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, HttpClientError> {
        log::debug!("tus append at {} ({} bytes)", offset, data.len());
        let response: reqwest::Response = self
            .request(reqwest::Method::PATCH, upload_url, endpoint)
            .header(UPLOAD_OFFSET_HEADER, offset.to_string())
            .header(reqwest::header::CONTENT_TYPE, OFFSET_OCTET_STREAM)
            .body(data)
            .send()
            .await?;
        let response: reqwest::Response = check_status(response).await?;
        upload_offset(&response)
    }
}

#[async_trait]
impl ResumableTransport for TusTransport {
    async fn create(
        &self,
        endpoint: &ResumableEndpoint,
        total_size: u64,
        metadata: &[(String, String)],
    ) -> Result<String, StoreError> {
        Ok(self.create_upload(endpoint, total_size, metadata).await?)
    }

    async fn offset(
        &self,
        endpoint: &ResumableEndpoint,
        upload_url: &str,
    ) -> Result<u64, StoreError> {
        Ok(self.head_offset(endpoint, upload_url).await?)
    }

    async fn patch(
        &self,
        endpoint: &ResumableEndpoint,
        upload_url: &str,
        offset: u64,
        data: Bytes,
    ) -> Result<u64, StoreError> {
        Ok(self.append(endpoint, upload_url, offset, data).await?)
    }
}

/// Encode metadata as `key base64(value)` pairs separated by commas.
pub fn encode_metadata(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value): &(String, String)| format!("{} {}", key, BASE64.encode(value)))
        .collect::<Vec<String>>()
        .join(",")
}

/// Resolve a possibly relative `Location` header against the creation URL.
fn resolve_location(endpoint_url: &str, location: &str) -> Result<String, HttpClientError> {
    let base: Url = Url::parse(endpoint_url)
        .map_err(|e: url::ParseError| HttpClientError::invalid_url(endpoint_url, e))?;
    base.join(location)
        .map(|url: Url| url.to_string())
        .map_err(|e: url::ParseError| HttpClientError::invalid_url(location, e))
}

fn upload_offset(response: &reqwest::Response) -> Result<u64, HttpClientError> {
    response
        .headers()
        .get(UPLOAD_OFFSET_HEADER)
        .and_then(|value: &reqwest::header::HeaderValue| value.to_str().ok())
        .and_then(|value: &str| value.trim().parse::<u64>().ok())
        .ok_or_else(|| HttpClientError::Decode {
            message: "response has no valid Upload-Offset header".to_string(),
        })
}
