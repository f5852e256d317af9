//! Shared HTTP client settings.

use std::time::Duration;

use url::Url;

use crate::error::HttpClientError;

/// Default connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for the reqwest client shared by the upload clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Per-request timeout, `None` for no limit.
    pub request_timeout: Option<Duration>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            user_agent: concat!("cruxclip-upload/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build a reqwest client from these settings.
    ///
    /// # Errors
    /// `ClientBuild` if the TLS backend cannot be initialized.
    pub fn build_client(&self) -> Result<reqwest::Client, HttpClientError> {
        let mut builder: reqwest::ClientBuilder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone());
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e: reqwest::Error| HttpClientError::ClientBuild {
            message: e.to_string(),
        })
    }
}

/// Parse `base` as a directory URL so relative joins append to its path.
///
/// `https://api.example.com/functions/v1/uploads` and the same URL with a
/// trailing slash both join `initialize` to `.../uploads/initialize`.
pub(crate) fn parse_base_url(base: &str) -> Result<Url, HttpClientError> {
    let mut url: Url = Url::parse(base.trim())
        .map_err(|e: url::ParseError| HttpClientError::invalid_url(base, e))?;
    if url.cannot_be_a_base() {
        return Err(HttpClientError::invalid_url(base, "not a base URL"));
    }
    if !url.path().ends_with('/') {
        let path: String = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Join a relative path onto a base URL from [`parse_base_url`].
pub(crate) fn join(base: &Url, path: &str) -> Result<Url, HttpClientError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e: url::ParseError| HttpClientError::invalid_url(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let base = parse_base_url("https://api.example.com/functions/v1/uploads").unwrap();
        assert_eq!(
            join(&base, "initialize").unwrap().as_str(),
            "https://api.example.com/functions/v1/uploads/initialize"
        );

        let base = parse_base_url("https://api.example.com/storage/v1/").unwrap();
        assert_eq!(
            join(&base, "/object/videos/u/1.mp4").unwrap().as_str(),
            "https://api.example.com/storage/v1/object/videos/u/1.mp4"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(HttpClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_base_url("mailto:coach@example.com"),
            Err(HttpClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_default_settings_build() {
        let settings = HttpSettings::default().with_request_timeout(Duration::from_secs(60));
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(60)));
        assert!(settings.build_client().is_ok());
    }
}
