use std::time::Duration;

use reqwest::Response;
use reqwest::header::CONTENT_LENGTH;

use crate::config::AerialConfig;
use crate::error::Result;

/// HTTP client for the wallpaper CDN.
///
/// Wraps one configured `reqwest::Client`. Plain HTTP and HTTPS URLs are
/// served by the same client; certificate validation follows the explicit
/// `accept_invalid_certs` configuration flag and is never inferred from the
/// URL scheme.
#[derive(Debug, Clone)]
pub struct TransferClient {
    http: reqwest::Client,
}

impl TransferClient {
    pub fn new(config: &AerialConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.transfer_timeout_secs))
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { http })
    }

    /// Probe the remote size of `url` with a HEAD request.
    ///
    /// Returns the declared Content-Length, or 0 when the header is absent or
    /// the request fails for any reason. 0 means "size unknown", never a hard
    /// error; transport problems surface later, on the actual transfer.
    pub async fn probe_size(&self, url: &str) -> u64 {
        let response = match self.http.head(url).send().await {
            Ok(response) => response,
            Err(_) => return 0,
        };

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }

    /// Issue the full GET for `url`.
    ///
    /// The caller inspects the status and streams the body; dropping the
    /// response releases the connection on every exit path.
    pub async fn fetch(&self, url: &str) -> Result<Response> {
        Ok(self.http.get(url).send().await?)
    }
}
