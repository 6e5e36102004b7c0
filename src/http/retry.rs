//! Error classification for download retries.

use reqwest::StatusCode;

/// Maximum number of attempts for a download.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// HTTP 404: the archive is not hosted at the configured base URL
    NotFound(String),
    /// HTTP 401/403
    Forbidden(String),
    /// HTTP 429
    RateLimited(String),
    /// Other client errors that won't succeed on retry
    ClientError(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::NotFound(url) => {
                write!(f, "Not found: {}. Check the --base-url setting.", url)
            }
            NonRetryableError::Forbidden(url) => {
                write!(f, "Access forbidden: {}", url)
            }
            NonRetryableError::RateLimited(url) => {
                write!(f, "Too many requests to {}. Try again later.", url)
            }
            NonRetryableError::ClientError(msg) => {
                write!(f, "Request error: {}", msg)
            }
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classifies a response status. `Ok(())` means a retry may succeed.
pub fn classify_status(status: StatusCode, url: &str) -> Result<(), NonRetryableError> {
    match status {
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound(url.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(NonRetryableError::Forbidden(url.to_string()))
        }
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimited(url.to_string())),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(format!(
            "HTTP {} from {}",
            s.as_u16(),
            url
        ))),
        // 5xx is worth another attempt
        _ => Ok(()),
    }
}

/// Converts an error from `error_for_status()` into an `anyhow::Error`,
/// replacing it with a `NonRetryableError` when retrying is pointless.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    let url = error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "<unknown>".to_string());
    match error.status().map(|status| classify_status(status, &url)) {
        Some(Err(non_retryable)) => anyhow::Error::from(non_retryable),
        _ => anyhow::Error::from(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        let url = "https://example.com/Linux_x64.zip";
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, url),
            Err(NonRetryableError::NotFound(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, url),
            Err(NonRetryableError::Forbidden(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, url),
            Err(NonRetryableError::Forbidden(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, url),
            Err(NonRetryableError::RateLimited(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, url),
            Err(NonRetryableError::ClientError(_))
        ));
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, url).is_ok());
        assert!(classify_status(StatusCode::BAD_GATEWAY, url).is_ok());
    }

    #[test]
    fn test_non_retryable_error_display() {
        let err = NonRetryableError::NotFound("https://host/a.zip".to_string());
        assert!(err.to_string().contains("https://host/a.zip"));
        assert!(err.to_string().contains("--base-url"));

        let err = NonRetryableError::ClientError("HTTP 400 from x".to_string());
        assert!(err.to_string().contains("Request error"));
    }

    #[tokio::test]
    async fn test_check_retryable_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(404)
            .create_async()
            .await;

        let response = reqwest::Client::new()
            .get(server.url())
            .send()
            .await
            .unwrap();
        let err = response.error_for_status().unwrap_err();

        let result = check_retryable(err);
        assert!(matches!(
            result.downcast_ref::<NonRetryableError>(),
            Some(NonRetryableError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_check_retryable_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(503)
            .create_async()
            .await;

        let response = reqwest::Client::new()
            .get(server.url())
            .send()
            .await
            .unwrap();
        let err = response.error_for_status().unwrap_err();

        let result = check_retryable(err);
        assert!(result.downcast_ref::<NonRetryableError>().is_none());
    }
}
