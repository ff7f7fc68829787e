//! Shared HTTP plumbing for model providers
//!
//! Each provider builds its own `RequestBuilder` (auth headers differ) and sends it
//! through an [`Endpoint`], which handles logging, transient-status triage and retries.

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::utils::log_sanitizer::truncate_for_log;

/// Upper bound for a server-suggested `Retry-After` wait.
const MAX_RETRY_AFTER_SECS: u64 = 30;
const MAX_BACKOFF_MS: u64 = 10_000;

/// Status codes worth another attempt; 529 is Anthropic's "overloaded".
fn is_transient_status(status: u16) -> bool {
    matches!(status, 500 | 502..=504 | 529)
}

/// Status and body of a response that was not a transient failure
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One chat endpoint of one provider, used for log and error context.
pub struct Endpoint<'a> {
    pub provider: &'a str,
    pub url: &'a str,
}

impl Endpoint<'_> {
    /// Send once.
    ///
    /// HTTP 429 becomes [`ProviderError::RateLimited`] and transient 5xx statuses become
    /// [`ProviderError::NetworkError`]; any other status is returned for the provider to map.
    pub async fn send(&self, request: RequestBuilder) -> Result<RawResponse, ProviderError> {
        let provider = self.provider;
        log::debug!("[{provider}] POST {}", self.url);

        let response = request.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status().as_u16();
        log::debug!("[{provider}] HTTP {status}");

        if status == 429 {
            let retry_after = retry_after_secs(&response);
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider}] Rate limited, retry_after={retry_after:?}");
            return Err(ProviderError::RateLimited {
                provider: provider.to_string(),
                retry_after,
                raw_message: Some(body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                provider: provider.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        if is_transient_status(status) {
            log::warn!("[{provider}] Server error (HTTP {status})");
            return Err(ProviderError::NetworkError {
                provider: provider.to_string(),
                detail: format!("HTTP {status}: {}", truncate_for_log(&body)),
            });
        }

        log::debug!("[{provider}] Body: {}", truncate_for_log(&body));
        Ok(RawResponse { status, body })
    }

    /// [`send`](Self::send) with up to `max_retries` extra attempts for retryable errors.
    ///
    /// Waits 100ms, 200ms, 400ms and so on, capped at 10s; a `Retry-After` on a 429 wins
    /// (capped at 30s).
    pub async fn send_with_retry(
        &self,
        request: RequestBuilder,
        max_retries: u32,
    ) -> Result<RawResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            // Body-streaming requests cannot be cloned; they get a single attempt
            let Some(this_try) = request.try_clone() else {
                return self.send(request).await;
            };

            match self.send(this_try).await {
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    let delay = retry_delay(&e, attempt);
                    attempt += 1;
                    log::warn!(
                        "[{}] Attempt {attempt}/{} failed, retrying in {:.1}s: {e}",
                        self.provider,
                        max_retries + 1,
                        delay.as_secs_f32(),
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Decode a success body.
    pub fn parse_json<T: DeserializeOwned>(&self, body: &str) -> Result<T, ProviderError> {
        serde_json::from_str(body).map_err(|e| {
            log::error!(
                "[{}] Undecodable response ({e}): {}",
                self.provider,
                truncate_for_log(body)
            );
            ProviderError::ParseError {
                provider: self.provider.to_string(),
                detail: e.to_string(),
            }
        })
    }

    fn transport_error(&self, e: &reqwest::Error) -> ProviderError {
        let provider = self.provider.to_string();
        let detail = e.to_string();
        if e.is_timeout() {
            ProviderError::Timeout { provider, detail }
        } else {
            ProviderError::NetworkError { provider, detail }
        }
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn retry_delay(error: &ProviderError, attempt: u32) -> Duration {
    match error {
        ProviderError::RateLimited {
            retry_after: Some(secs),
            ..
        } => Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS)),
        _ => backoff_delay(attempt),
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1_u64 << attempt.min(20);
    Duration::from_millis(100_u64.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_100ms() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_delay(10), Duration::from_secs(10));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn retry_after_wins_but_is_capped() {
        let limited = |secs| ProviderError::RateLimited {
            provider: "t".into(),
            retry_after: secs,
            raw_message: None,
        };
        assert_eq!(retry_delay(&limited(Some(5)), 0), Duration::from_secs(5));
        assert_eq!(
            retry_delay(&limited(Some(600)), 0),
            Duration::from_secs(MAX_RETRY_AFTER_SECS)
        );
        assert_eq!(retry_delay(&limited(None), 2), Duration::from_millis(400));
    }

    #[test]
    fn transient_statuses() {
        for status in [500, 502, 503, 504, 529] {
            assert!(is_transient_status(status), "{status}");
        }
        for status in [200, 400, 401, 404, 429, 501] {
            assert!(!is_transient_status(status), "{status}");
        }
    }

    #[test]
    fn parse_json_reports_provider() {
        let endpoint = Endpoint {
            provider: "openai",
            url: "http://localhost",
        };
        let err = endpoint
            .parse_json::<serde_json::Value>("{not json")
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ParseError { ref provider, .. } if provider == "openai"
        ));
    }
}
