use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode, Url};
use tokio::time::sleep;

use crate::config::{Config, RetryPolicy};
use crate::error::{RequestFailure, Result, SyncError};

const USER_AGENT: &str = concat!("follow-sync/", env!("CARGO_PKG_VERSION"));

/// ============================================================
/// GithubSession
/// ============================================================
///
/// The one HTTP session used for a whole sync run.
///
/// Carries:
/// - the authenticated `reqwest::Client` (token + accept headers)
/// - the API root every endpoint is resolved against
/// - the retry policy for transient statuses
///
/// Built once from `Config` and only ever borrowed afterwards;
/// nothing mutates it after construction.
pub struct GithubSession {
    client: Client,
    api_base: Url,
    retry: RetryPolicy,
}

impl GithubSession {
    pub fn new(config: &Config) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("token {}", config.token))
            .map_err(|_| SyncError::Config("token contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SyncError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            retry: config.retry.clone(),
        })
    }

    /// Resolves path segments against the API root.
    ///
    /// Segments are percent-encoded individually, so a login can never
    /// escape its path position.
    ///
    /// EXAMPLE:
    /// - base `https://api.github.com`, `["user", "following", "octocat"]`
    ///   -> `https://api.github.com/user/following/octocat`
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        // http(s) base URLs always have path segments (checked in config)
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a request, retrying transient failures per the policy.
    ///
    /// Behavior:
    /// - statuses in the forcelist are retried with backoff
    /// - a numeric `Retry-After` on 429/503 replaces the computed delay
    /// - connect and timeout errors are retried the same way
    ///
    /// RETURNS:
    /// - the first non-retryable response, or the last response once
    ///   retries are exhausted; status checking is left to the caller
    pub async fn send(&self, method: Method, url: &Url) -> std::result::Result<Response, reqwest::Error> {
        let mut retries = 0;

        loop {
            debug!("{} {} (attempt {})", method, url, retries + 1);

            match self.client.request(method.clone(), url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    debug!("{} {} -> {}", method, url, status);

                    if self.retry.should_retry(status) && retries < self.retry.max_retries {
                        retries += 1;
                        let wait = retry_after(&resp).unwrap_or_else(|| self.retry.backoff(retries));
                        warn!(
                            "{} {} returned {}, retry {}/{} in {}ms",
                            method,
                            url,
                            status,
                            retries,
                            self.retry.max_retries,
                            wait.as_millis()
                        );
                        sleep(wait).await;
                        continue;
                    }

                    return Ok(resp);
                }

                Err(e) if (e.is_connect() || e.is_timeout()) && retries < self.retry.max_retries => {
                    retries += 1;
                    let wait = self.retry.backoff(retries);
                    warn!(
                        "{} {} failed: {}, retry {}/{} in {}ms",
                        method,
                        url,
                        e,
                        retries,
                        self.retry.max_retries,
                        wait.as_millis()
                    );
                    sleep(wait).await;
                }

                Err(e) => return Err(e),
            }
        }
    }
}

/// Turns a non-2xx response into a `RequestFailure::Status`.
pub async fn ensure_success(resp: Response) -> std::result::Result<Response, RequestFailure> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(RequestFailure::Status { status, body })
}

fn retry_after(resp: &Response) -> Option<Duration> {
    if !matches!(
        resp.status(),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    ) {
        return None;
    }

    resp.headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
