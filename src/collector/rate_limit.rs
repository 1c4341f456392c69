use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use reqwest::Method;
use tokio::time::sleep;

use crate::error::{RequestFailure, Result, SyncError};
use crate::schema::RateLimitResponse;
use crate::session::{GithubSession, ensure_success};

/// Snapshot of the `core` quota, read right before a call and dropped after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Quota guard run before every quota-consuming request.
///
/// If fewer than `low_water_mark` calls are left and the window reset
/// lies in the future, the calling flow sleeps until the reset.
/// A reset time already in the past means no wait at all.
///
/// Failures of the quota check itself are returned, never ignored.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitGate {
    low_water_mark: u32,
}

impl RateLimitGate {
    pub fn new(low_water_mark: u32) -> Self {
        Self { low_water_mark }
    }

    /// Checks the quota, waits if needed, and returns the remaining count.
    pub async fn check(&self, session: &GithubSession) -> Result<u32> {
        let status = fetch_status(session)
            .await
            .map_err(|source| SyncError::RateLimit { source })?;

        if let Some(wait) = self.wait_for(&status, Utc::now()) {
            warn!(
                "Rate limit low ({} remaining). Waiting {} seconds...",
                status.remaining,
                wait.as_secs_f64().round()
            );
            sleep(wait).await;
        }

        Ok(status.remaining)
    }

    /// How long to wait given a quota snapshot taken at `now`.
    pub fn wait_for(&self, status: &RateLimitStatus, now: DateTime<Utc>) -> Option<Duration> {
        if status.remaining >= self.low_water_mark {
            return None;
        }

        // Negative deltas (stale reset) fail the conversion
        (status.reset_at - now)
            .to_std()
            .ok()
            .filter(|wait| !wait.is_zero())
    }
}

async fn fetch_status(session: &GithubSession) -> std::result::Result<RateLimitStatus, RequestFailure> {
    let url = session.endpoint(&["rate_limit"]);
    let resp = ensure_success(session.send(Method::GET, &url).await?).await?;
    let body: RateLimitResponse = serde_json::from_str(&resp.text().await?)?;

    let core = body.resources.core;
    let reset_at = DateTime::from_timestamp(core.reset, 0)
        .ok_or_else(|| RequestFailure::Decode(format!("reset timestamp out of range: {}", core.reset)))?;

    Ok(RateLimitStatus {
        remaining: core.remaining,
        reset_at,
    })
}
