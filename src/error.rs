use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

// ------------------------------------------------------------
// Error taxonomy
// ------------------------------------------------------------
//
// Every stage of a sync run maps its failures onto one of the
// variants below. Nothing is swallowed: the first error ends the
// run and bubbles up to `main`, which exits non-zero.
//
// Transient statuses (429 / 5xx) never show up here directly;
// the session retries them first and only the final outcome
// is classified.
//
pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid configuration, raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// The quota check (`GET /rate_limit`) itself failed.
    #[error("rate limit check failed")]
    RateLimit {
        #[source]
        source: RequestFailure,
    },

    /// A page of a paginated listing could not be fetched or decoded.
    #[error("error fetching users from {url}")]
    Fetch {
        url: String,
        #[source]
        source: RequestFailure,
    },

    /// A follow / unfollow call failed.
    #[error("failed to {action} {login}")]
    Mutation {
        action: MutationKind,
        login: String,
        #[source]
        source: RequestFailure,
    },
}

/// Low-level reason a single request was rejected.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Connection, TLS or protocol level failure (after retries).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response (after retries).
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// 2xx response whose body or headers could not be interpreted.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for RequestFailure {
    fn from(err: serde_json::Error) -> Self {
        RequestFailure::Decode(err.to_string())
    }
}

impl SyncError {
    /// The error and all of its causes on one line, outermost first.
    pub fn describe(&self) -> String {
        anyhow::Chain::new(self)
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>()
            .join(": ")
    }
}

#[cfg(test)]
impl RequestFailure {
    /// HTTP status of the rejected response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestFailure::Status { status, .. } => Some(*status),
            RequestFailure::Transport(err) => err.status(),
            RequestFailure::Decode(_) => None,
        }
    }
}

/// The two mutating operations on the follow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Follow,
    Unfollow,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Follow => f.write_str("follow"),
            MutationKind::Unfollow => f.write_str("unfollow"),
        }
    }
}
