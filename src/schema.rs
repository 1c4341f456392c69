use std::collections::HashSet;

use serde::Deserialize;

/// Opaque account identifier (the GitHub `login`).
///
/// Only equality and hashing are relied upon.
pub type Login = String;

/// Deduplicated, unordered set of accounts produced by one collection.
pub type UserSet = HashSet<Login>;

// ------------------------------------------------------------
// GET /rate_limit
// ------------------------------------------------------------
//
// Only the `core` bucket matters: it is the one consumed by the
// listing and follow endpoints. Other buckets (search, graphql,
// ...) are ignored by serde.
//
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitResources {
    pub core: RateLimitWindow,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitWindow {
    /// Calls left in the current window
    pub remaining: u32,

    /// Window reset, seconds since Unix epoch
    pub reset: i64,
}

// ------------------------------------------------------------
// GET /users/{account}/followers | /following
// ------------------------------------------------------------
//
// Each page is a JSON array of simple-user objects. Only `login`
// is read.
//
#[derive(Debug, Deserialize, Clone)]
pub struct UserItem {
    pub login: Login,
}
