use reqwest::StatusCode;

use crate::error::Result;
use crate::schema::UserSet;

/// FollowGraph is the seam between:
/// - the reconciliation flow (what to follow / unfollow)
/// - a concrete platform API (how to read and change the graph)
///
/// Each implementation must:
/// - Return complete sets from `followers` / `following`
/// - Apply the rate-limit policy of its platform itself
/// - Report the first failure instead of skipping items
///
/// THREAD SAFETY:
/// - Must be Send + Sync, even though the flow never shares it
///   across tasks today
///
#[async_trait::async_trait]
pub trait FollowGraph: Send + Sync {

    /// Account whose graph is being reconciled (used in logs).
    fn account(&self) -> &str;

    /// Accounts following `account()`.
    async fn followers(&self) -> Result<UserSet>;

    /// Accounts `account()` follows.
    async fn following(&self) -> Result<UserSet>;

    /// Starts following `login`.
    ///
    /// RETURNS:
    /// - the success status reported by the platform
    async fn follow(&self, login: &str) -> Result<StatusCode>;

    /// Stops following `login`.
    async fn unfollow(&self, login: &str) -> Result<StatusCode>;
}
