use log::info;
use reqwest::{Method, StatusCode, Url};

use crate::{
    collector::{pages::collect_logins, rate_limit::RateLimitGate},
    config::Config,
    error::{MutationKind, Result, SyncError},
    schema::UserSet,
    session::{GithubSession, ensure_success},
};

use super::adapter::FollowGraph;

/// GitHub REST v3 follow graph
///
/// Endpoints:
/// - GET    /users/{account}/followers
/// - GET    /users/{account}/following
/// - PUT    /user/following/{login}    → follow
/// - DELETE /user/following/{login}    → unfollow
///
/// Mutations act on the *authenticated* user, so the token must
/// belong to `account` for the reconciliation to make sense.
///
/// Every request (page or mutation) passes the rate-limit gate first.
pub struct GithubGraph<'a> {
    session: &'a GithubSession,
    gate: RateLimitGate,
    account: String,
    per_page: u32,
}

impl<'a> GithubGraph<'a> {
    pub fn new(session: &'a GithubSession, config: &Config) -> Self {
        Self {
            session,
            gate: RateLimitGate::new(config.low_water_mark),
            account: config.account.clone(),
            per_page: config.per_page,
        }
    }

    fn listing(&self, relation: &str) -> Url {
        let mut url = self.session.endpoint(&["users", &self.account, relation]);
        url.query_pairs_mut()
            .append_pair("per_page", &self.per_page.to_string());
        url
    }

    async fn mutate(&self, kind: MutationKind, login: &str) -> Result<StatusCode> {
        self.gate.check(self.session).await?;

        let method = match kind {
            MutationKind::Follow => Method::PUT,
            MutationKind::Unfollow => Method::DELETE,
        };
        let url = self.session.endpoint(&["user", "following", login]);

        let outcome = match self.session.send(method, &url).await {
            Ok(resp) => ensure_success(resp).await.map(|resp| resp.status()),
            Err(e) => Err(e.into()),
        };

        outcome.map_err(|source| SyncError::Mutation {
            action: kind,
            login: login.to_string(),
            source,
        })
    }
}

#[async_trait::async_trait]
impl<'a> FollowGraph for GithubGraph<'a> {

    fn account(&self) -> &str {
        &self.account
    }

    async fn followers(&self) -> Result<UserSet> {
        collect_logins(self.session, &self.gate, self.listing("followers")).await
    }

    async fn following(&self) -> Result<UserSet> {
        collect_logins(self.session, &self.gate, self.listing("following")).await
    }

    async fn follow(&self, login: &str) -> Result<StatusCode> {
        let status = self.mutate(MutationKind::Follow, login).await?;
        info!("Followed {}: {}", login, status.as_u16());
        Ok(status)
    }

    async fn unfollow(&self, login: &str) -> Result<StatusCode> {
        let status = self.mutate(MutationKind::Unfollow, login).await?;
        info!("Unfollowed {}: {}", login, status.as_u16());
        Ok(status)
    }
}
