use log::{error, info};

use crate::{
    error::{MutationKind, Result},
    graph::FollowGraph,
    metrics::RunSummary,
    schema::UserSet,
};

/// The two corrective batches derived from a followers / following snapshot.
///
/// `to_unfollow` and `to_follow` are always disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Followed, but not following back: following − followers
    pub to_unfollow: UserSet,

    /// Following, but not followed back: followers − following
    pub to_follow: UserSet,
}

impl ReconcilePlan {
    pub fn compute(followers: &UserSet, following: &UserSet) -> Self {
        Self {
            to_unfollow: following.difference(followers).cloned().collect(),
            to_follow: followers.difference(following).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_unfollow.is_empty() && self.to_follow.is_empty()
    }
}

/// Runs one reconciliation pass over a follow graph.
///
/// ORDER:
/// 1. collect followers, then following
/// 2. unfollow everyone in `following − followers`
/// 3. follow everyone in `followers − following`
///
/// The unfollow batch always finishes before the follow batch starts.
/// Order inside a batch is whatever the set yields.
///
/// FAILURE:
/// - the first error aborts the run; later items are not attempted
///
/// DRY RUN:
/// - batches are logged, not sent to the graph
///
pub struct Reconciler<'a, G: FollowGraph + ?Sized> {
    graph: &'a G,
    dry_run: bool,
}

impl<'a, G: FollowGraph + ?Sized> Reconciler<'a, G> {
    pub fn new(graph: &'a G, dry_run: bool) -> Self {
        Self { graph, dry_run }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let followers = self.graph.followers().await?;
        info!("Followers: {}", followers.len());

        let following = self.graph.following().await?;
        info!("Following: {}", following.len());

        let plan = ReconcilePlan::compute(&followers, &following);
        if plan.is_empty() {
            info!("{} is already reconciled", self.graph.account());
        }

        let mut summary = RunSummary {
            followers: followers.len(),
            following: following.len(),
            dry_run: self.dry_run,
            ..RunSummary::default()
        };

        summary.unfollowed = self.apply(MutationKind::Unfollow, &plan.to_unfollow).await?;
        summary.followed = self.apply(MutationKind::Follow, &plan.to_follow).await?;

        Ok(summary)
    }

    async fn apply(&self, kind: MutationKind, batch: &UserSet) -> Result<usize> {
        let mut done = 0;

        for login in batch {
            if self.dry_run {
                info!("[DRY RUN] would {} {}", kind, login);
                done += 1;
                continue;
            }

            let outcome = match kind {
                MutationKind::Unfollow => self.graph.unfollow(login).await,
                MutationKind::Follow => self.graph.follow(login).await,
            };

            if let Err(e) = outcome {
                error!(
                    "{} {} failed after {} of {} done: {}",
                    kind,
                    login,
                    done,
                    batch.len(),
                    e.describe()
                );
                return Err(e);
            }

            done += 1;
        }

        Ok(done)
    }
}
