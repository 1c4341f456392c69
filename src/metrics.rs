use std::fmt;

/// Outcome counters of one reconciliation run.
///
/// Printed once at the end of a successful run. A failed run never
/// produces a summary: the error is reported instead.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    // Collected sets
    pub followers: usize,
    pub following: usize,

    // Mutations issued (or planned, in dry-run mode)
    pub unfollowed: usize,
    pub followed: usize,

    pub dry_run: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[SUMMARY] followers={} following={} unfollowed={} followed={} dry_run={}",
            self.followers, self.following, self.unfollowed, self.followed, self.dry_run,
        )
    }
}
