/// Collector module
///
/// Everything that reads from the API before any mutation happens:
/// - `rate_limit`: the quota gate run ahead of each request
/// - `pages`:      the paginated `login` collector
///
/// Both work against a borrowed `GithubSession`; neither holds
/// state between calls.
pub mod pages;
pub mod rate_limit;
