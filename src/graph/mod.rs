//! Follow graph access
//!
//! This module provides:
//! - The `FollowGraph` trait the reconciler is written against
//! - The GitHub REST implementation of it
//!
//! Platform-specific request shapes must stay inside the
//! implementation modules.

pub mod adapter;
pub mod github;

pub use adapter::FollowGraph;
pub use github::GithubGraph;
