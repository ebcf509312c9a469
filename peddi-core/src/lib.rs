//! Peddi Core - branch-diff reconciliation for peddi-tooling
//!
//! This crate holds the pure engines (commit trailer extraction, PR set
//! difference, the result cache) and the local `git` subprocess collaborators
//! they lean on. Everything network-facing lives in `peddi-github`.

pub mod cache;
pub mod diff;
pub mod error;
pub mod extract;
pub mod git;
pub mod pr;

pub use cache::PrCache;
pub use error::{Error, Result};
pub use pr::{Commit, PullRequestRef};
