//! Peddi GitHub - GraphQL access for peddi-tooling
//!
//! Branch history and merged-PR pagination, project item fetching, and the
//! projector/resolver logic that turns union-typed project nodes into
//! displayable rows. All queries go through the [`QueryExecutor`] seam so
//! pagination and projection are testable without a network.

pub mod client;
mod error;
pub mod history;
pub mod projects;
pub mod prs;

pub use client::{GitHubClient, PageInfo, QueryExecutor};
pub use error::{Error, Result};
