//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL-level errors returned alongside the response
    #[error("GraphQL errors: {0}")]
    Graphql(String),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Branch history fetch failed; partial pages are discarded
    #[error("failed to fetch commits for branch '{branch}': {message}")]
    BranchFetch { branch: String, message: String },

    /// Project lookup found nothing in the organization or the repository
    #[error("failed to find project #{0}. Check the project number and your permissions")]
    ProjectNotFound(u64),

    /// No projects exist at all for this owner/repo
    #[error("no projects found in organization or repository for '{0}'")]
    NoProjects(String),

    /// Response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Core-layer error
    #[error(transparent)]
    Core(#[from] peddi_core::Error),
}
