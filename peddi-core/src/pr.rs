//! Shared pull-request and commit types

use serde::{Deserialize, Serialize};

/// A merged pull request, reconstructed from commit trailers or fetched
/// directly from the API.
///
/// Within any collection a PR is identified by `number` alone; the other
/// fields are display metadata carried along from whichever source saw the
/// PR first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// PR number, unique within a repository
    pub number: u64,
    /// PR title (API title, or the first line of the commit message)
    pub title: String,
    /// Merge commit SHA, present only when sourced from a direct PR query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit: Option<String>,
    /// Web URL, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PullRequestRef {
    /// A reference carrying only a number, as rehydrated from the cache.
    pub fn from_number(number: u64) -> Self {
        PullRequestRef {
            number,
            title: String::new(),
            merge_commit: None,
            url: None,
        }
    }
}

/// A commit from branch history. Ephemeral: produced by pagination and
/// consumed once by the extractor, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA
    pub oid: String,
    /// Full commit message including trailers
    pub message: String,
}
