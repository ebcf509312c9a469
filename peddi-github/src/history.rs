//! Paginated branch commit history
//!
//! Walks a branch's commit history 100 commits per page, echoing each page's
//! end cursor into the next request. Any GraphQL error aborts the whole
//! fetch; accumulated partial pages are discarded, never returned.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use peddi_core::{extract, Commit, PullRequestRef};

use crate::client::{PageInfo, QueryExecutor};
use crate::{Error, Result};

const COMMITS_IN_BRANCH: &str = r"
query($owner: String!, $repo: String!, $branch: String!, $after: String) {
  repository(owner: $owner, name: $repo) {
    ref(qualifiedName: $branch) {
      target {
        ... on Commit {
          history(first: 100, after: $after) {
            nodes {
              oid
              message
            }
            pageInfo {
              hasNextPage
              endCursor
            }
          }
        }
      }
    }
  }
}
";

const BRANCH_BY_REF: &str = r"
query($owner: String!, $repo: String!, $ref: String!) {
  repository(owner: $owner, name: $repo) {
    ref(qualifiedName: $ref) {
      name
    }
  }
}
";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CommitHistory {
    nodes: Vec<CommitNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    oid: String,
    message: String,
}

/// One page of branch history. An unknown ref yields an empty page, not an
/// error.
pub async fn fetch_commit_page(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    branch: &str,
    after: Option<&str>,
) -> Result<(Vec<Commit>, PageInfo)> {
    let variables = json!({
        "owner": owner,
        "repo": repo,
        "branch": branch,
        "after": after,
    });

    let data = exec
        .execute("CommitsInBranch", COMMITS_IN_BRANCH, variables)
        .await
        .map_err(|err| Error::BranchFetch {
            branch: branch.to_string(),
            message: err.to_string(),
        })?;

    let history = match data.pointer("/repository/ref/target/history") {
        Some(value) if !value.is_null() => serde_json::from_value::<CommitHistory>(value.clone())
            .map_err(|err| {
                Error::Parse(format!("invalid commit history for '{branch}': {err}"))
            })?,
        _ => CommitHistory::default(),
    };

    let commits = history
        .nodes
        .into_iter()
        .map(|node| Commit {
            oid: node.oid,
            message: node.message,
        })
        .collect();

    Ok((commits, history.page_info))
}

/// Accumulate the branch's commits across pages.
///
/// Stops on an empty page (ref missing or exhausted), when a positive `limit`
/// is reached (mid-page truncation keeps only commits up to the limit), or
/// when the API reports no further page.
pub async fn fetch_commits_in_branch(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    branch: &str,
    limit: usize,
) -> Result<Vec<Commit>> {
    let mut commits: Vec<Commit> = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let (page, page_info) = fetch_commit_page(exec, owner, repo, branch, cursor.as_deref()).await?;
        if page.is_empty() {
            break;
        }

        for commit in page {
            commits.push(commit);
            if limit > 0 && commits.len() >= limit {
                debug!(branch, count = commits.len(), "commit scan limit reached");
                return Ok(commits);
            }
        }

        if !page_info.has_next_page {
            break;
        }
        cursor = page_info.end_cursor;
    }

    debug!(branch, count = commits.len(), "fetched branch history");
    Ok(commits)
}

/// Trailer strategy entry point: branch history through the extractor.
pub async fn fetch_prs_for_branch(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    branch: &str,
    limit: usize,
) -> Result<Vec<PullRequestRef>> {
    let commits = fetch_commits_in_branch(exec, owner, repo, branch, limit).await?;
    Ok(extract::extract_prs_from_commits(&commits))
}

/// Whether `refs/heads/<branch>` exists on the remote.
pub async fn branch_exists_on_remote(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    branch: &str,
) -> Result<bool> {
    let variables = json!({
        "owner": owner,
        "repo": repo,
        "ref": format!("refs/heads/{branch}"),
    });
    let data = exec.execute("BranchByRef", BRANCH_BY_REF, variables).await?;
    Ok(data
        .pointer("/repository/ref")
        .is_some_and(|value| !value.is_null()))
}
