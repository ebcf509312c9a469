//! Merged pull requests by base branch
//!
//! Queries merged-state PRs directly (ordered by most-recently-updated)
//! instead of walking commit history. The returned refs carry the merge
//! commit SHA so the diff engine can confirm ancestry against the target
//! branch, which is ground truth rather than trailer-text matching.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use peddi_core::PullRequestRef;

use crate::client::{PageInfo, QueryExecutor};
use crate::{Error, Result};

const MERGED_PULL_REQUESTS: &str = r"
query($owner: String!, $repo: String!, $baseRef: String!, $after: String, $pageSize: Int!) {
  repository(owner: $owner, name: $repo) {
    pullRequests(baseRefName: $baseRef, states: MERGED, first: $pageSize, after: $after,
                 orderBy: {field: UPDATED_AT, direction: DESC}) {
      nodes {
        number
        title
        url
        mergeCommit {
          oid
        }
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}
";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PullRequestConnection {
    nodes: Vec<MergedPrNode>,
    page_info: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MergedPrNode {
    number: u64,
    title: String,
    url: Option<String>,
    merge_commit: Option<MergeCommit>,
}

#[derive(Debug, Deserialize)]
struct MergeCommit {
    oid: String,
}

impl From<MergedPrNode> for PullRequestRef {
    fn from(node: MergedPrNode) -> Self {
        PullRequestRef {
            number: node.number,
            title: node.title,
            merge_commit: node.merge_commit.map(|c| c.oid).filter(|oid| !oid.is_empty()),
            url: node.url,
        }
    }
}

/// One page of merged PRs whose base is `base_branch`.
pub async fn fetch_merged_prs_page(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    base_branch: &str,
    after: Option<&str>,
    page_size: u32,
) -> Result<(Vec<PullRequestRef>, PageInfo)> {
    let variables = json!({
        "owner": owner,
        "repo": repo,
        "baseRef": base_branch,
        "after": after,
        "pageSize": page_size,
    });

    let data = exec
        .execute("MergedPullRequests", MERGED_PULL_REQUESTS, variables)
        .await
        .map_err(|err| Error::BranchFetch {
            branch: base_branch.to_string(),
            message: err.to_string(),
        })?;

    let connection = match data.pointer("/repository/pullRequests") {
        Some(value) if !value.is_null() => serde_json::from_value::<PullRequestConnection>(
            value.clone(),
        )
        .map_err(|err| Error::Parse(format!("invalid merged-PR page for '{base_branch}': {err}")))?,
        _ => PullRequestConnection::default(),
    };

    let prs = connection.nodes.into_iter().map(Into::into).collect();
    Ok((prs, connection.page_info))
}

/// Accumulate recently merged PRs across pages, with the same stop rules as
/// the commit-history walk: empty page, positive `limit` reached (mid-page
/// truncation), or no further page.
pub async fn fetch_merged_prs(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    base_branch: &str,
    limit: usize,
    page_size: u32,
) -> Result<Vec<PullRequestRef>> {
    let mut prs: Vec<PullRequestRef> = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let (page, page_info) =
            fetch_merged_prs_page(exec, owner, repo, base_branch, cursor.as_deref(), page_size)
                .await?;
        if page.is_empty() {
            break;
        }

        for pr in page {
            prs.push(pr);
            if limit > 0 && prs.len() >= limit {
                debug!(base_branch, count = prs.len(), "merged-PR scan limit reached");
                return Ok(prs);
            }
        }

        if !page_info.has_next_page {
            break;
        }
        cursor = page_info.end_cursor;
    }

    debug!(base_branch, count = prs.len(), "fetched merged PRs");
    Ok(prs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExecutor;
    use serde_json::{json, Value};

    fn pr_node(number: u64, oid: Option<&str>) -> Value {
        json!({
            "number": number,
            "title": format!("PR {number}"),
            "url": format!("https://github.com/org/repo/pull/{number}"),
            "mergeCommit": oid.map(|oid| json!({"oid": oid})),
        })
    }

    fn page(nodes: Vec<Value>, next: Option<&str>) -> Value {
        json!({
            "repository": {"pullRequests": {
                "nodes": nodes,
                "pageInfo": {"hasNextPage": next.is_some(), "endCursor": next},
            }}
        })
    }

    #[tokio::test]
    async fn parses_nodes_including_missing_merge_commit() {
        let exec = MockExecutor::with_data(vec![page(
            vec![pr_node(12, Some("abc")), pr_node(11, None)],
            None,
        )]);

        let prs = fetch_merged_prs(&exec, "org", "repo", "dev", 0, 20).await.unwrap();
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].merge_commit.as_deref(), Some("abc"));
        assert!(prs[1].merge_commit.is_none());
        assert_eq!(prs[0].url.as_deref(), Some("https://github.com/org/repo/pull/12"));
    }

    #[tokio::test]
    async fn paginates_until_exhausted() {
        let exec = MockExecutor::with_data(vec![
            page(vec![pr_node(3, Some("c"))], Some("NEXT")),
            page(vec![pr_node(2, Some("b"))], None),
        ]);

        let prs = fetch_merged_prs(&exec, "org", "repo", "dev", 0, 20).await.unwrap();
        let numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, vec![3, 2]);

        let calls = exec.calls.lock().unwrap();
        assert_eq!(calls[1].1["after"], json!("NEXT"));
    }

    #[tokio::test]
    async fn limit_stops_the_scan() {
        let exec = MockExecutor::with_data(vec![page(
            vec![pr_node(5, Some("e")), pr_node(4, Some("d")), pr_node(3, Some("c"))],
            Some("MORE"),
        )]);

        let prs = fetch_merged_prs(&exec, "org", "repo", "dev", 2, 20).await.unwrap();
        assert_eq!(prs.len(), 2);
    }
}
