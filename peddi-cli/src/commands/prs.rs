//! Branch PR diff command
//!
//! Two strategies answer the same question. The canonical one fetches
//! merged PRs of branch A directly and confirms each merge commit against
//! branch B's ancestry (ground truth). The trailer strategy scans commit
//! messages on both branches for `(#N)` markers and diffs by number; it is
//! the path that still works for PRs without a distinct merge commit, and
//! the only one backed by the result cache. The two can disagree for
//! squash-merged PRs, which is why both stay exposed.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use tracing::warn;

use peddi_core::{diff, git, PrCache, PullRequestRef};
use peddi_github::{history, prs as merged_prs, GitHubClient, QueryExecutor};

use crate::render;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Confirm each merged PR's merge commit against branchB ancestry
    Ancestry,
    /// Scan commit trailers on both branches and diff by PR number
    Trailer,
}

/// List PRs merged into branchA that are not yet in branchB
#[derive(Args, Debug)]
pub struct PrsArgs {
    /// Branch whose merged PRs to inspect
    branch_a: String,

    /// Branch the PRs may be missing from
    branch_b: String,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Compare local branches instead of origin/<branch>
    #[arg(long)]
    local: bool,

    /// Maximum commits/PRs to scan per branch (0 = no limit)
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Page size for merged-PR queries (ancestry strategy)
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=100))]
    page_size: u32,

    /// How to decide whether a PR is already in branchB
    #[arg(long, value_enum, default_value_t = Strategy::Ancestry)]
    strategy: Strategy,
}

impl PrsArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        if !git::is_inside_git_repository() {
            bail!("this command must be run from inside a Git repository");
        }
        let (owner, repo) =
            git::repo_owner_and_name().context("failed to get repository details")?;
        let client = Arc::new(GitHubClient::new()?);

        for branch in [&self.branch_a, &self.branch_b] {
            if !branch_exists(client.as_ref(), &owner, &repo, branch, self.local).await {
                bail!("branch '{branch}' does not exist locally or on origin");
            }
        }

        let prs = match self.strategy {
            Strategy::Ancestry => self.ancestry_diff(client.as_ref(), &owner, &repo).await?,
            Strategy::Trailer => self.trailer_diff(client, &owner, &repo).await?,
        };

        render::render_pr_diff(&self.branch_a, &self.branch_b, &prs, self.json)
    }

    /// Merged PRs of A whose merge commit is not an ancestor of B.
    async fn ancestry_diff(
        &self,
        exec: &dyn QueryExecutor,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<Vec<PullRequestRef>> {
        let target = if self.local {
            self.branch_b.clone()
        } else {
            git::fetch_branches(&[&self.branch_a, &self.branch_b])
                .context("git fetch failed")?;
            format!("origin/{}", self.branch_b)
        };

        let merged =
            merged_prs::fetch_merged_prs(exec, owner, repo, &self.branch_a, self.limit, self.page_size)
                .await?;

        Ok(diff::diff_by_ancestry(&merged, |sha| git::is_ancestor(sha, &target)))
    }

    /// Trailer scan of both branches, forked into two tasks and joined
    /// before the diff. Read-through/write-through on the result cache;
    /// cache trouble never blocks the live path.
    async fn trailer_diff(
        &self,
        client: Arc<GitHubClient>,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<Vec<PullRequestRef>> {
        if !self.local {
            if let Err(err) = git::fetch_branches(&[&self.branch_a, &self.branch_b]) {
                warn!(%err, "git fetch failed, continuing with possibly stale refs");
            }
        }

        let mut cache = match PrCache::open_default() {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!(%err, "cache unavailable, falling back to live fetches");
                None
            }
        };

        let plan_a = plan_branch_scan(cache.as_ref(), owner, repo, &self.branch_a, self.local);
        let plan_b = plan_branch_scan(cache.as_ref(), owner, repo, &self.branch_b, self.local);

        let task_a = spawn_scan(client.clone(), owner, repo, &plan_a, self.limit);
        let task_b = spawn_scan(client.clone(), owner, repo, &plan_b, self.limit);

        let (result_a, result_b) =
            tokio::try_join!(task_a, task_b).context("branch scan task failed")?;
        let prs_a = result_a?;
        let prs_b = result_b?;

        if let Some(cache) = cache.as_mut() {
            for (plan, prs) in [(&plan_a, &prs_a), (&plan_b, &prs_b)] {
                if plan.cached.is_some() {
                    continue;
                }
                let Some(hash) = &plan.hash else { continue };
                let numbers = prs.iter().map(|pr| pr.number).collect();
                if let Err(err) = cache.put(owner, repo, &plan.branch, hash, numbers) {
                    warn!(branch = %plan.branch, %err, "failed to save cache");
                }
            }
        }

        Ok(diff::diff(&prs_a, &prs_b))
    }
}

struct BranchScan {
    branch: String,
    hash: Option<String>,
    cached: Option<Vec<PullRequestRef>>,
}

/// Decide per branch whether the cached snapshot is still valid. A branch
/// head that cannot be resolved (detached HEAD, unknown ref) just skips the
/// cache for that branch.
fn plan_branch_scan(
    cache: Option<&PrCache>,
    owner: &str,
    repo: &str,
    branch: &str,
    local: bool,
) -> BranchScan {
    let branch_ref = if local {
        branch.to_string()
    } else {
        format!("origin/{branch}")
    };

    let hash = match git::branch_head_hash(&branch_ref) {
        Ok(hash) => Some(hash),
        Err(err) => {
            warn!(branch, %err, "could not resolve branch head, skipping cache");
            None
        }
    };

    let cached = match (&hash, cache) {
        (Some(hash), Some(cache)) => cache.get(owner, repo, branch, hash).map(|numbers| {
            tracing::debug!(branch, count = numbers.len(), "cache hit");
            numbers.iter().copied().map(PullRequestRef::from_number).collect()
        }),
        _ => None,
    };

    BranchScan {
        branch: branch.to_string(),
        hash,
        cached,
    }
}

fn spawn_scan(
    client: Arc<GitHubClient>,
    owner: &str,
    repo: &str,
    plan: &BranchScan,
    limit: usize,
) -> tokio::task::JoinHandle<peddi_github::Result<Vec<PullRequestRef>>> {
    let owner = owner.to_string();
    let repo = repo.to_string();
    let branch = plan.branch.clone();
    let cached = plan.cached.clone();

    tokio::spawn(async move {
        match cached {
            Some(prs) => Ok(prs),
            None => history::fetch_prs_for_branch(client.as_ref(), &owner, &repo, &branch, limit).await,
        }
    })
}

async fn branch_exists(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    branch: &str,
    local_only: bool,
) -> bool {
    if git::local_branch_exists(branch) {
        return true;
    }
    if local_only {
        return false;
    }
    history::branch_exists_on_remote(exec, owner, repo, branch)
        .await
        .unwrap_or(false)
}
