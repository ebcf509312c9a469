//! Local git collaborators
//!
//! Thin wrappers over the `git` subprocess. For the boolean checks, exit
//! status 0 means true and any nonzero status means false; a failure to spawn
//! `git` at all is also treated as false, never as a fatal error.

use std::process::Command;

use url::Url;

use crate::{Error, Result};

/// Whether the working directory is inside a git work tree.
pub fn is_inside_git_repository() -> bool {
    git_succeeds(&["rev-parse", "--is-inside-work-tree"])
}

/// Whether a local branch ref exists.
pub fn local_branch_exists(branch: &str) -> bool {
    git_succeeds(&["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])
}

/// Ancestry check: is `sha` reachable from the tip of `branch_ref`?
pub fn is_ancestor(sha: &str, branch_ref: &str) -> bool {
    git_succeeds(&["merge-base", "--is-ancestor", sha, branch_ref])
}

/// Resolve the head commit SHA of a branch ref.
pub fn branch_head_hash(branch_ref: &str) -> Result<String> {
    let output = Command::new("git").args(["rev-parse", branch_ref]).output()?;
    if !output.status.success() {
        return Err(Error::Git(format!("could not get SHA for branch '{branch_ref}'")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Fetch the given branches from origin.
pub fn fetch_branches(branches: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(["fetch", "origin"])
        .args(branches)
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!("git fetch failed: {}", stderr.trim())));
    }

    Ok(())
}

/// URL of the origin remote.
pub fn remote_url() -> Result<String> {
    let output = Command::new("git").args(["remote", "get-url", "origin"]).output()?;
    if !output.status.success() {
        return Err(Error::Git("failed to get the origin remote".into()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Owner and repository name parsed from the origin remote.
pub fn repo_owner_and_name() -> Result<(String, String)> {
    parse_remote_url(&remote_url()?)
}

/// Parse `owner` and `repo` out of an SSH (`git@host:owner/repo.git`) or
/// https remote URL.
pub fn parse_remote_url(raw: &str) -> Result<(String, String)> {
    if let Some(rest) = raw.strip_prefix("git@") {
        let (_, path) = rest
            .split_once(':')
            .ok_or_else(|| Error::Git(format!("unrecognized SSH remote: {raw}")))?;
        return split_owner_repo(path.trim_end_matches(".git"))
            .ok_or_else(|| Error::Git(format!("unrecognized SSH remote path: {path}")));
    }

    let parsed =
        Url::parse(raw).map_err(|err| Error::Git(format!("unrecognized remote URL '{raw}': {err}")))?;
    let path = parsed.path().trim_start_matches('/').trim_end_matches(".git");
    split_owner_repo(path)
        .ok_or_else(|| Error::Git(format!("unrecognized remote path: {}", parsed.path())))
}

fn split_owner_repo(path: &str) -> Option<(String, String)> {
    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

fn git_succeeds(args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
