//! Branch diff engine
//!
//! Computes the set of PRs present in branch A but missing from branch B.
//! Two parallel paths feed this: trailer-derived PR sets (diffed by number)
//! and directly fetched merged PRs (confirmed against branch ancestry).

use std::collections::HashSet;

use crate::pr::PullRequestRef;

/// Set difference keyed by PR number, preserving A's order.
///
/// Equality is the number alone; titles and URLs from A are kept verbatim.
pub fn diff(prs_a: &[PullRequestRef], prs_b: &[PullRequestRef]) -> Vec<PullRequestRef> {
    let in_b: HashSet<u64> = prs_b.iter().map(|pr| pr.number).collect();

    prs_a
        .iter()
        .filter(|pr| !in_b.contains(&pr.number))
        .cloned()
        .collect()
}

/// Ancestry-confirmed variant: keep a PR only when its merge commit is NOT
/// reachable from the target branch.
///
/// `in_target` answers "is this commit an ancestor of the target branch tip".
/// PRs without a resolvable merge commit are skipped entirely; the trailer
/// strategy is the path that can still surface those.
pub fn diff_by_ancestry<F>(prs: &[PullRequestRef], mut in_target: F) -> Vec<PullRequestRef>
where
    F: FnMut(&str) -> bool,
{
    prs.iter()
        .filter(|pr| match pr.merge_commit.as_deref() {
            Some(sha) => !in_target(sha),
            None => false,
        })
        .cloned()
        .collect()
}
