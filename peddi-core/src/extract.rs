//! Commit-message trailer extraction
//!
//! Reconstructs PR references from commit messages without calling the API,
//! using the `(#123)` trailer convention squash merges leave behind (plus the
//! classic `Merge pull request #123` form for merge commits).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::pr::{Commit, PullRequestRef};

static TRAILER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(#(\d+)\)").expect("trailer pattern is valid"));

static MERGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Merge pull request #(\d+)").expect("merge pattern is valid"));

static TITLE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(#\d+\)\s*$").expect("title marker pattern is valid"));

/// Extract a PR number from a `(#123)` trailer.
///
/// A message without the trailer, or with digits that do not fit the number
/// type, is simply not a match.
pub fn extract_pr_number(message: &str) -> Option<u64> {
    capture_number(&TRAILER_RE, message)
}

/// Merge-commit variant: extract the number from `Merge pull request #123`.
pub fn extract_merge_pr_number(message: &str) -> Option<u64> {
    capture_number(&MERGE_RE, message)
}

fn capture_number(re: &Regex, message: &str) -> Option<u64> {
    re.captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First line of the message with the trailing `(#N)` marker stripped.
pub fn title_from_message(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("");
    TITLE_MARKER_RE.replace(first_line, "").trim().to_string()
}

/// Turn an ordered commit sequence into deduplicated PR references.
///
/// Squash trailers are tried first, then the merge-commit form. Only the
/// first occurrence of each PR number is kept. History is scanned
/// newest-first, so the most recent mention of a PR wins the title; follow-up
/// commits referencing the same PR (say, after a rebase) are dropped.
pub fn extract_prs_from_commits(commits: &[Commit]) -> Vec<PullRequestRef> {
    let mut seen = HashSet::new();
    let mut prs = Vec::new();

    for commit in commits {
        let number = extract_pr_number(&commit.message)
            .or_else(|| extract_merge_pr_number(&commit.message));
        let Some(number) = number else {
            continue;
        };
        if seen.insert(number) {
            prs.push(PullRequestRef {
                number,
                title: title_from_message(&commit.message),
                merge_commit: None,
                url: None,
            });
        }
    }

    prs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(oid: &str, message: &str) -> Commit {
        Commit {
            oid: oid.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn extracts_trailer_number() {
        assert_eq!(extract_pr_number("Fix bug (#42)"), Some(42));
        assert_eq!(extract_pr_number("Add feature (#1234)\n\nlonger body"), Some(1234));
    }

    #[test]
    fn no_trailer_is_no_match() {
        assert_eq!(extract_pr_number("Fix bug"), None);
        assert_eq!(extract_pr_number("Fix bug (#)"), None);
        assert_eq!(extract_pr_number("see issue #42"), None);
    }

    #[test]
    fn oversized_number_is_no_match() {
        assert_eq!(extract_pr_number("Fix bug (#99999999999999999999999)"), None);
    }

    #[test]
    fn extracts_merge_commit_number() {
        assert_eq!(
            extract_merge_pr_number("Merge pull request #17 from org/feature"),
            Some(17)
        );
        assert_eq!(extract_merge_pr_number("Fix bug (#42)"), None);
    }

    #[test]
    fn title_strips_marker_and_body() {
        assert_eq!(title_from_message("Fix bug (#42)"), "Fix bug");
        assert_eq!(title_from_message("Fix bug (#42)\n\ndetails"), "Fix bug");
        assert_eq!(title_from_message("No marker here"), "No marker here");
        assert_eq!(title_from_message(""), "");
    }

    #[test]
    fn first_occurrence_wins() {
        let commits = vec![
            commit("aaa111", "Fix bug (#42)"),
            commit("bbb222", "Add feature (#43)"),
            commit("ccc333", "Fix bug (#42)"),
        ];

        let prs = extract_prs_from_commits(&commits);
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].number, 42);
        assert_eq!(prs[0].title, "Fix bug");
        assert_eq!(prs[1].number, 43);
        assert_eq!(prs[1].title, "Add feature");
    }

    #[test]
    fn numbers_are_unique_for_any_input() {
        let commits: Vec<Commit> = (0..50)
            .map(|i| commit("sha", &format!("change {} (#{})", i, i % 7)))
            .collect();

        let prs = extract_prs_from_commits(&commits);
        let mut numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), prs.len());
    }

    #[test]
    fn merge_commits_count_when_no_trailer_matches() {
        let commits = vec![
            commit("aaa", "Merge pull request #17 from org/feature"),
            commit("bbb", "Add feature (#43)"),
        ];

        let prs = extract_prs_from_commits(&commits);
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].number, 17);
        assert_eq!(prs[1].number, 43);
    }

    #[test]
    fn commits_without_trailers_are_skipped() {
        let commits = vec![
            commit("aaa", "chore: bump deps"),
            commit("bbb", "Add feature (#7)"),
            commit("ccc", "wip"),
        ];

        let prs = extract_prs_from_commits(&commits);
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].number, 7);
    }
}
