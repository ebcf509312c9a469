//! Plain-text rendering for command output

use peddi_core::PullRequestRef;
use peddi_github::projects::{ItemContent, ProjectItem};

/// Print the branch diff result, as text or pretty JSON.
pub fn render_pr_diff(
    branch_a: &str,
    branch_b: &str,
    prs: &[PullRequestRef],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(prs)?);
        return Ok(());
    }

    if prs.is_empty() {
        println!("No PRs found in '{branch_a}' but not in '{branch_b}'");
        return Ok(());
    }

    println!("PRs merged into '{branch_a}' but not in '{branch_b}':");
    for line in pr_diff_lines(prs) {
        println!("{line}");
    }

    Ok(())
}

fn pr_diff_lines(prs: &[PullRequestRef]) -> Vec<String> {
    prs.iter()
        .map(|pr| match &pr.url {
            Some(url) => format!("#{}: {} ({url})", pr.number, pr.title),
            None => format!("#{}: {}", pr.number, pr.title),
        })
        .collect()
}

/// Print a project's rows under a two-line header. In grouped mode each row
/// gets a `[group] ` prefix and a blank separator line is inserted whenever
/// the group value changes between consecutive rows.
pub fn render_project_items(number: u64, title: &str, items: &[ProjectItem], grouped: bool) {
    println!("Project #{number} - {title}");
    println!("{}", "-".repeat(40));
    for line in project_item_lines(items, grouped) {
        println!("{line}");
    }
}

fn project_item_lines(items: &[ProjectItem], grouped: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut last_group: Option<String> = None;

    for item in items {
        let row = match &item.content {
            ItemContent::Issue { number, title, .. } => format!("Issue #{number}: {title}"),
            ItemContent::PullRequest(pr) => format!("PR #{}: {}", pr.number, pr.title),
            ItemContent::DraftIssue { title } => format!("Draft: {title}"),
        };

        if grouped {
            let group = item.resolved_field_value().to_string();
            // No separator before the very first group
            if last_group.as_deref().is_some_and(|prev| prev != group) {
                lines.push(String::new());
            }
            lines.push(format!("[{group}] {row}"));
            last_group = Some(group);
        } else {
            lines.push(row);
        }
    }

    lines
}
