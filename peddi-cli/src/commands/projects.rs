//! GitHub Projects listing commands
//!
//! Filters are plain predicate closures over a `ProjectItem`; the projector
//! in peddi-github does the filtering and sorting.

use anyhow::{bail, Context};
use clap::{Args, Subcommand};

use peddi_core::git;
use peddi_github::client::viewer_login;
use peddi_github::projects::{self, ItemContent, ProjectItem};
use peddi_github::GitHubClient;

use crate::render;

/// List and filter issues/cards from GitHub Projects
#[derive(Args, Debug)]
pub struct ProjectsArgs {
    /// Project number (defaults to the most recently created project)
    #[arg(long)]
    id: Option<u64>,

    /// Group by a custom field (e.g. 'Priority')
    #[arg(long = "group-by")]
    group_by: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: ProjectsCommand,
}

#[derive(Subcommand, Debug)]
enum ProjectsCommand {
    /// List items from a project
    #[command(subcommand)]
    List(ListFilter),
}

#[derive(Subcommand, Debug)]
enum ListFilter {
    /// List all issues/cards in the project
    All,

    /// List items with no associated PR
    NoPr,

    /// List items that have an associated PR
    WithPr,

    /// List items with an unmerged PR
    PrNotMerged,

    /// List items where you or a given user is a requested reviewer
    Reviewer {
        /// GitHub username (defaults to the authenticated user)
        #[arg(short, long)]
        name: Option<String>,
    },
}

impl ProjectsArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        if !git::is_inside_git_repository() {
            bail!("this command must be run from inside a Git repository");
        }
        let (owner, repo) =
            git::repo_owner_and_name().context("failed to get repository details")?;
        let client = GitHubClient::new()?;

        let number = match self.id {
            Some(number) => number,
            None => projects::last_project_number(&client, &owner, &repo)
                .await
                .context("failed to get last project number")?,
        };

        let ProjectsCommand::List(which) = &self.command;
        let filter = build_filter(which, &client).await?;

        let (items, title) =
            projects::fetch_project_items(&client, &owner, &repo, number, self.group_by.as_deref())
                .await?;
        let rows =
            projects::process_project_items(items, filter.as_deref(), self.group_by.as_deref());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            render::render_project_items(number, &title, &rows, self.group_by.is_some());
        }

        Ok(())
    }
}

type BoxedFilter = Box<dyn Fn(&ProjectItem) -> bool>;

async fn build_filter(
    which: &ListFilter,
    client: &GitHubClient,
) -> anyhow::Result<Option<BoxedFilter>> {
    let filter: Option<BoxedFilter> = match which {
        ListFilter::All => None,

        ListFilter::NoPr => Some(Box::new(|item: &ProjectItem| match &item.content {
            ItemContent::PullRequest(_) => false,
            ItemContent::Issue { .. } => projects::linked_prs(item).is_empty(),
            ItemContent::DraftIssue { .. } => true,
        })),

        ListFilter::WithPr => Some(Box::new(|item: &ProjectItem| match &item.content {
            ItemContent::PullRequest(_) => true,
            ItemContent::Issue { .. } => !projects::linked_prs(item).is_empty(),
            ItemContent::DraftIssue { .. } => false,
        })),

        ListFilter::PrNotMerged => Some(Box::new(|item: &ProjectItem| match &item.content {
            ItemContent::PullRequest(pr) => pr.merged_at.is_none(),
            ItemContent::Issue { .. } => {
                projects::linked_prs(item).iter().any(|pr| pr.merged_at.is_none())
            }
            ItemContent::DraftIssue { .. } => false,
        })),

        ListFilter::Reviewer { name } => {
            let reviewer = match name {
                Some(name) => name.clone(),
                None => viewer_login(client)
                    .await
                    .context("could not determine current user")?,
            };

            Some(Box::new(move |item: &ProjectItem| {
                let prs = match &item.content {
                    ItemContent::PullRequest(pr) => vec![pr.clone()],
                    ItemContent::Issue { .. } => projects::linked_prs(item),
                    ItemContent::DraftIssue { .. } => Vec::new(),
                };

                prs.iter().any(|pr| {
                    pr.review_requests.nodes.iter().any(|request| {
                        request
                            .requested_reviewer
                            .as_ref()
                            .is_some_and(|user| user.login == reviewer)
                    })
                })
            }))
        }
    };

    Ok(filter)
}
