//! GitHub Projects (v2) items
//!
//! Fetches a project's board items (organization project first, repository
//! project as fallback), normalizes the union-typed content node into a
//! single tagged [`ItemContent`], and provides the projector and linked-PR
//! resolver used by the listing filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{PageInfo, QueryExecutor};
use crate::{Error, Result};

const PR_FIELDS_FRAGMENT: &str = r"
fragment prFields on PullRequest {
  number
  title
  mergedAt
  reviewRequests(first: 10) {
    nodes {
      requestedReviewer {
        ... on User {
          login
        }
      }
    }
  }
}
";

const PROJECT_ITEMS_SELECTION: &str = r"
      title
      items(first: 100, after: $after) {
        nodes {
          fieldValueByName(name: $fieldName) {
            ... on ProjectV2ItemFieldSingleSelectValue {
              name
            }
            ... on ProjectV2ItemFieldTextValue {
              text
            }
          }
          content {
            __typename
            ... on Issue {
              number
              title
              timelineItems(itemTypes: [CONNECTED_EVENT, CROSS_REFERENCED_EVENT, REFERENCED_EVENT], first: 5) {
                nodes {
                  ... on ConnectedEvent {
                    connected: subject {
                      ... on PullRequest {
                        ...prFields
                      }
                    }
                  }
                  ... on CrossReferencedEvent {
                    crossReferenced: source {
                      ... on PullRequest {
                        ...prFields
                      }
                    }
                  }
                  ... on ReferencedEvent {
                    referenced: subject {
                      ... on PullRequest {
                        ...prFields
                      }
                    }
                  }
                }
              }
            }
            ... on PullRequest {
              ...prFields
            }
            ... on DraftIssue {
              title
            }
          }
        }
        pageInfo {
          hasNextPage
          endCursor
        }
      }
";

const LAST_PROJECT_NUMBER: &str = r"
query($owner: String!, $repo: String!) {
  organization(login: $owner) {
    projectsV2(first: 1, orderBy: {field: CREATED_AT, direction: DESC}) {
      nodes {
        number
        createdAt
      }
    }
  }
  repository(owner: $owner, name: $repo) {
    projectsV2(first: 1, orderBy: {field: CREATED_AT, direction: DESC}) {
      nodes {
        number
        createdAt
      }
    }
  }
}
";

fn org_project_items_query() -> String {
    format!(
        "query($owner: String!, $number: Int!, $after: String, $fieldName: String!) {{\n  organization(login: $owner) {{\n    projectV2(number: $number) {{\n{PROJECT_ITEMS_SELECTION}    }}\n  }}\n}}\n{PR_FIELDS_FRAGMENT}"
    )
}

fn repo_project_items_query() -> String {
    format!(
        "query($owner: String!, $repo: String!, $number: Int!, $after: String, $fieldName: String!) {{\n  repository(owner: $owner, name: $repo) {{\n    projectV2(number: $number) {{\n{PROJECT_ITEMS_SELECTION}    }}\n  }}\n}}\n{PR_FIELDS_FRAGMENT}"
    )
}

/// A normalized project board row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectItem {
    /// The item's content, exactly one variant per item
    pub content: ItemContent,
    /// Group-by field value, present only when a field name was requested.
    /// Used purely for display grouping, never for identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value: Option<FieldValue>,
}

/// The three mutually exclusive content shapes of a project item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum ItemContent {
    Issue {
        number: u64,
        title: String,
        #[serde(rename = "timelineItems", default)]
        timeline_items: TimelineItems,
    },
    PullRequest(PullRequestFragment),
    DraftIssue {
        title: String,
    },
}

/// Timeline events carrying possible PR linkage for an issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineItems {
    pub nodes: Vec<TimelineEvent>,
}

/// One timeline event. The three slots are mutually exclusive in practice;
/// the resolver takes the first one holding a real PR number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineEvent {
    pub connected: Option<PullRequestFragment>,
    pub cross_referenced: Option<PullRequestFragment>,
    pub referenced: Option<PullRequestFragment>,
}

/// PR fields shared between project content and timeline linkage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PullRequestFragment {
    pub number: u64,
    pub title: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub review_requests: ReviewRequests,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewRequests {
    pub nodes: Vec<ReviewRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewRequest {
    pub requested_reviewer: Option<Reviewer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reviewer {
    pub login: String,
}

/// A custom field value; whichever of the single-select / text shapes the
/// API populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldValue {
    pub name: Option<String>,
    pub text: Option<String>,
}

impl ProjectItem {
    /// The group-by field value as a string: single-select name, else text,
    /// else empty.
    pub fn resolved_field_value(&self) -> &str {
        self.field_value
            .as_ref()
            .and_then(|field| field.name.as_deref().or(field.text.as_deref()))
            .unwrap_or("")
    }
}

/// Predicate over project items; listing filters are plain closures.
pub type ItemFilter<'a> = &'a dyn Fn(&ProjectItem) -> bool;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawProjectItem {
    field_value_by_name: Option<FieldValue>,
    content: Option<ItemContent>,
}

#[derive(Debug, Deserialize)]
struct ProjectPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    items: ItemConnection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ItemConnection {
    nodes: Vec<RawProjectItem>,
    page_info: PageInfo,
}

/// Fetch all items of project `number`, trying the organization project
/// first and falling back to the repository project only when the
/// organization has no such project.
///
/// Returns the items and the project title. Items whose content is gone
/// (archived/inaccessible) are dropped.
pub async fn fetch_project_items(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
    number: u64,
    group_by: Option<&str>,
) -> Result<(Vec<ProjectItem>, String)> {
    let field_name = group_by.unwrap_or("");

    let org_vars = json!({
        "owner": owner,
        "number": number,
        "fieldName": field_name,
    });
    if let Some(found) = fetch_all_pages(
        exec,
        "OrgProjectItems",
        &org_project_items_query(),
        org_vars,
        "/organization/projectV2",
    )
    .await?
    {
        return Ok(found);
    }

    let repo_vars = json!({
        "owner": owner,
        "repo": repo,
        "number": number,
        "fieldName": field_name,
    });
    if let Some(found) = fetch_all_pages(
        exec,
        "RepoProjectItems",
        &repo_project_items_query(),
        repo_vars,
        "/repository/projectV2",
    )
    .await?
    {
        return Ok(found);
    }

    Err(Error::ProjectNotFound(number))
}

async fn fetch_all_pages(
    exec: &dyn QueryExecutor,
    name: &str,
    query: &str,
    base_variables: Value,
    pointer: &str,
) -> Result<Option<(Vec<ProjectItem>, String)>> {
    let mut items = Vec::new();
    let mut title = String::new();
    let mut cursor: Option<String> = None;

    loop {
        let mut variables = base_variables.clone();
        variables["after"] = match &cursor {
            Some(cursor) => json!(cursor),
            None => Value::Null,
        };

        let data = exec.execute(name, query, variables).await?;
        let project = match data.pointer(pointer) {
            Some(value) if !value.is_null() => value,
            _ => return Ok(None),
        };

        let page: ProjectPage = serde_json::from_value(project.clone())
            .map_err(|err| Error::Parse(format!("invalid project page: {err}")))?;
        title = page.title;

        for raw in page.items.nodes {
            if let Some(content) = raw.content {
                items.push(ProjectItem {
                    content,
                    field_value: raw.field_value_by_name,
                });
            }
        }

        if !page.items.page_info.has_next_page {
            break;
        }
        cursor = page.items.page_info.end_cursor;
    }

    debug!(name, count = items.len(), "fetched project items");
    Ok(Some((items, title)))
}

/// Most recently created project number across the organization and the
/// repository.
pub async fn last_project_number(
    exec: &dyn QueryExecutor,
    owner: &str,
    repo: &str,
) -> Result<u64> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ProjectNode {
        number: u64,
        created_at: DateTime<Utc>,
    }

    let variables = json!({"owner": owner, "repo": repo});
    let data = exec
        .execute("LastProjectNumber", LAST_PROJECT_NUMBER, variables)
        .await?;

    let node_at = |pointer: &str| -> Option<ProjectNode> {
        data.pointer(pointer)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    };
    let org = node_at("/organization/projectsV2/nodes/0");
    let repo_node = node_at("/repository/projectsV2/nodes/0");

    match (org, repo_node) {
        (Some(org), Some(repo_node)) => {
            if org.created_at > repo_node.created_at {
                Ok(org.number)
            } else {
                Ok(repo_node.number)
            }
        }
        (Some(org), None) => Ok(org.number),
        (None, Some(repo_node)) => Ok(repo_node.number),
        (None, None) => Err(Error::NoProjects(format!("{owner}/{repo}"))),
    }
}

/// Linked PRs of an Issue item, taken from its timeline events.
///
/// Per event the first populated shape wins (connected, then
/// cross-referenced, then referenced). PRs seen in several events are
/// deduplicated by number. The result is sorted descending by number; that
/// ordering is this resolver's own contract. Non-Issue items yield nothing.
pub fn linked_prs(item: &ProjectItem) -> Vec<PullRequestFragment> {
    let ItemContent::Issue { timeline_items, .. } = &item.content else {
        return Vec::new();
    };

    let mut prs: Vec<PullRequestFragment> = Vec::new();
    for event in &timeline_items.nodes {
        let linked = [
            event.connected.as_ref(),
            event.cross_referenced.as_ref(),
            event.referenced.as_ref(),
        ]
        .into_iter()
        .flatten()
        .find(|pr| pr.number != 0);

        if let Some(pr) = linked {
            if !prs.iter().any(|seen| seen.number == pr.number) {
                prs.push(pr.clone());
            }
        }
    }

    prs.sort_by(|a, b| b.number.cmp(&a.number));
    prs
}

/// Filter and sort project items for display.
///
/// Grouped mode (a field name was requested): stable ascending sort by the
/// resolved field value, with empty values strictly last regardless of
/// lexical order. Ungrouped mode: pull requests before issues and drafts,
/// PRs descending by number, everything else left in encountered order.
pub fn process_project_items(
    items: Vec<ProjectItem>,
    filter: Option<ItemFilter<'_>>,
    group_by: Option<&str>,
) -> Vec<ProjectItem> {
    let mut kept: Vec<ProjectItem> = items
        .into_iter()
        .filter(|item| filter.is_none_or(|keep| keep(item)))
        .collect();

    if group_by.is_some() {
        kept.sort_by(|a, b| {
            let (va, vb) = (a.resolved_field_value(), b.resolved_field_value());
            match (va.is_empty(), vb.is_empty()) {
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                _ => va.cmp(vb),
            }
        });
    } else {
        kept.sort_by(|a, b| match (&a.content, &b.content) {
            (ItemContent::PullRequest(pa), ItemContent::PullRequest(pb)) => {
                pb.number.cmp(&pa.number)
            }
            (ItemContent::PullRequest(_), _) => std::cmp::Ordering::Less,
            (_, ItemContent::PullRequest(_)) => std::cmp::Ordering::Greater,
            _ => std::cmp::Ordering::Equal,
        });
    }

    kept
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;
    use crate::testing::MockExecutor;

    fn item_numbers(items: &[ProjectItem]) -> Vec<u64> {
        items
            .iter()
            .map(|item| match &item.content {
                ItemContent::Issue { number, .. } => *number,
                ItemContent::PullRequest(pr) => pr.number,
                ItemContent::DraftIssue { .. } => 0,
            })
            .collect()
    }

    #[test]
    fn resolved_field_value_prefers_single_select_name() {
        let mut item = draft_item("idea");
        item.field_value = Some(FieldValue {
            name: Some("High".to_string()),
            text: Some("ignored".to_string()),
        });
        assert_eq!(item.resolved_field_value(), "High");

        item.field_value = Some(FieldValue {
            name: None,
            text: Some("free text".to_string()),
        });
        assert_eq!(item.resolved_field_value(), "free text");

        item.field_value = None;
        assert_eq!(item.resolved_field_value(), "");
    }

    #[test]
    fn linked_prs_on_non_issue_items_is_empty() {
        assert!(linked_prs(&pr_item(pr_fragment(1, "a", false))).is_empty());
        assert!(linked_prs(&draft_item("draft")).is_empty());
    }

    #[test]
    fn linked_prs_sorted_descending_and_deduplicated() {
        let item = issue_item(
            1,
            "issue",
            vec![
                pr_fragment(101, "first", false),
                pr_fragment(102, "second", false),
                pr_fragment(101, "first again", false),
            ],
        );

        let prs = linked_prs(&item);
        let numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, vec![102, 101]);
    }

    #[test]
    fn linked_prs_takes_the_first_populated_shape_per_event() {
        let item = ProjectItem {
            content: ItemContent::Issue {
                number: 1,
                title: "issue".to_string(),
                timeline_items: TimelineItems {
                    nodes: vec![
                        TimelineEvent {
                            connected: Some(pr_fragment(7, "connected", false)),
                            referenced: Some(pr_fragment(8, "shadowed", false)),
                            ..TimelineEvent::default()
                        },
                        // Empty subject: the union member was not a PR
                        TimelineEvent {
                            connected: Some(PullRequestFragment::default()),
                            referenced: Some(pr_fragment(9, "referenced", false)),
                            ..TimelineEvent::default()
                        },
                    ],
                },
            },
            field_value: None,
        };

        let numbers: Vec<u64> = linked_prs(&item).iter().map(|pr| pr.number).collect();
        assert_eq!(numbers, vec![9, 7]);
    }

    #[test]
    fn grouped_sort_puts_empty_values_last() {
        let items = vec![
            with_field(issue_item(1, "todo", vec![]), "Todo"),
            with_field(issue_item(2, "no status", vec![]), ""),
            with_field(issue_item(3, "done", vec![]), "Done"),
        ];

        let sorted = process_project_items(items, None, Some("Status"));
        let values: Vec<&str> = sorted.iter().map(|i| i.resolved_field_value()).collect();
        assert_eq!(values, vec!["Done", "Todo", ""]);
    }

    #[test]
    fn grouped_sort_is_stable_within_a_group() {
        let items = vec![
            with_field(issue_item(10, "a", vec![]), "Todo"),
            with_field(issue_item(11, "b", vec![]), "Todo"),
            with_field(issue_item(12, "c", vec![]), "Todo"),
        ];

        let sorted = process_project_items(items, None, Some("Status"));
        assert_eq!(item_numbers(&sorted), vec![10, 11, 12]);
    }

    #[test]
    fn ungrouped_sort_puts_prs_first_descending() {
        let items = vec![
            issue_item(1, "issue one", vec![]),
            pr_item(pr_fragment(101, "older", true)),
            draft_item("a draft"),
            pr_item(pr_fragment(105, "newer", false)),
            issue_item(2, "issue two", vec![]),
        ];

        let sorted = process_project_items(items, None, None);
        assert_eq!(item_numbers(&sorted), vec![105, 101, 1, 0, 2]);
    }

    #[test]
    fn filter_runs_before_sorting() {
        let items = vec![
            pr_item(pr_fragment(101, "merged", true)),
            pr_item(pr_fragment(102, "open", false)),
            issue_item(1, "issue with unmerged pr", vec![pr_fragment(103, "linked", false)]),
        ];

        let not_merged = |item: &ProjectItem| match &item.content {
            ItemContent::PullRequest(pr) => pr.merged_at.is_none(),
            ItemContent::Issue { .. } => linked_prs(item).iter().any(|pr| pr.merged_at.is_none()),
            ItemContent::DraftIssue { .. } => false,
        };

        let kept = process_project_items(items, Some(&not_merged), None);
        assert_eq!(item_numbers(&kept), vec![102, 1]);
    }

    #[test]
    fn content_deserializes_each_variant() {
        let issue: ItemContent = serde_json::from_value(serde_json::json!({
            "__typename": "Issue",
            "number": 7,
            "title": "An issue",
            "timelineItems": {"nodes": [
                {"crossReferenced": {"number": 12, "title": "Fix", "mergedAt": null,
                 "reviewRequests": {"nodes": []}}},
                {"connected": {}},
            ]},
        }))
        .unwrap();
        match &issue {
            ItemContent::Issue { number, timeline_items, .. } => {
                assert_eq!(*number, 7);
                assert_eq!(timeline_items.nodes.len(), 2);
            }
            other => panic!("unexpected variant: {other:?}"),
        }

        let pr: ItemContent = serde_json::from_value(serde_json::json!({
            "__typename": "PullRequest",
            "number": 9,
            "title": "A PR",
            "mergedAt": "2024-03-01T12:00:00Z",
            "reviewRequests": {"nodes": [{"requestedReviewer": {"login": "octocat"}}]},
        }))
        .unwrap();
        match &pr {
            ItemContent::PullRequest(pr) => {
                assert_eq!(pr.number, 9);
                assert!(pr.merged_at.is_some());
                assert_eq!(pr.review_requests.nodes[0].requested_reviewer.as_ref().unwrap().login, "octocat");
            }
            other => panic!("unexpected variant: {other:?}"),
        }

        let draft: ItemContent = serde_json::from_value(serde_json::json!({
            "__typename": "DraftIssue",
            "title": "An idea",
        }))
        .unwrap();
        assert!(matches!(draft, ItemContent::DraftIssue { .. }));
    }

    fn org_page(nodes: Vec<serde_json::Value>, next: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "organization": {"projectV2": {
                "title": "Roadmap",
                "items": {
                    "nodes": nodes,
                    "pageInfo": {"hasNextPage": next.is_some(), "endCursor": next},
                },
            }}
        })
    }

    fn raw_draft(title: &str) -> serde_json::Value {
        serde_json::json!({
            "fieldValueByName": null,
            "content": {"__typename": "DraftIssue", "title": title},
        })
    }

    #[tokio::test]
    async fn org_project_is_paginated_to_the_end() {
        let exec = MockExecutor::with_data(vec![
            org_page(vec![raw_draft("one")], Some("CURSOR")),
            org_page(vec![raw_draft("two")], None),
        ]);

        let (items, title) = fetch_project_items(&exec, "org", "repo", 3, None).await.unwrap();
        assert_eq!(title, "Roadmap");
        assert_eq!(items.len(), 2);

        let calls = exec.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1["after"], serde_json::json!("CURSOR"));
    }

    #[tokio::test]
    async fn falls_back_to_the_repository_project() {
        let exec = MockExecutor::with_data(vec![
            serde_json::json!({"organization": {"projectV2": null}}),
            serde_json::json!({"repository": {"projectV2": {
                "title": "Repo board",
                "items": {"nodes": [raw_draft("only")],
                          "pageInfo": {"hasNextPage": false, "endCursor": null}},
            }}}),
        ]);

        let (items, title) = fetch_project_items(&exec, "org", "repo", 3, None).await.unwrap();
        assert_eq!(title, "Repo board");
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn missing_everywhere_is_project_not_found() {
        let exec = MockExecutor::with_data(vec![
            serde_json::json!({"organization": {"projectV2": null}}),
            serde_json::json!({"repository": {"projectV2": null}}),
        ]);

        let err = fetch_project_items(&exec, "org", "repo", 42, None).await.unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(42)));
    }

    #[tokio::test]
    async fn null_content_items_are_dropped() {
        let exec = MockExecutor::with_data(vec![org_page(
            vec![
                raw_draft("kept"),
                serde_json::json!({"fieldValueByName": null, "content": null}),
            ],
            None,
        )]);

        let (items, _) = fetch_project_items(&exec, "org", "repo", 1, None).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn last_project_prefers_the_newest() {
        let exec = MockExecutor::with_data(vec![serde_json::json!({
            "organization": {"projectsV2": {"nodes": [
                {"number": 4, "createdAt": "2024-01-01T00:00:00Z"},
            ]}},
            "repository": {"projectsV2": {"nodes": [
                {"number": 9, "createdAt": "2024-06-01T00:00:00Z"},
            ]}},
        })]);

        assert_eq!(last_project_number(&exec, "org", "repo").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn last_project_with_no_projects_is_an_error() {
        let exec = MockExecutor::with_data(vec![serde_json::json!({
            "organization": {"projectsV2": {"nodes": []}},
            "repository": {"projectsV2": {"nodes": []}},
        })]);

        let err = last_project_number(&exec, "org", "repo").await.unwrap_err();
        assert!(matches!(err, Error::NoProjects(_)));
    }
}
