//! GitHub GraphQL client and the query-executor seam

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{Error, Result};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Executes named GraphQL operations, returning the `data` payload.
///
/// The one seam every fetcher goes through; tests swap in a queued mock.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, name: &str, query: &str, variables: Value) -> Result<Value>;
}

/// Cursor-based pagination state shared by every paged query.
///
/// `end_cursor` is meaningless once `has_next_page` is false and must not be
/// echoed into a further request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// GitHub GraphQL API client
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    /// Create a client, resolving a token from (in priority order)
    /// `GITHUB_TOKEN`, `GH_TOKEN`, then the GitHub CLI's stored credentials.
    pub fn new() -> Result<Self> {
        Ok(GitHubClient {
            http: reqwest::Client::new(),
            token: resolve_token()?,
        })
    }

    /// Create a client with an explicit token.
    pub fn with_token(token: impl Into<String>) -> Self {
        GitHubClient {
            http: reqwest::Client::new(),
            token: token.into(),
        }
    }
}

fn resolve_token() -> Result<String> {
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var) {
            if !token.is_empty() {
                return Ok(token);
            }
        }
    }

    let output = std::process::Command::new("gh")
        .args(["auth", "token"])
        .output()
        .map_err(|err| {
            Error::Auth(format!("no GITHUB_TOKEN set and could not run `gh`: {err}"))
        })?;
    if !output.status.success() {
        return Err(Error::Auth(
            "no GitHub token found. Set GITHUB_TOKEN or run `gh auth login`".into(),
        ));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::Auth("`gh auth token` returned an empty token".into()));
    }
    Ok(token)
}

#[async_trait]
impl QueryExecutor for GitHubClient {
    async fn execute(&self, name: &str, query: &str, variables: Value) -> Result<Value> {
        debug!(name, "executing GraphQL query");

        let body = json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(GRAPHQL_URL)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "peddi-tooling")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response".to_string());
            return Err(Error::Graphql(format!(
                "query '{name}' failed with status {status}: {text}"
            )));
        }

        let parsed: GraphQlResponse = response
            .json()
            .await
            .map_err(|err| Error::Parse(format!("invalid GraphQL response for '{name}': {err}")))?;

        if let Some(errors) = parsed.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(Error::Graphql(messages.join(", ")));
        }

        parsed
            .data
            .ok_or_else(|| Error::Graphql(format!("response for '{name}' is missing data")))
    }
}

const VIEWER_LOGIN: &str = r"
query {
  viewer {
    login
  }
}
";

/// Login of the authenticated user.
pub async fn viewer_login(exec: &dyn QueryExecutor) -> Result<String> {
    let data = exec.execute("ViewerLogin", VIEWER_LOGIN, json!({})).await?;
    data.pointer("/viewer/login")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| Error::Parse("viewer login missing from response".into()))
}
