//! GitHub comment source.
//!
//! Pages through a repository's closed pull requests and collects the issue
//! and review comments of each one as [`CommentItem`]s. Fetch failures abort
//! the run; there is no retry layer here.

use crate::models::CommentItem;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Login recorded for comments whose author account no longer exists.
const DELETED_USER: &str = "ghost";

/// Pull requests fetched per page; the API maximum.
const PER_PAGE: usize = 100;

/// A GitHub API request failed. Aborts the batch for the caller to surface.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub API error {status} for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },
}

/// A pull request as returned by `GET /repos/{owner}/{repo}/pulls`.
///
/// Only the fields the pipeline consumes are kept; everything else in the
/// API payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
}

/// A comment on a pull request, either an issue comment or a review comment.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: Option<String>,
    pub user: Option<User>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

/// Thin client over the GitHub REST v3 API.
pub struct GithubClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    /// Creates a client with the standard headers, optionally authenticated.
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "application/vnd.github.v3+json"
                .parse()
                .map_err(|_| FetchError::Client("invalid accept header".to_string()))?,
        );
        if let Some(token) = token {
            let value = format!("token {}", token)
                .parse()
                .map_err(|_| FetchError::Client("invalid GitHub token".to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("sentipr/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches up to `limit` closed pull requests, most recently updated
    /// first, paging until the limit is reached or a page comes back empty.
    pub async fn closed_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        limit: usize,
    ) -> Result<Vec<PullRequest>, FetchError> {
        info!("Fetching closed pull requests for {}/{}", owner, repo);

        let url = format!("{}/repos/{}/{}/pulls", self.api_url, owner, repo);
        let mut prs: Vec<PullRequest> = Vec::new();
        let mut page = 1;

        while prs.len() < limit {
            let batch: Vec<PullRequest> = self
                .get_json(
                    &url,
                    &[
                        ("state", "closed".to_string()),
                        ("sort", "updated".to_string()),
                        ("direction", "desc".to_string()),
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            if batch.is_empty() {
                break;
            }

            debug!("Page {} returned {} pull requests", page, batch.len());
            prs.extend(batch);
            page += 1;
        }

        prs.truncate(limit);
        info!("Fetched {} closed pull requests", prs.len());
        Ok(prs)
    }

    /// Collects the comment items for a set of pull requests.
    ///
    /// Each pull request contributes its issue comments and review comments;
    /// a pull request with neither contributes one blank placeholder item so
    /// it stays represented downstream.
    pub async fn comment_items(
        &self,
        owner: &str,
        repo: &str,
        prs: &[PullRequest],
        show_progress: bool,
    ) -> Result<Vec<CommentItem>, FetchError> {
        let progress = progress_bar(prs.len() as u64, show_progress);
        let mut items = Vec::new();

        for pr in prs {
            let issue_url = format!(
                "{}/repos/{}/{}/issues/{}/comments",
                self.api_url, owner, repo, pr.number
            );
            let review_url = format!(
                "{}/repos/{}/{}/pulls/{}/comments",
                self.api_url, owner, repo, pr.number
            );

            let issue_comments: Vec<Comment> = self.get_json(&issue_url, &[]).await?;
            let review_comments: Vec<Comment> = self.get_json(&review_url, &[]).await?;

            items.extend(items_for_pr(pr, &issue_comments, &review_comments));

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        info!("Collected {} comment items", items.len());
        Ok(items)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let response = self.http_client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

/// Builds the comment items of one pull request from its fetched comments.
///
/// Comments keep their source (`issue_comment` / `review_comment`), author
/// and timestamp as metadata; a pull request without any comments yields
/// exactly one blank placeholder item.
pub fn items_for_pr(
    pr: &PullRequest,
    issue_comments: &[Comment],
    review_comments: &[Comment],
) -> Vec<CommentItem> {
    let mut items = Vec::new();

    let tagged = issue_comments
        .iter()
        .map(|c| (c, "issue_comment"))
        .chain(review_comments.iter().map(|c| (c, "review_comment")));

    for (comment, comment_type) in tagged {
        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), pr.title.clone());
        metadata.insert("comment_type".to_string(), comment_type.to_string());
        metadata.insert("comment_id".to_string(), comment.id.to_string());
        metadata.insert(
            "author".to_string(),
            comment
                .user
                .as_ref()
                .map(|u| u.login.clone())
                .unwrap_or_else(|| DELETED_USER.to_string()),
        );
        if let Some(created_at) = comment.created_at {
            metadata.insert("created_at".to_string(), created_at.to_rfc3339());
        }

        let text = comment.body.clone().unwrap_or_default();
        items.push(CommentItem::new(pr.number, text, metadata));
    }

    if items.is_empty() {
        items.push(CommentItem::without_comments(pr.number, &pr.title));
    }

    items
}

fn progress_bar(len: u64, show: bool) -> Option<ProgressBar> {
    if !show {
        return None;
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Fetching comments [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    Some(pb)
}
