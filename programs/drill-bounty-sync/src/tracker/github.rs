use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, Method, Url,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{Comment, Issue, IssueTracker, Label, Repository};
use crate::{
    config::{ApiToken, RepoRef},
    constant::{GITHUB_API_VERSION, PAGE_SIZE, USER_AGENT},
    errors::TrackerError,
    retry::{self, with_retry, RetryPolicy},
};

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Issues endpoint entry; pull requests come back from it too.
#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    labels: Vec<Label>,
    pull_request: Option<Value>,
}

fn issues_only(raw: Vec<RawIssue>) -> Vec<Issue> {
    raw.into_iter()
        .filter(|issue| issue.pull_request.is_none())
        .map(|issue| Issue {
            number: issue.number,
            title: issue.title,
            labels: issue.labels,
        })
        .collect()
}

/// GitHub REST v3 client.
#[derive(Clone)]
pub struct GithubClient {
    inner: Client,
    api_url: Url,
    token: ApiToken,
    retry: RetryPolicy,
}

impl GithubClient {
    pub fn new(
        api_url: Url,
        token: ApiToken,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, TrackerError> {
        if api_url.cannot_be_a_base() {
            return Err(TrackerError::InvalidEndpoint(api_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner,
            api_url,
            token,
            retry,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TrackerError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| TrackerError::InvalidEndpoint(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, TrackerError> {
        debug!(%method, %url, "tracker request");
        let mut request = self
            .inner
            .request(method, url)
            .bearer_auth(self.token.expose());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = retry::retry_after(response.headers());
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(TrackerError::HttpStatus {
                status,
                message,
                retry_after,
            });
        }

        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<T, TrackerError> {
        with_retry(&self.retry, operation, || {
            self.send(method.clone(), url.clone(), body.as_ref())
        })
        .await
    }

    async fn get_paginated<T: DeserializeOwned>(
        &self,
        operation: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, TrackerError> {
        let per_page = PAGE_SIZE.to_string();
        let mut items = Vec::new();
        for page in 1u32.. {
            let mut url = self.endpoint(segments)?;
            url.query_pairs_mut()
                .extend_pairs(query)
                .append_pair("per_page", &per_page)
                .append_pair("page", &page.to_string());

            let batch: Vec<T> = self.request(operation, Method::GET, url, None).await?;
            let last_page = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, TrackerError> {
        let url = self.endpoint(&["repos", &repo.owner, &repo.name])?;
        self.request("get repository", Method::GET, url, None).await
    }

    async fn list_open_issues(&self, repo: &RepoRef, label: &str) -> Result<Vec<Issue>, TrackerError> {
        let raw: Vec<RawIssue> = self
            .get_paginated(
                "list issues",
                &["repos", &repo.owner, &repo.name, "issues"],
                &[("state", "open"), ("labels", label)],
            )
            .await?;
        Ok(issues_only(raw))
    }

    async fn list_comments(&self, repo: &RepoRef, issue: u64) -> Result<Vec<Comment>, TrackerError> {
        let issue = issue.to_string();
        self.get_paginated(
            "list comments",
            &["repos", &repo.owner, &repo.name, "issues", &issue, "comments"],
            &[],
        )
        .await
    }

    async fn create_comment(
        &self,
        repo: &RepoRef,
        issue: u64,
        body: &str,
    ) -> Result<Comment, TrackerError> {
        let issue = issue.to_string();
        let url = self.endpoint(&["repos", &repo.owner, &repo.name, "issues", &issue, "comments"])?;
        let payload = json!({ "body": body });
        // Single attempt: a POST that timed out may still have created the comment.
        self.send(Method::POST, url, Some(&payload)).await
    }

    async fn update_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, TrackerError> {
        let comment_id = comment_id.to_string();
        let url = self.endpoint(&["repos", &repo.owner, &repo.name, "issues", "comments", &comment_id])?;
        self.request(
            "update comment",
            Method::PATCH,
            url,
            Some(json!({ "body": body })),
        )
        .await
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue: u64,
        labels: &[String],
    ) -> Result<(), TrackerError> {
        let issue = issue.to_string();
        let url = self.endpoint(&["repos", &repo.owner, &repo.name, "issues", &issue, "labels"])?;
        let _: Vec<Label> = self
            .request("add labels", Method::POST, url, Some(json!({ "labels": labels })))
            .await?;
        Ok(())
    }
}
