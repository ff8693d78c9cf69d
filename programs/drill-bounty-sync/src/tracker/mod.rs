use async_trait::async_trait;
use serde::Deserialize;

use crate::{config::RepoRef, errors::TrackerError};

pub mod github;

pub use github::GithubClient;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub full_name: String,
    pub html_url: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Issue {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
}

/// Issue tracker operations the reconciliation needs.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, TrackerError>;

    /// Open issues carrying `label`, in the tracker's default order.
    async fn list_open_issues(&self, repo: &RepoRef, label: &str) -> Result<Vec<Issue>, TrackerError>;

    /// Comments of an issue, oldest first.
    async fn list_comments(&self, repo: &RepoRef, issue: u64) -> Result<Vec<Comment>, TrackerError>;

    async fn create_comment(
        &self,
        repo: &RepoRef,
        issue: u64,
        body: &str,
    ) -> Result<Comment, TrackerError>;

    async fn update_comment(
        &self,
        repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, TrackerError>;

    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue: u64,
        labels: &[String],
    ) -> Result<(), TrackerError>;
}
