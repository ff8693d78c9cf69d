use std::fmt;

use tracing::{info, warn};

use crate::errors::IssueStage;

/// What reconciliation did with one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Created { comment_id: u64 },
    Updated { comment_id: u64 },
    /// The tracking comment already shows the current state.
    Unchanged { comment_id: u64 },
    /// Rendered but not written.
    DryRun { existing: Option<u64> },
    /// Stopped before any tracker write.
    Skipped { stage: IssueStage, reason: String },
    /// A tracker write was attempted and failed.
    Failed { stage: IssueStage, error: String },
}

impl IssueOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Skipped { .. } | Self::Failed { .. })
    }
}

impl fmt::Display for IssueOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { comment_id } => write!(f, "created comment {comment_id}"),
            Self::Updated { comment_id } => write!(f, "updated comment {comment_id}"),
            Self::Unchanged { comment_id } => write!(f, "comment {comment_id} already current"),
            Self::DryRun { existing: Some(id) } => write!(f, "dry run, would update comment {id}"),
            Self::DryRun { existing: None } => f.write_str("dry run, would create comment"),
            Self::Skipped { stage, reason } => write!(f, "skipped while {stage}: {reason}"),
            Self::Failed { stage, error } => write!(f, "failed while {stage}: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReport {
    pub number: u64,
    pub outcome: IssueOutcome,
}

/// Aggregate result of one run, issues sorted by number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub repository: String,
    pub issues: Vec<IssueReport>,
}

impl RunSummary {
    pub fn new(repository: impl Into<String>, mut issues: Vec<IssueReport>) -> Self {
        issues.sort_by_key(|report| report.number);
        Self {
            repository: repository.into(),
            issues,
        }
    }

    fn count(&self, predicate: impl Fn(&IssueOutcome) -> bool) -> usize {
        self.issues
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }

    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, IssueOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, IssueOutcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|outcome| matches!(outcome, IssueOutcome::Unchanged { .. }))
    }

    pub fn dry_run(&self) -> usize {
        self.count(|outcome| matches!(outcome, IssueOutcome::DryRun { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, IssueOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, IssueOutcome::Failed { .. }))
    }

    pub fn get(&self, number: u64) -> Option<&IssueOutcome> {
        self.issues
            .iter()
            .find(|report| report.number == number)
            .map(|report| &report.outcome)
    }

    pub fn log(&self) {
        for report in &self.issues {
            if report.outcome.is_success() {
                info!(issue = report.number, outcome = %report.outcome, "issue reconciled");
            } else {
                warn!(issue = report.number, outcome = %report.outcome, "issue not reconciled");
            }
        }
        info!(
            repository = %self.repository,
            total = self.issues.len(),
            created = self.created(),
            updated = self.updated(),
            unchanged = self.unchanged(),
            dry_run = self.dry_run(),
            skipped = self.skipped(),
            failed = self.failed(),
            "run complete"
        );
    }
}
