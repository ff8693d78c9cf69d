use std::{fmt, time::Duration};

use anchor_lang::prelude::Pubkey;
use reqwest::StatusCode;

use crate::retry::Transient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no viable bump seed for {account} address under program {program_id}")]
pub struct DerivationError {
    pub account: &'static str,
    pub program_id: Pubkey,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger RPC transport error: HTTP status {status}")]
    HttpStatus {
        status: StatusCode,
        retry_after: Option<Duration>,
    },

    #[error("ledger RPC JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ledger RPC error [{code}]: {message}")]
    Rpc { code: i64, message: String },

    #[error("ledger RPC returned an empty response")]
    EmptyResponse,

    #[error("could not decode {account} account {address}: {reason}")]
    Decode {
        account: &'static str,
        address: Pubkey,
        reason: String,
    },

    #[error(transparent)]
    Derivation(#[from] DerivationError),
}

impl LedgerError {
    pub fn decode(account: &'static str, address: Pubkey, reason: impl fmt::Display) -> Self {
        Self::Decode {
            account,
            address,
            reason: reason.to_string(),
        }
    }
}

impl Transient for LedgerError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => is_transient_transport(err),
            Self::HttpStatus { status, .. } => is_transient_status(*status),
            Self::EmptyResponse => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::HttpStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("invalid tracker endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("tracker transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("tracker returned HTTP {status}: {message}")]
    HttpStatus {
        status: StatusCode,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("tracker JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Transient for TrackerError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => is_transient_transport(err),
            Self::HttpStatus { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::HttpStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Where in the per-issue pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStage {
    Fetching,
    Matching,
    Publishing,
}

impl fmt::Display for IssueStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetching => "fetching",
            Self::Matching => "matching",
            Self::Publishing => "publishing",
        })
    }
}

/// Failures local to one issue. None of them stop the other issues.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("issue number {0} does not fit a bounty id")]
    BountyIdOverflow(u64),

    #[error("no bounty account at {0}")]
    BountyNotFound(Pubkey),

    #[error("no vault account at {0}")]
    VaultNotFound(Pubkey),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("could not list comments: {0}")]
    Comments(#[source] TrackerError),

    #[error("could not publish tracking comment: {0}")]
    Publish(#[source] TrackerError),

    #[error("comment {comment_id} published but labeling failed: {source}")]
    Label {
        comment_id: u64,
        #[source]
        source: TrackerError,
    },
}

impl IssueError {
    pub fn stage(&self) -> IssueStage {
        match self {
            Self::BountyIdOverflow(_)
            | Self::BountyNotFound(_)
            | Self::VaultNotFound(_)
            | Self::Ledger(_) => IssueStage::Fetching,
            Self::Comments(_) => IssueStage::Matching,
            Self::Publish(_) | Self::Label { .. } => IssueStage::Publishing,
        }
    }

    /// Skipped issues never reached a tracker write; failed ones did.
    pub fn is_skip(&self) -> bool {
        self.stage() != IssueStage::Publishing
    }
}

/// Failures that abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("repository id {0} does not fit a board id")]
    BoardIdOverflow(u64),

    #[error("no bounty board found for repository {repository} at {address}")]
    BoardNotFound { repository: String, address: Pubkey },

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error("could not read board: {0}")]
    Ledger(#[from] LedgerError),

    #[error("tracker request failed: {0}")]
    Tracker(#[from] TrackerError),
}
