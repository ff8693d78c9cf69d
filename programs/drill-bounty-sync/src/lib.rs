pub mod action;
pub mod config;
pub mod constant;
pub mod errors;
pub mod event;
pub mod ledger;
pub mod matcher;
pub mod pda;
pub mod reconcile;
pub mod render;
pub mod retry;
pub mod state;
pub mod tracker;
pub mod utils;

pub use config::{Config, ReconcileSettings};
pub use errors::SyncError;
pub use event::{IssueOutcome, IssueReport, RunSummary};
pub use reconcile::Reconciler;
