//! Run driver: resolves the board once, then reconciles every enabled issue
//! concurrently. Per-issue failures end up in the [`RunSummary`]; only board
//! resolution, the tracker listings, or an address derivation defect abort
//! the run.

use futures::{stream, try_join, StreamExt, TryStreamExt};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    config::ReconcileSettings,
    errors::{DerivationError, IssueError, LedgerError, SyncError},
    event::{IssueOutcome, IssueReport, RunSummary},
    ledger::{AccountSource, LedgerStateReader},
    matcher::find_tracking_comment,
    pda,
    render::render_report,
    state::{Board, Snapshot},
    tracker::{Comment, Issue, IssueTracker, Repository},
};

pub struct Reconciler<'a, T: ?Sized, S: ?Sized> {
    tracker: &'a T,
    ledger: LedgerStateReader<'a, S>,
    settings: &'a ReconcileSettings,
}

impl<'a, T, S> Reconciler<'a, T, S>
where
    T: IssueTracker + ?Sized,
    S: AccountSource + ?Sized,
{
    pub fn new(tracker: &'a T, accounts: &'a S, settings: &'a ReconcileSettings) -> Self {
        Self {
            tracker,
            ledger: LedgerStateReader::new(accounts, settings.program_id),
            settings,
        }
    }

    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        let repo = &self.settings.repository;
        let repository = self.tracker.get_repository(repo).await?;
        let board = self.resolve_board(&repository).await?;
        info!(
            %repo,
            board = %board.address,
            board_id = board.board_id,
            accepted_mint = %board.accepted_mint,
            "board resolved"
        );

        let issues = self
            .tracker
            .list_open_issues(repo, &self.settings.enabled_label)
            .await?;
        info!(count = issues.len(), label = %self.settings.enabled_label, "open bounty issues");

        let reports: Vec<IssueReport> = stream::iter(issues)
            .map(|issue| self.reconcile_issue(&repository, &board, issue))
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(RunSummary::new(repo.to_string(), reports))
    }

    async fn resolve_board(&self, repository: &Repository) -> Result<Snapshot<Board>, SyncError> {
        let board_id =
            u32::try_from(repository.id).map_err(|_| SyncError::BoardIdOverflow(repository.id))?;
        let (address, _) = pda::board_address(self.ledger.program_id(), board_id)?;

        let board = self
            .ledger
            .fetch_board(&address)
            .await?
            .ok_or_else(|| SyncError::BoardNotFound {
                repository: self.settings.repository.to_string(),
                address,
            })?;
        if board.board_id != board_id {
            warn!(%address, expected = board_id, found = board.board_id, "board id mismatch");
        }
        Ok(board)
    }

    async fn reconcile_issue(
        &self,
        repository: &Repository,
        board: &Snapshot<Board>,
        issue: Issue,
    ) -> Result<IssueReport, DerivationError> {
        let span = info_span!("issue", number = issue.number, title = %issue.title);
        let outcome = match self
            .sync_issue(repository, board, &issue)
            .instrument(span)
            .await
        {
            Ok(outcome) => outcome,
            Err(IssueError::Ledger(LedgerError::Derivation(err))) => return Err(err),
            Err(err) if err.is_skip() => IssueOutcome::Skipped {
                stage: err.stage(),
                reason: err.to_string(),
            },
            Err(err) => IssueOutcome::Failed {
                stage: err.stage(),
                error: err.to_string(),
            },
        };

        Ok(IssueReport {
            number: issue.number,
            outcome,
        })
    }

    async fn sync_issue(
        &self,
        repository: &Repository,
        board: &Snapshot<Board>,
        issue: &Issue,
    ) -> Result<IssueOutcome, IssueError> {
        let bounty_id =
            u32::try_from(issue.number).map_err(|_| IssueError::BountyIdOverflow(issue.number))?;
        let program_id = self.ledger.program_id();
        let (bounty_address, _) =
            pda::bounty_address(program_id, &board.address, bounty_id).map_err(LedgerError::from)?;
        let (vault_address, _) =
            pda::bounty_vault_address(program_id, &bounty_address).map_err(LedgerError::from)?;

        let (bounty, vault) = try_join!(
            self.ledger.fetch_bounty(&bounty_address),
            self.ledger.fetch_vault(&vault_address),
        )?;
        let bounty = bounty.ok_or(IssueError::BountyNotFound(bounty_address))?;
        let vault = vault.ok_or(IssueError::VaultNotFound(vault_address))?;

        if bounty.board_id != board.board_id || bounty.bounty_id != bounty_id {
            warn!(
                bounty = %bounty_address,
                board_id = bounty.board_id,
                bounty_id = bounty.bounty_id,
                "bounty ids do not match its address"
            );
        }
        if vault.mint != board.accepted_mint {
            warn!(
                vault = %vault_address,
                mint = %vault.mint,
                accepted_mint = %board.accepted_mint,
                "vault mint differs from board mint"
            );
        }

        let token = self
            .ledger
            .fetch_token_metadata(&vault.mint, self.settings.cluster.cluster)
            .await?;

        let comments = self
            .tracker
            .list_comments(&self.settings.repository, issue.number)
            .await
            .map_err(IssueError::Comments)?;
        let existing = find_tracking_comment(&comments);

        let body = render_report(
            bounty_id,
            board,
            &bounty,
            &vault,
            &token,
            repository,
            &self.settings.cluster,
        );
        self.publish(issue, existing, body).await
    }

    async fn publish(
        &self,
        issue: &Issue,
        existing: Option<&Comment>,
        body: String,
    ) -> Result<IssueOutcome, IssueError> {
        let repo = &self.settings.repository;
        if self.settings.dry_run {
            info!(existing = ?existing.map(|comment| comment.id), "dry run, not publishing");
            debug!(%body, "rendered report");
            return Ok(IssueOutcome::DryRun {
                existing: existing.map(|comment| comment.id),
            });
        }

        // An update failure is final for this run, a second tracking comment is never created.
        let outcome = match existing {
            Some(comment) if comment.body == body => IssueOutcome::Unchanged {
                comment_id: comment.id,
            },
            Some(comment) => {
                self.tracker
                    .update_comment(repo, comment.id, &body)
                    .await
                    .map_err(IssueError::Publish)?;
                IssueOutcome::Updated {
                    comment_id: comment.id,
                }
            }
            None => {
                let comment = self
                    .tracker
                    .create_comment(repo, issue.number, &body)
                    .await
                    .map_err(IssueError::Publish)?;
                IssueOutcome::Created {
                    comment_id: comment.id,
                }
            }
        };

        let comment_id = match outcome {
            IssueOutcome::Created { comment_id }
            | IssueOutcome::Updated { comment_id }
            | IssueOutcome::Unchanged { comment_id } => comment_id,
            _ => return Ok(outcome),
        };
        let label = &self.settings.updated_label;
        if !issue.has_label(label) {
            self.tracker
                .add_labels(repo, issue.number, std::slice::from_ref(label))
                .await
                .map_err(|source| IssueError::Label { comment_id, source })?;
        }

        info!(%outcome, "issue published");
        Ok(outcome)
    }
}
