use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use anchor_lang::{
    prelude::Pubkey,
    solana_program::{program_option::COption, program_pack::Pack},
};
use anchor_spl::token::spl_token::state::{Account as SplAccount, AccountState, Mint as SplMint};
use async_trait::async_trait;
use drill_bounty_sync::{
    config::{Cluster, ClusterContext, RepoRef},
    constant::{BOUNTY_ENABLED_LABEL, BOUNTY_UPDATED_LABEL, TRACKING_MARKER},
    errors::{IssueStage, LedgerError, SyncError, TrackerError},
    ledger::{registry, AccountSource, RawAccount},
    pda,
    state::{Board, Bounty, ProgramAccount},
    tracker::{Comment, Issue, IssueTracker, Label, Repository},
    IssueOutcome, ReconcileSettings, Reconciler,
};
use reqwest::{StatusCode, Url};

const REPOSITORY_ID: u64 = 7;

#[derive(Default)]
struct FakeLedger {
    accounts: HashMap<Pubkey, RawAccount>,
    /// Addresses whose reads fail as if the node gave up after retries.
    failing: HashSet<Pubkey>,
}

#[async_trait]
impl AccountSource for FakeLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, LedgerError> {
        if self.failing.contains(address) {
            return Err(LedgerError::Rpc {
                code: -32005,
                message: "node is behind".into(),
            });
        }
        Ok(self.accounts.get(address).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Write {
    Create { issue: u64 },
    Update { comment_id: u64 },
    Labels { issue: u64, labels: Vec<String> },
}

#[derive(Default)]
struct TrackerState {
    issues: Vec<Issue>,
    comments: HashMap<u64, Vec<Comment>>,
    writes: Vec<Write>,
    comment_listings: usize,
    next_comment_id: u64,
}

#[derive(Default)]
struct FakeTracker {
    state: Mutex<TrackerState>,
    reject_updates: bool,
    reject_creates_on: HashSet<u64>,
}

impl FakeTracker {
    fn with_issues(numbers: &[u64]) -> Self {
        let tracker = Self::default();
        {
            let mut state = tracker.state.lock().unwrap();
            state.next_comment_id = 1000;
            state.issues = numbers
                .iter()
                .map(|&number| Issue {
                    number,
                    title: format!("issue {number}"),
                    labels: vec![Label {
                        name: BOUNTY_ENABLED_LABEL.into(),
                    }],
                })
                .collect();
        }
        tracker
    }

    fn add_comment(&self, issue: u64, id: u64, body: &str) {
        self.state
            .lock()
            .unwrap()
            .comments
            .entry(issue)
            .or_default()
            .push(Comment {
                id,
                body: body.into(),
            });
    }

    fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    fn comments(&self, issue: u64) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&issue)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, TrackerError> {
        Ok(Repository {
            id: REPOSITORY_ID,
            full_name: repo.to_string(),
            html_url: format!("https://github.com/{repo}"),
            default_branch: "main".into(),
        })
    }

    async fn list_open_issues(&self, _repo: &RepoRef, label: &str) -> Result<Vec<Issue>, TrackerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .issues
            .iter()
            .filter(|issue| issue.has_label(label))
            .cloned()
            .collect())
    }

    async fn list_comments(&self, _repo: &RepoRef, issue: u64) -> Result<Vec<Comment>, TrackerError> {
        let mut state = self.state.lock().unwrap();
        state.comment_listings += 1;
        Ok(state.comments.get(&issue).cloned().unwrap_or_default())
    }

    async fn create_comment(
        &self,
        _repo: &RepoRef,
        issue: u64,
        body: &str,
    ) -> Result<Comment, TrackerError> {
        if self.reject_creates_on.contains(&issue) {
            return Err(TrackerError::HttpStatus {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: "Validation Failed".into(),
                retry_after: None,
            });
        }
        let mut state = self.state.lock().unwrap();
        state.next_comment_id += 1;
        let comment = Comment {
            id: state.next_comment_id,
            body: body.into(),
        };
        state.comments.entry(issue).or_default().push(comment.clone());
        state.writes.push(Write::Create { issue });
        Ok(comment)
    }

    async fn update_comment(
        &self,
        _repo: &RepoRef,
        comment_id: u64,
        body: &str,
    ) -> Result<Comment, TrackerError> {
        if self.reject_updates {
            return Err(TrackerError::HttpStatus {
                status: StatusCode::FORBIDDEN,
                message: "Resource not accessible by integration".into(),
                retry_after: None,
            });
        }
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::Update { comment_id });
        let comment = state
            .comments
            .values_mut()
            .flatten()
            .find(|comment| comment.id == comment_id)
            .unwrap();
        comment.body = body.into();
        Ok(comment.clone())
    }

    async fn add_labels(
        &self,
        _repo: &RepoRef,
        issue: u64,
        labels: &[String],
    ) -> Result<(), TrackerError> {
        let mut state = self.state.lock().unwrap();
        state.writes.push(Write::Labels {
            issue,
            labels: labels.to_vec(),
        });
        if let Some(entry) = state.issues.iter_mut().find(|entry| entry.number == issue) {
            entry
                .labels
                .extend(labels.iter().map(|name| Label { name: name.clone() }));
        }
        Ok(())
    }
}

struct World {
    program_id: Pubkey,
    board: Pubkey,
    ledger: FakeLedger,
}

impl World {
    fn new() -> Self {
        let program_id = Pubkey::new_unique();
        let board_id = REPOSITORY_ID as u32;
        let (board, _) = pda::board_address(&program_id, board_id).unwrap();

        let mut ledger = FakeLedger::default();
        ledger.accounts.insert(
            board,
            RawAccount {
                owner: program_id,
                data: Board {
                    board_id,
                    authority: Pubkey::new_unique(),
                    accepted_mint: registry::USDC_MAINNET,
                    lock_time: 86_400,
                    board_bump: 255,
                    board_vault_bump: 255,
                }
                .encode(),
            },
        );
        ledger
            .accounts
            .insert(registry::USDC_MAINNET, mint_account(6));

        Self {
            program_id,
            board,
            ledger,
        }
    }

    fn without_board() -> Self {
        let mut world = Self::new();
        world.ledger.accounts.remove(&world.board);
        world
    }

    fn add_bounty(&mut self, issue: u64, amount: u64) {
        let (bounty, _) = pda::bounty_address(&self.program_id, &self.board, issue as u32).unwrap();
        self.ledger.accounts.insert(
            bounty,
            RawAccount {
                owner: self.program_id,
                data: Bounty {
                    board_id: REPOSITORY_ID as u32,
                    bounty_id: issue as u32,
                    bounty_bump: 255,
                    bounty_vault_bump: 255,
                    bounty_hunter: None,
                    is_closed: false,
                    closed_at: None,
                }
                .encode(),
            },
        );
        self.set_balance(issue, amount);
    }

    fn set_balance(&mut self, issue: u64, amount: u64) {
        let vault = self.vault_address(issue);
        self.ledger
            .accounts
            .insert(vault, token_account(registry::USDC_MAINNET, amount));
    }

    fn fail_vault_reads(&mut self, issue: u64) {
        let vault = self.vault_address(issue);
        self.ledger.failing.insert(vault);
    }

    fn remove_vault(&mut self, issue: u64) {
        let vault = self.vault_address(issue);
        self.ledger.accounts.remove(&vault);
    }

    fn vault_address(&self, issue: u64) -> Pubkey {
        let (bounty, _) = pda::bounty_address(&self.program_id, &self.board, issue as u32).unwrap();
        pda::bounty_vault_address(&self.program_id, &bounty).unwrap().0
    }

    fn settings(&self, dry_run: bool) -> ReconcileSettings {
        ReconcileSettings {
            repository: "heavy-duty/drill".parse().unwrap(),
            program_id: self.program_id,
            cluster: ClusterContext {
                cluster: Cluster::MainnetBeta,
                rpc_endpoint: Url::parse("https://api.mainnet-beta.solana.com").unwrap(),
                explorer_url: Url::parse("https://explorer.solana.com").unwrap(),
            },
            enabled_label: BOUNTY_ENABLED_LABEL.into(),
            updated_label: BOUNTY_UPDATED_LABEL.into(),
            dry_run,
            max_concurrency: 4,
        }
    }
}

fn token_account(mint: Pubkey, amount: u64) -> RawAccount {
    let mut data = vec![0u8; SplAccount::LEN];
    SplAccount {
        mint,
        owner: Pubkey::new_unique(),
        amount,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    }
    .pack_into_slice(&mut data);
    RawAccount {
        owner: anchor_spl::token::ID,
        data,
    }
}

fn mint_account(decimals: u8) -> RawAccount {
    let mut data = vec![0u8; SplMint::LEN];
    SplMint {
        mint_authority: COption::None,
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    }
    .pack_into_slice(&mut data);
    RawAccount {
        owner: anchor_spl::token::ID,
        data,
    }
}

#[tokio::test]
async fn missing_vault_skips_only_that_issue() {
    let mut world = World::new();
    for issue in [1, 2, 3] {
        world.add_bounty(issue, 250_000_000);
    }
    world.remove_vault(2);
    let tracker = FakeTracker::with_issues(&[1, 2, 3]);
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.issues.len(), 3);
    assert!(matches!(summary.get(1), Some(IssueOutcome::Created { .. })));
    assert!(matches!(summary.get(3), Some(IssueOutcome::Created { .. })));
    assert!(matches!(
        summary.get(2),
        Some(IssueOutcome::Skipped {
            stage: IssueStage::Fetching,
            ..
        })
    ));
    assert_eq!(summary.created(), 2);
    assert_eq!(summary.skipped(), 1);

    assert!(tracker.comments(2).is_empty());
    let body = &tracker.comments(1)[0].body;
    assert!(body.starts_with(TRACKING_MARKER));
    assert!(body.contains("**250.00 USDC**"));
}

#[tokio::test]
async fn ledger_error_skips_only_that_issue() {
    let mut world = World::new();
    for issue in [1, 2, 3] {
        world.add_bounty(issue, 250_000_000);
    }
    world.fail_vault_reads(2);
    let tracker = FakeTracker::with_issues(&[1, 2, 3]);
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert!(matches!(summary.get(1), Some(IssueOutcome::Created { .. })));
    assert!(matches!(summary.get(3), Some(IssueOutcome::Created { .. })));
    match summary.get(2) {
        Some(IssueOutcome::Skipped { stage, reason }) => {
            assert_eq!(*stage, IssueStage::Fetching);
            assert!(reason.contains("node is behind"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(tracker.comments(2).is_empty());
    assert_eq!(tracker.comments(1).len(), 1);
    assert_eq!(tracker.comments(3).len(), 1);
}

#[tokio::test]
async fn publish_failure_does_not_stop_other_issues() {
    let mut world = World::new();
    for issue in [1, 2, 3] {
        world.add_bounty(issue, 1_000_000);
    }
    let tracker = FakeTracker {
        reject_creates_on: HashSet::from([2]),
        ..FakeTracker::with_issues(&[1, 2, 3])
    };
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert!(matches!(summary.get(1), Some(IssueOutcome::Created { .. })));
    assert!(matches!(summary.get(3), Some(IssueOutcome::Created { .. })));
    assert!(matches!(
        summary.get(2),
        Some(IssueOutcome::Failed {
            stage: IssueStage::Publishing,
            ..
        })
    ));
    assert_eq!(summary.failed(), 1);
    assert!(!tracker
        .writes()
        .iter()
        .any(|write| matches!(write, Write::Create { issue: 2 } | Write::Labels { issue: 2, .. })));
}

#[tokio::test]
async fn missing_board_aborts_before_issue_work() {
    let world = World::without_board();
    let tracker = FakeTracker::with_issues(&[1, 2]);
    let settings = world.settings(false);

    let err = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::BoardNotFound { .. }));
    assert_eq!(tracker.state.lock().unwrap().comment_listings, 0);
    assert!(tracker.writes().is_empty());
}

#[tokio::test]
async fn creates_comment_and_applies_label() {
    let mut world = World::new();
    world.add_bounty(4, 1_000_000);
    let tracker = FakeTracker::with_issues(&[4]);
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.get(4), Some(&IssueOutcome::Created { comment_id: 1001 }));
    assert_eq!(
        tracker.writes(),
        vec![
            Write::Create { issue: 4 },
            Write::Labels {
                issue: 4,
                labels: vec![BOUNTY_UPDATED_LABEL.to_string()],
            },
        ]
    );
}

#[tokio::test]
async fn existing_tracking_comment_is_updated_in_place() {
    let mut world = World::new();
    world.add_bounty(5, 1_000_000);
    let tracker = FakeTracker::with_issues(&[5]);
    tracker.add_comment(5, 11, "happy to take this");
    tracker.add_comment(5, 12, &format!("{TRACKING_MARKER}\nstale report"));
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.get(5), Some(&IssueOutcome::Updated { comment_id: 12 }));
    let comments = tracker.comments(5);
    assert_eq!(comments.len(), 2);
    assert!(comments[1].body.contains("**1.00 USDC**"));
    assert!(!tracker
        .writes()
        .iter()
        .any(|write| matches!(write, Write::Create { .. })));
}

#[tokio::test]
async fn repeated_runs_converge() {
    let mut world = World::new();
    world.add_bounty(6, 5_000_000);
    let tracker = FakeTracker::with_issues(&[6]);
    let settings = world.settings(false);

    let first = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();
    assert_eq!(first.created(), 1);
    let writes_after_first = tracker.writes().len();

    let second = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();
    assert_eq!(second.get(6), Some(&IssueOutcome::Unchanged { comment_id: 1001 }));
    assert_eq!(tracker.writes().len(), writes_after_first);
    assert_eq!(tracker.comments(6).len(), 1);

    // A deposit changes the report; the same comment is rewritten.
    world.set_balance(6, 7_500_000);
    let third = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();
    assert_eq!(third.get(6), Some(&IssueOutcome::Updated { comment_id: 1001 }));
    assert_eq!(tracker.comments(6).len(), 1);
    assert!(tracker.comments(6)[0].body.contains("**7.50 USDC**"));
}

#[tokio::test]
async fn failed_update_never_falls_back_to_create() {
    let mut world = World::new();
    world.add_bounty(8, 1_000_000);
    let tracker = FakeTracker {
        reject_updates: true,
        ..FakeTracker::with_issues(&[8])
    };
    tracker.add_comment(8, 80, &format!("{TRACKING_MARKER}\nold"));
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert!(matches!(
        summary.get(8),
        Some(IssueOutcome::Failed {
            stage: IssueStage::Publishing,
            ..
        })
    ));
    assert_eq!(summary.failed(), 1);
    assert!(tracker.writes().is_empty());
    assert_eq!(tracker.comments(8).len(), 1);
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let mut world = World::new();
    world.add_bounty(9, 1_000_000);
    world.add_bounty(10, 2_000_000);
    let tracker = FakeTracker::with_issues(&[9, 10]);
    tracker.add_comment(10, 100, &format!("{TRACKING_MARKER}\nold"));
    let settings = world.settings(true);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.get(9), Some(&IssueOutcome::DryRun { existing: None }));
    assert_eq!(
        summary.get(10),
        Some(&IssueOutcome::DryRun {
            existing: Some(100)
        })
    );
    assert!(tracker.writes().is_empty());
}

#[tokio::test]
async fn issue_without_bounty_is_skipped() {
    let world = World::new();
    let tracker = FakeTracker::with_issues(&[11]);
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    match summary.get(11) {
        Some(IssueOutcome::Skipped { stage, reason }) => {
            assert_eq!(*stage, IssueStage::Fetching);
            assert!(reason.starts_with("no bounty account at"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(tracker.writes().is_empty());
}

#[tokio::test]
async fn issue_number_beyond_bounty_id_range_is_skipped() {
    let world = World::new();
    let tracker = FakeTracker::with_issues(&[u64::from(u32::MAX) + 1]);
    let settings = world.settings(false);

    let summary = Reconciler::new(&tracker, &world.ledger, &settings)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.skipped(), 1);
    assert_eq!(tracker.state.lock().unwrap().comment_listings, 0);
}
