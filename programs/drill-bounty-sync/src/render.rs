//! Tracking comment synthesis.
//!
//! Everything here is pure: the same accounts always render the same body,
//! which is what lets the driver skip updates that would change nothing.

use anchor_lang::prelude::Pubkey;
use reqwest::Url;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    config::{Cluster, ClusterContext},
    constant::{QR_DIRECTORY, TRACKING_MARKER},
    state::{Board, Bounty, Snapshot, TokenMetadata, Vault},
    tracker::Repository,
    utils::format_token_amount,
};

const DISCLAIMER: &str = "_This comment is maintained automatically from on-chain state and is \
rewritten on every sync. Balances may lag behind the ledger, always verify the vault on the \
explorer before sending funds._";

/// Explorer page of `address`, e.g. `https://explorer.solana.com/address/{address}?cluster=devnet`.
pub fn explorer_link(cluster: &ClusterContext, entity: &str, address: &Pubkey) -> String {
    let address = address.to_string();
    let mut url = cluster.explorer_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    // Opaque explorer URLs are rejected while parsing the configuration.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend([entity, address.as_str()]);
    }
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("cluster", cluster.cluster.as_str());
        if cluster.cluster == Cluster::Custom {
            query.append_pair("customUrl", endpoint_as_given(&cluster.rpc_endpoint));
        }
    }
    url.to_string()
}

/// Undoes the root `/` that URL parsing adds to a bare host.
fn endpoint_as_given(endpoint: &Url) -> &str {
    let raw = endpoint.as_str();
    if endpoint.path() == "/" && endpoint.query().is_none() && endpoint.fragment().is_none() {
        raw.strip_suffix('/').unwrap_or(raw)
    } else {
        raw
    }
}

fn account_link(cluster: &ClusterContext, address: &Pubkey) -> String {
    format!("[`{address}`]({})", explorer_link(cluster, "address", address))
}

/// Image path of the deposit QR code committed next to the repository sources.
pub fn qr_image_url(repository: &Repository, issue: u32) -> String {
    format!(
        "{}/blob/{}/{QR_DIRECTORY}/{issue}.jpg?raw=true",
        repository.html_url.trim_end_matches('/'),
        repository.default_branch,
    )
}

fn display_amount(amount: u64, token: &TokenMetadata) -> String {
    let formatted = format_token_amount(amount, token.decimals());
    match token.symbol() {
        Some(symbol) => format!("{formatted} {symbol}"),
        None => format!("{formatted} (Unknown Token)"),
    }
}

fn display_timestamp(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|date| date.format(&Rfc3339).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

fn display_status(bounty: &Bounty) -> String {
    match (bounty.is_closed, bounty.closed_at) {
        (false, _) => "Open".to_string(),
        (true, Some(closed_at)) => format!("Closed ({})", display_timestamp(closed_at)),
        (true, None) => "Closed".to_string(),
    }
}

fn intro_section(bounty: &Snapshot<Bounty>, cluster: &ClusterContext) -> String {
    format!(
        "{TRACKING_MARKER}\n\
         # Bounty\n\
         \n\
         This issue has a bounty managed by Drill. [View the bounty account]({}).",
        explorer_link(cluster, "address", &bounty.address),
    )
}

fn board_section(board: &Snapshot<Board>, cluster: &ClusterContext) -> String {
    format!(
        "## Board\n\
         \n\
         | | |\n\
         | --- | --- |\n\
         | Board id | `{}` |\n\
         | Authority | {} |\n\
         | Accepted mint | {} |\n\
         | Lock time | {} seconds |",
        board.board_id,
        account_link(cluster, &board.authority),
        account_link(cluster, &board.accepted_mint),
        board.lock_time,
    )
}

fn bounty_section(
    bounty: &Snapshot<Bounty>,
    vault: &Vault,
    token: &TokenMetadata,
    cluster: &ClusterContext,
) -> String {
    let hunter = match bounty.bounty_hunter.as_deref() {
        Some(login) if !login.is_empty() => format!("@{login}"),
        _ => "Unassigned".to_string(),
    };
    format!(
        "## Bounty\n\
         \n\
         | | |\n\
         | --- | --- |\n\
         | Bounty id | `{}` |\n\
         | Amount | **{}** |\n\
         | Vault | {} |\n\
         | Status | {} |\n\
         | Bounty hunter | {} |",
        bounty.bounty_id,
        display_amount(vault.amount, token),
        account_link(cluster, &vault.address),
        display_status(bounty),
        hunter,
    )
}

fn payment_section(repository: &Repository, issue: u32) -> String {
    format!(
        "## Fund this bounty\n\
         \n\
         Scan the code below with a Solana Pay compatible wallet to deposit into the vault.\n\
         \n\
         ![Deposit QR code]({})",
        qr_image_url(repository, issue),
    )
}

/// Full tracking comment body for the bounty of issue `issue`.
pub fn render_report(
    issue: u32,
    board: &Snapshot<Board>,
    bounty: &Snapshot<Bounty>,
    vault: &Vault,
    token: &TokenMetadata,
    repository: &Repository,
    cluster: &ClusterContext,
) -> String {
    [
        intro_section(bounty, cluster),
        board_section(board, cluster),
        bounty_section(bounty, vault, token, cluster),
        payment_section(repository, issue),
        DISCLAIMER.to_string(),
    ]
    .join("\n\n")
}
