pub const ANCHOR_DISCRIMINATOR: usize = 8;

/// Body marker identifying the tracking comment on an issue.
pub const TRACKING_MARKER: &str = "<!-- drill-bounty-program -->";

pub const BOUNTY_ENABLED_LABEL: &str = "drill:bounty:enabled";
pub const BOUNTY_UPDATED_LABEL: &str = "bounty-updated";

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.solana.com";
pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const USER_AGENT: &str = concat!("drill-bounty-sync/", env!("CARGO_PKG_VERSION"));

pub const PAGE_SIZE: usize = 100;

/// Directory holding the rendered deposit QR images, one `{issue}.jpg` each.
pub const QR_DIRECTORY: &str = ".drill";

pub const MIN_FRACTION_DIGITS: usize = 2;
pub const MAX_FRACTION_DIGITS: u32 = 3;

pub mod seeds {
    pub const BOARD: &[u8] = b"board";
    pub const BOUNTY: &[u8] = b"bounty";
    pub const BOUNTY_VAULT: &[u8] = b"bounty_vault";
    pub const METADATA: &[u8] = b"metadata";
}

pub mod token_metadata_program {
    use anchor_lang::{prelude::Pubkey, solana_program::pubkey};
    pub const ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
}
