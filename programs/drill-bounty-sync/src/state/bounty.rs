use anchor_lang::prelude::*;

use super::ProgramAccount;

/// Reward attached to one issue. `bounty_id` is the issue number.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Bounty {
    pub board_id: u32,
    pub bounty_id: u32,
    pub bounty_bump: u8,
    pub bounty_vault_bump: u8,
    pub bounty_hunter: Option<String>, // GitHub login of the resolver
    pub is_closed: bool,
    pub closed_at: Option<i64>, // Unix timestamp
}

impl ProgramAccount for Bounty {
    const NAME: &'static str = "bounty";
    // sha256("account:Bounty")[..8]
    const DISCRIMINATOR: [u8; 8] = [237, 16, 105, 198, 19, 69, 242, 234];
}
