use anchor_lang::prelude::*;

use super::ProgramAccount;

/// Repository scoped bounty pool. `board_id` is the GitHub repository id.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Board {
    pub board_id: u32,
    pub authority: Pubkey,
    pub accepted_mint: Pubkey,
    /// Seconds a closed bounty stays locked before it can be paid out
    pub lock_time: i64,
    pub board_bump: u8,
    pub board_vault_bump: u8,
}

impl ProgramAccount for Board {
    const NAME: &'static str = "board";
    // sha256("account:Board")[..8]
    const DISCRIMINATOR: [u8; 8] = [79, 48, 160, 63, 153, 132, 240, 56];
}
