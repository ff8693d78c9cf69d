use anchor_lang::prelude::*;

/// Escrow token account of a bounty, reduced to what the report shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vault {
    pub address: Pubkey,
    pub mint: Pubkey,
    /// Raw amount in the mint's smallest unit
    pub amount: u64,
}
