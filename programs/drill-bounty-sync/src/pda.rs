//! Deterministic addresses of the Drill accounts.
//!
//! Every numeric id that ends up in a seed goes through [`id_seed`] so that
//! boards and bounties are always derived from the same 4-byte little-endian
//! encoding the program uses on-chain.

use anchor_lang::prelude::Pubkey;

use crate::{
    constant::{seeds, token_metadata_program},
    errors::DerivationError,
};

/// Seed encoding shared by every numeric id (`board_id`, `bounty_id`).
pub fn id_seed(id: u32) -> [u8; 4] {
    id.to_le_bytes()
}

/// Runs the canonical bump search, failing instead of panicking when no bump
/// produces an off-curve address.
pub fn derive(
    account: &'static str,
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), DerivationError> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or(DerivationError {
        account,
        program_id: *program_id,
    })
}

pub fn board_address(program_id: &Pubkey, board_id: u32) -> Result<(Pubkey, u8), DerivationError> {
    derive("board", &[seeds::BOARD, &id_seed(board_id)], program_id)
}

pub fn bounty_address(
    program_id: &Pubkey,
    board: &Pubkey,
    bounty_id: u32,
) -> Result<(Pubkey, u8), DerivationError> {
    derive(
        "bounty",
        &[seeds::BOUNTY, board.as_ref(), &id_seed(bounty_id)],
        program_id,
    )
}

pub fn bounty_vault_address(
    program_id: &Pubkey,
    bounty: &Pubkey,
) -> Result<(Pubkey, u8), DerivationError> {
    derive("bounty_vault", &[seeds::BOUNTY_VAULT, bounty.as_ref()], program_id)
}

/// Metaplex metadata account of `mint`.
pub fn metadata_address(mint: &Pubkey) -> Result<(Pubkey, u8), DerivationError> {
    derive(
        "metadata",
        &[
            seeds::METADATA,
            token_metadata_program::ID.as_ref(),
            mint.as_ref(),
        ],
        &token_metadata_program::ID,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use const_crypto::ed25519;

    fn program() -> Pubkey {
        Pubkey::new_from_array([7; 32])
    }

    #[test]
    fn id_seed_is_four_bytes_little_endian() {
        assert_eq!(id_seed(1), [0x01, 0x00, 0x00, 0x00]);
        assert_eq!(id_seed(256), [0x00, 0x01, 0x00, 0x00]);
        assert_eq!(id_seed(u32::MAX), [0xff; 4]);
    }

    #[test]
    fn board_address_is_stable() {
        let first = board_address(&program(), 42).unwrap();
        let second = board_address(&program(), 42).unwrap();
        assert_eq!(first, second);
        assert_ne!(first.0, board_address(&program(), 43).unwrap().0);
    }

    #[test]
    fn board_address_matches_independent_derivation() {
        let (address, bump) = board_address(&program(), 256).unwrap();
        let (expected, expected_bump) = ed25519::derive_program_address(
            &[b"board".as_ref(), [0u8, 1, 0, 0].as_ref()],
            &program().to_bytes(),
        );
        assert_eq!(address.to_bytes(), expected);
        assert_eq!(bump, expected_bump);
    }

    #[test]
    fn bounty_and_vault_chain_from_board() {
        let (board, _) = board_address(&program(), 1).unwrap();
        let (bounty, _) = bounty_address(&program(), &board, 17).unwrap();
        let (vault, _) = bounty_vault_address(&program(), &bounty).unwrap();

        let (expected_bounty, _) = ed25519::derive_program_address(
            &[
                b"bounty".as_ref(),
                board.as_ref(),
                17u32.to_le_bytes().as_ref(),
            ],
            &program().to_bytes(),
        );
        let (expected_vault, _) = ed25519::derive_program_address(
            &[b"bounty_vault".as_ref(), expected_bounty.as_ref()],
            &program().to_bytes(),
        );
        assert_eq!(bounty.to_bytes(), expected_bounty);
        assert_eq!(vault.to_bytes(), expected_vault);
    }
}
