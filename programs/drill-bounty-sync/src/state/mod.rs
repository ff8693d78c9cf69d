use std::ops::Deref;

use anchor_lang::prelude::*;

use crate::constant::ANCHOR_DISCRIMINATOR;

pub mod board;
pub mod bounty;
pub mod token;
pub mod vault;

pub use board::*;
pub use bounty::*;
pub use token::*;
pub use vault::*;

/// Account layout written by the Drill program: an 8-byte Anchor
/// discriminator followed by the borsh encoded struct.
pub trait ProgramAccount: AnchorDeserialize + AnchorSerialize {
    const NAME: &'static str;
    const DISCRIMINATOR: [u8; ANCHOR_DISCRIMINATOR];

    fn decode(data: &[u8]) -> std::result::Result<Self, String> {
        if data.len() < ANCHOR_DISCRIMINATOR {
            return Err(format!("account data is only {} bytes", data.len()));
        }
        let (discriminator, mut body) = data.split_at(ANCHOR_DISCRIMINATOR);
        if discriminator != Self::DISCRIMINATOR {
            return Err(format!("discriminator mismatch for {}", Self::NAME));
        }
        // Accounts are allocated with spare room, so trailing bytes are fine.
        Self::deserialize(&mut body).map_err(|err| err.to_string())
    }

    fn encode(&self) -> Vec<u8> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        // Writing into a Vec cannot fail.
        let _ = self.serialize(&mut data);
        data
    }
}

/// A decoded account together with the address it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub address: Pubkey,
    pub account: T,
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.account
    }
}
