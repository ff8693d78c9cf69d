//! Typed reads of the Drill accounts.
//!
//! [`LedgerStateReader`] turns raw account bytes from an [`AccountSource`]
//! into [`Board`], [`Bounty`], [`Vault`] and [`TokenMetadata`] values. A
//! missing account is `Ok(None)`; an account that exists but does not decode,
//! or is owned by the wrong program, is an error.

use anchor_lang::{prelude::Pubkey, AccountDeserialize};
use anchor_spl::{
    metadata::MetadataAccount,
    token_interface::{Mint, TokenAccount},
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    config::Cluster,
    constant::token_metadata_program,
    errors::LedgerError,
    pda,
    state::{Board, Bounty, ProgramAccount, Snapshot, TokenMetadata, Vault},
};

pub mod registry;
pub mod rpc;

pub use rpc::RpcAccountSource;

/// Account as returned by the ledger, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Raw account access. Implementations handle transport retries themselves.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, LedgerError>;
}

pub struct LedgerStateReader<'a, S: ?Sized> {
    source: &'a S,
    program_id: Pubkey,
}

impl<'a, S: AccountSource + ?Sized> LedgerStateReader<'a, S> {
    pub fn new(source: &'a S, program_id: Pubkey) -> Self {
        Self { source, program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub async fn fetch_board(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Snapshot<Board>>, LedgerError> {
        self.program_account(address).await
    }

    pub async fn fetch_bounty(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Snapshot<Bounty>>, LedgerError> {
        self.program_account(address).await
    }

    pub async fn fetch_vault(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Vault>, LedgerError> {
        let Some(raw) = self.source.get_account(address).await? else {
            return Ok(None);
        };
        ensure_token_program("vault", address, &raw)?;

        let account = TokenAccount::try_deserialize(&mut raw.data.as_slice())
            .map_err(|err| LedgerError::decode("vault", *address, err))?;

        Ok(Some(Vault {
            address: *address,
            mint: account.mint,
            amount: account.amount,
        }))
    }

    /// Resolves symbol and decimals of `mint`. Never fails for a missing or
    /// malformed mint, only for transport errors. A mint that decodes keeps its
    /// decimals even when no symbol is found.
    pub async fn fetch_token_metadata(
        &self,
        mint: &Pubkey,
        cluster: Cluster,
    ) -> Result<TokenMetadata, LedgerError> {
        let Some(raw) = self.source.get_account(mint).await? else {
            debug!(%mint, "mint account not found");
            return Ok(TokenMetadata::UNKNOWN);
        };
        if let Err(err) = ensure_token_program("mint", mint, &raw) {
            warn!(%mint, error = %err, "ignoring mint");
            return Ok(TokenMetadata::UNKNOWN);
        }
        let decimals = match Mint::try_deserialize(&mut raw.data.as_slice()) {
            Ok(account) => account.decimals,
            Err(err) => {
                warn!(%mint, error = %err, "mint account does not decode");
                return Ok(TokenMetadata::UNKNOWN);
            }
        };

        let symbol = match self.metaplex_symbol(mint).await? {
            Some(symbol) => Some(symbol),
            None => registry::lookup(cluster, mint).map(|entry| entry.symbol.to_string()),
        };

        if symbol.is_none() {
            debug!(%mint, decimals, "no symbol for mint");
        }
        Ok(TokenMetadata {
            symbol,
            decimals: Some(decimals),
        })
    }

    async fn metaplex_symbol(
        &self,
        mint: &Pubkey,
    ) -> Result<Option<String>, LedgerError> {
        let (address, _) = pda::metadata_address(mint)?;
        let Some(raw) = self.source.get_account(&address).await? else {
            return Ok(None);
        };
        if raw.owner != token_metadata_program::ID {
            return Ok(None);
        }

        match MetadataAccount::try_deserialize(&mut raw.data.as_slice()) {
            Ok(metadata) => {
                // Metaplex pads strings with NUL bytes.
                let symbol = metadata.symbol.trim_matches(char::from(0)).trim();
                Ok((!symbol.is_empty()).then(|| symbol.to_string()))
            }
            Err(err) => {
                warn!(%mint, %address, error = %err, "metadata account does not decode");
                Ok(None)
            }
        }
    }

    async fn program_account<T: ProgramAccount>(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Snapshot<T>>, LedgerError> {
        let Some(raw) = self.source.get_account(address).await? else {
            return Ok(None);
        };
        if raw.owner != self.program_id {
            return Err(LedgerError::decode(
                T::NAME,
                *address,
                format!("owned by {} instead of {}", raw.owner, self.program_id),
            ));
        }

        let account = T::decode(&raw.data)
            .map_err(|reason| LedgerError::decode(T::NAME, *address, reason))?;
        Ok(Some(Snapshot {
            address: *address,
            account,
        }))
    }
}

fn ensure_token_program(
    account: &'static str,
    address: &Pubkey,
    raw: &RawAccount,
) -> Result<(), LedgerError> {
    if raw.owner == anchor_spl::token::ID || raw.owner == anchor_spl::token_2022::ID {
        Ok(())
    } else {
        Err(LedgerError::decode(
            account,
            *address,
            format!("owned by {} which is not a token program", raw.owner),
        ))
    }
}
