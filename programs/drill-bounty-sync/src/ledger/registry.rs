//! Symbols of well-known mints that predate on-chain token metadata.

use anchor_lang::{prelude::Pubkey, solana_program::pubkey};

use crate::config::Cluster;

pub const NATIVE_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");
pub const USDC_MAINNET: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const USDT_MAINNET: Pubkey = pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB");
pub const USDC_DEVNET: Pubkey = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub mint: Pubkey,
    pub symbol: &'static str,
}

const MAINNET: &[RegistryEntry] = &[
    RegistryEntry { mint: NATIVE_MINT, symbol: "SOL" },
    RegistryEntry { mint: USDC_MAINNET, symbol: "USDC" },
    RegistryEntry { mint: USDT_MAINNET, symbol: "USDT" },
];

const DEVNET: &[RegistryEntry] = &[
    RegistryEntry { mint: NATIVE_MINT, symbol: "SOL" },
    RegistryEntry { mint: USDC_DEVNET, symbol: "USDC" },
];

const TESTNET: &[RegistryEntry] = &[RegistryEntry { mint: NATIVE_MINT, symbol: "SOL" }];

pub fn entries(cluster: Cluster) -> &'static [RegistryEntry] {
    match cluster {
        Cluster::MainnetBeta => MAINNET,
        Cluster::Devnet => DEVNET,
        Cluster::Testnet => TESTNET,
        // Nothing is known about a private validator.
        Cluster::Custom => &[],
    }
}

pub fn lookup(cluster: Cluster, mint: &Pubkey) -> Option<&'static RegistryEntry> {
    entries(cluster).iter().find(|entry| entry.mint == *mint)
}
