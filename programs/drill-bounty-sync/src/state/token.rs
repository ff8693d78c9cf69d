/// Descriptive data of a mint. Decimals come from the mint account, the
/// symbol from metadata. Either may be missing; the report then falls back
/// to raw units or marks the token as unknown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

impl TokenMetadata {
    /// Mint missing or undecodable.
    pub const UNKNOWN: Self = Self {
        symbol: None,
        decimals: None,
    };

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Decimals used to scale raw amounts. Without a mint nothing is scaled.
    pub fn decimals(&self) -> u8 {
        self.decimals.unwrap_or(0)
    }
}
