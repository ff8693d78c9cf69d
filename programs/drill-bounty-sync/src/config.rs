use std::{fmt, str::FromStr, time::Duration};

use anchor_lang::prelude::Pubkey;
use clap::{Parser, ValueEnum};
use reqwest::Url;

use crate::{
    constant::{BOUNTY_ENABLED_LABEL, BOUNTY_UPDATED_LABEL, DEFAULT_API_URL, DEFAULT_EXPLORER_URL},
    retry::RetryPolicy,
};

/// Named Solana network, as understood by the explorer's `cluster` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Cluster {
    #[value(name = "mainnet-beta")]
    MainnetBeta,
    Testnet,
    Devnet,
    Custom,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster information the report needs to build explorer links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterContext {
    pub cluster: Cluster,
    pub rpc_endpoint: Url,
    pub explorer_url: Url,
}

/// `owner/repo` reference to a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoRef {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("expected `owner/repo`, got `{value}`")),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Tracker credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl FromStr for ApiToken {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err("token must not be empty".into());
        }
        Ok(Self(value.to_string()))
    }
}

fn parse_pubkey(value: &str) -> Result<Pubkey, String> {
    Pubkey::from_str(value.trim()).map_err(|err| format!("invalid program id `{value}`: {err}"))
}

/// URL that paths can be appended to.
fn parse_base_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|err| format!("invalid URL `{value}`: {err}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("`{value}` cannot be used as a base URL"));
    }
    Ok(url)
}

/// Every flag also reads the `INPUT_*` variable GitHub Actions exports for
/// the action input of the same name.
#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Keeps Drill bounty status comments in sync with on-chain bounty accounts"
)]
pub struct Config {
    /// Drill program id owning the board and bounty accounts
    #[arg(long, env = "INPUT_PROGRAM-ID", value_parser = parse_pubkey)]
    pub program_id: Pubkey,

    /// Repository to reconcile, as `owner/repo`
    #[arg(long, env = "INPUT_GITHUB-REPOSITORY")]
    pub github_repository: RepoRef,

    /// Solana JSON-RPC endpoint
    #[arg(long, env = "INPUT_RPC-ENDPOINT")]
    pub rpc_endpoint: Url,

    #[arg(long, env = "INPUT_CLUSTER", value_enum, default_value_t = Cluster::MainnetBeta)]
    pub cluster: Cluster,

    /// GitHub token used for every tracker call
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: ApiToken,

    #[arg(long, env = "INPUT_API-URL", default_value = DEFAULT_API_URL, value_parser = parse_base_url)]
    pub api_url: Url,

    #[arg(
        long,
        env = "INPUT_EXPLORER-URL",
        default_value = DEFAULT_EXPLORER_URL,
        value_parser = parse_base_url
    )]
    pub explorer_url: Url,

    /// Render and log reports without writing comments or labels
    #[arg(long, env = "INPUT_DRY-RUN")]
    pub dry_run: bool,

    /// Issues reconciled at the same time
    #[arg(
        long,
        env = "INPUT_MAX-CONCURRENCY",
        default_value_t = 4,
        value_parser = clap::value_parser!(u16).range(1..=32)
    )]
    pub max_concurrency: u16,

    /// Attempts per request before a transient failure is given up on
    #[arg(
        long,
        env = "INPUT_MAX-ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..=5)
    )]
    pub max_attempts: u32,

    #[arg(long, env = "INPUT_REQUEST-TIMEOUT-SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn cluster_context(&self) -> ClusterContext {
        ClusterContext {
            cluster: self.cluster,
            rpc_endpoint: self.rpc_endpoint.clone(),
            explorer_url: self.explorer_url.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_attempts)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            repository: self.github_repository.clone(),
            program_id: self.program_id,
            cluster: self.cluster_context(),
            enabled_label: BOUNTY_ENABLED_LABEL.to_string(),
            updated_label: BOUNTY_UPDATED_LABEL.to_string(),
            dry_run: self.dry_run,
            max_concurrency: usize::from(self.max_concurrency),
        }
    }
}

/// Everything the reconciliation driver needs besides its clients.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub repository: RepoRef,
    pub program_id: Pubkey,
    pub cluster: ClusterContext,
    pub enabled_label: String,
    pub updated_label: String,
    pub dry_run: bool,
    pub max_concurrency: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM_ID: &str = "US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx";

    #[test]
    fn parses_repository_reference() {
        let repo: RepoRef = "heavy-duty/drill".parse().unwrap();
        assert_eq!(repo.owner, "heavy-duty");
        assert_eq!(repo.name, "drill");
        assert_eq!(repo.to_string(), "heavy-duty/drill");

        assert!("drill".parse::<RepoRef>().is_err());
        assert!("/drill".parse::<RepoRef>().is_err());
        assert!("a/b/c".parse::<RepoRef>().is_err());
    }

    #[test]
    fn token_is_redacted() {
        let token = ApiToken::new("ghp_secret");
        assert_eq!(format!("{token:?}"), "ApiToken(***)");
        assert_eq!(token.expose(), "ghp_secret");
    }

    #[test]
    fn parses_flags_with_defaults() {
        let config = Config::try_parse_from([
            "drill-bounty-sync",
            "--program-id",
            PROGRAM_ID,
            "--github-repository",
            "heavy-duty/drill",
            "--rpc-endpoint",
            "http://localhost:8899",
            "--token",
            "ghp_secret",
        ])
        .unwrap();

        assert_eq!(config.program_id, Pubkey::new_from_array([7; 32]));
        assert_eq!(config.cluster, Cluster::MainnetBeta);
        assert_eq!(config.max_attempts, 3);
        assert!(!config.dry_run);
        assert_eq!(config.api_url.as_str(), "https://api.github.com/");

        let settings = config.settings();
        assert_eq!(settings.enabled_label, "drill:bounty:enabled");
        assert_eq!(settings.max_concurrency, 4);
    }

    #[test]
    fn reads_action_inputs_from_env() {
        // Only required inputs, other tests assert on the optional defaults.
        std::env::set_var("INPUT_PROGRAM-ID", PROGRAM_ID);
        std::env::set_var("INPUT_GITHUB-REPOSITORY", "heavy-duty/drill");
        std::env::set_var("INPUT_RPC-ENDPOINT", "http://localhost:8899");
        std::env::set_var("INPUT_TOKEN", "ghp_from_env");

        let config = Config::try_parse_from(["drill-bounty-sync"]).unwrap();
        assert_eq!(config.program_id, Pubkey::new_from_array([7; 32]));
        assert_eq!(config.github_repository.to_string(), "heavy-duty/drill");
        assert_eq!(config.token.expose(), "ghp_from_env");
    }

    #[test]
    fn rejects_out_of_range_attempts() {
        let result = Config::try_parse_from([
            "drill-bounty-sync",
            "--program-id",
            PROGRAM_ID,
            "--github-repository",
            "heavy-duty/drill",
            "--rpc-endpoint",
            "http://localhost:8899",
            "--token",
            "ghp_secret",
            "--max-attempts",
            "9",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_opaque_explorer_url() {
        assert!(parse_base_url("mailto:octocat@example.com").is_err());
        assert!(parse_base_url("https://explorer.solana.com").is_ok());
    }

    #[test]
    fn cluster_names_match_explorer_slugs() {
        assert_eq!(Cluster::from_str("mainnet-beta", false).unwrap(), Cluster::MainnetBeta);
        assert_eq!(Cluster::Custom.to_string(), "custom");
    }
}
