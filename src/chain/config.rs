use super::Error;
use crate::consts::HARDHAT_NETWORK_NAME;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub network: String,
    pub chain_id: u64,
    pub urls: ChainUrls,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainUrls {
    pub api_url: Url,
    pub browser_url: Url,
}

fn chain(network: &str, chain_id: u64, api_url: &str, browser_url: &str) -> ChainConfig {
    ChainConfig {
        network: network.to_string(),
        chain_id,
        urls: ChainUrls {
            api_url: Url::parse(api_url).expect("valid url"),
            browser_url: Url::parse(browser_url).expect("valid url"),
        },
    }
}

pub fn builtin_chains() -> Vec<ChainConfig> {
    vec![
        chain(
            "mainnet",
            1029,
            "https://api.confluxscan.io",
            "https://confluxscan.io",
        ),
        chain(
            "testnet",
            1,
            "https://api-testnet.confluxscan.io",
            "https://testnet.confluxscan.io",
        ),
    ]
}

/// Custom chains in reverse order followed by the built-in ones:
/// custom chains take precedence, and the last custom entry wins.
fn chains_by_precedence(custom_chains: &[ChainConfig]) -> Vec<ChainConfig> {
    custom_chains
        .iter()
        .rev()
        .cloned()
        .chain(builtin_chains())
        .collect()
}

/// Looks up the explorer of the chain with id `chain_id`.
pub fn get_current_chain_config(
    network_name: &str,
    chain_id: u64,
    custom_chains: &[ChainConfig],
) -> Result<ChainConfig, Error> {
    chains_by_precedence(custom_chains)
        .into_iter()
        .find(|chain| chain.chain_id == chain_id)
        .ok_or_else(|| {
            if network_name == HARDHAT_NETWORK_NAME {
                Error::NetworkNotSupported(network_name.to_string())
            } else {
                Error::ChainConfigNotFound(chain_id)
            }
        })
}

/// Human readable table of every network verification is available for.
pub fn supported_networks(custom_chains: &[ChainConfig]) -> String {
    let mut table = String::new();
    let mut row = |network: &str, chain_id: &str, browser_url: &str| {
        writeln!(table, "  {network:<20} {chain_id:<10} {browser_url}").expect("write to string");
    };
    row("network", "chain id", "browser url");
    for chain in chains_by_precedence(custom_chains) {
        row(
            &chain.network,
            &chain.chain_id.to_string(),
            chain.urls.browser_url.as_str(),
        );
    }
    table
}
