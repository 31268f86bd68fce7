mod address;
mod client;
mod config;

pub use address::{from_base32, is_address, parse_address, to_base32};
pub use client::RpcClient;
pub use config::{
    builtin_chains, get_current_chain_config, supported_networks, ChainConfig, ChainUrls,
};

use async_trait::async_trait;
use bytes::Bytes;
use ethers_core::types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("error occurred while sending request to the node: {0}")]
    NetworkRequest(#[from] reqwest::Error),
    #[error("node returned error for '{method}': {code} - {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("node returned invalid response for '{method}': {reason}")]
    InvalidResponse { method: String, reason: String },
    #[error(
        "the address {address:?} has no bytecode on the network '{network}'; \
         is the contract deployed to this network and the deployment transaction executed?"
    )]
    NoContractCode { address: Address, network: String },
    #[error(
        "trying to verify a contract in a network with chain id {0}, \
         but the plugin doesn't recognize it as a supported chain; \
         add it to `confluxscan.custom_chains` in the configuration"
    )]
    ChainConfigNotFound(u64),
    #[error("the selected network is '{0}', which is not supported for contract verification")]
    NetworkNotSupported(String),
}

/// Identifiers of the chain a node is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeStatus {
    pub chain_id: u64,
    pub network_id: u64,
}

/// Read access to the chain, shared by every step that needs the node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_status(&self) -> Result<NodeStatus, Error>;

    /// Returns the deployed bytecode at `address`; empty if there is no contract.
    ///
    /// `network_id` is the one reported by [`ChainClient::get_status`].
    async fn get_code(&self, address: &Address, network_id: u64) -> Result<Bytes, Error>;
}
