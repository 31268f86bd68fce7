use super::{to_base32, ChainClient, Error, NodeStatus};
use async_trait::async_trait;
use bytes::Bytes;
use ethers_core::types::{Address, Bytes as DisplayBytes, U64};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const LATEST_STATE_EPOCH: &str = "latest_state";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    chain_id: U64,
    network_id: U64,
}

/// JSON-RPC client of a Conflux core space node.
#[derive(Clone)]
pub struct RpcClient {
    url: Url,
    reqwest_client: reqwest::Client,
}

impl RpcClient {
    pub fn new(url: Url) -> Result<Self, Error> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url,
            reqwest_client,
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, Error> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        log::debug!("sending '{method}' to {}", self.url);
        let response: JsonRpcResponse<T> = self
            .reqwest_client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (response.result, response.error) {
            (_, Some(error)) => Err(Error::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(Error::InvalidResponse {
                method: method.to_string(),
                reason: "neither result nor error is present".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn get_status(&self) -> Result<NodeStatus, Error> {
        let status: StatusResponse = self.request("cfx_getStatus", json!([])).await?;
        Ok(NodeStatus {
            chain_id: status.chain_id.as_u64(),
            network_id: status.network_id.as_u64(),
        })
    }

    async fn get_code(&self, address: &Address, network_id: u64) -> Result<Bytes, Error> {
        let address = to_base32(address, network_id);
        let code: DisplayBytes = self
            .request("cfx_getCode", json!([address, LATEST_STATE_EPOCH]))
            .await?;
        Ok(code.0)
    }
}
