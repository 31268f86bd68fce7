mod client;
mod types;

pub use client::{ConfluxscanClient, PollingPolicy, Sleeper, TokioSleeper};
pub use types::{VerificationResponse, VerificationStatus};

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("a network request failed; check your internet connection: {0}")]
    NetworkRequest(#[from] reqwest::Error),
    #[error("the request to {url} returned {status_code}: {body}")]
    InvalidStatusCode {
        url: String,
        status_code: StatusCode,
        body: String,
    },
    #[error("the block explorer already has the source code of {contract} at {address}")]
    ContractAlreadyVerified { contract: String, address: String },
    #[error(
        "failed to send contract verification request: the explorer at {api_url} \
         does not have the bytecode of the address {address}; try again in a minute"
    )]
    BytecodeMissing { api_url: String, address: String },
    #[error("the explorer rejected the verification request of {contract} at {address}: {message}")]
    Explorer {
        contract: String,
        address: String,
        message: String,
    },
    #[error("the status request of the verification {guid} failed: {message}")]
    PollingResponseNotOk { guid: String, message: String },
    #[error(
        "the explorer returned an unexpected message while verifying {contract} at {address}: \
         {message}"
    )]
    UnexpectedMessage {
        contract: String,
        address: String,
        message: String,
    },
    #[error("the verification request {guid} is still pending after {attempts} status requests")]
    PollingAttemptsExhausted { guid: String, attempts: usize },
}
