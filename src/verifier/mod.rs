mod args;
mod orchestrator;

pub use args::{resolve_arguments, VerificationArgs, VerifyRequest};
pub use orchestrator::{SubmittedInput, VerificationOutcome, Verifier};

use crate::{
    chain, compiler, confluxscan,
    solidity::{abi, artifacts},
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("you didn't provide any address")]
    MissingAddress,
    #[error("{0} is an invalid address")]
    InvalidAddress(String),
    #[error(
        "a valid fully qualified name was expected, e.g. contracts/Sample.sol:MyContract, \
         got: {0}"
    )]
    InvalidContractName(String),
    #[error(
        "the parameters constructor-args and constructor-args-file are mutually exclusive; \
         provide the arguments either inline or in a file"
    )]
    ExclusiveConstructorArguments,
    #[error("invalid constructor arguments file {path:?}: {reason}")]
    InvalidConstructorArgumentsFile { path: PathBuf, reason: String },
    #[error("invalid libraries file {path:?}: {reason}")]
    InvalidLibrariesFile { path: PathBuf, reason: String },
    #[error(
        "the contract you want to verify was compiled with solidity {inferred}, \
         but your configured compiler versions are: {configured}; \
         the bytecode deployed on the network '{network}' can't be verified with them"
    )]
    CompilerVersionsMismatch {
        configured: String,
        inferred: String,
        network: String,
    },
    #[error(
        "the verification of {contract} at {address} failed: {message}{}",
        undetectable_libraries_hint(.undetectable_libraries)
    )]
    VerificationFailed {
        contract: String,
        address: String,
        message: String,
        undetectable_libraries: Vec<String>,
    },
    #[error("failed to get the verification status of {contract} at {address}: {source}")]
    VerificationStatus {
        contract: String,
        address: String,
        #[source]
        source: confluxscan::Error,
    },
    #[error("failed to serialize the compiler input: {0}")]
    InputSerialization(#[source] serde_json::Error),
    #[error(transparent)]
    Chain(#[from] chain::Error),
    #[error(transparent)]
    Confluxscan(#[from] confluxscan::Error),
    #[error(transparent)]
    Artifacts(#[from] artifacts::Error),
    #[error(transparent)]
    Abi(#[from] abi::Error),
    #[error(transparent)]
    Compiler(#[from] compiler::Error),
}

fn undetectable_libraries_hint(undetectable_libraries: &[String]) -> String {
    if undetectable_libraries.is_empty() {
        return String::new();
    }
    format!(
        "; this contract makes use of libraries whose addresses are undetectable, \
         the failure may be caused by a wrong address for one of: {}",
        undetectable_libraries.join(", ")
    )
}
