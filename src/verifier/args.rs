use super::Error;
use crate::{
    chain::parse_address,
    solidity::{artifacts::is_fully_qualified_name, LibraryToAddress},
};
use ethers_core::types::Address;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Raw verification request, as given on the command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyRequest {
    pub address: Option<String>,
    pub constructor_args_params: Vec<String>,
    /// JSON file with an array of constructor arguments.
    pub constructor_args_file: Option<PathBuf>,
    /// JSON file with an object mapping library names to addresses.
    pub libraries_file: Option<PathBuf>,
    pub contract: Option<String>,
    pub force: bool,
}

/// Validated arguments of a single verification run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationArgs {
    pub address: Address,
    pub constructor_args: Vec<Value>,
    pub libraries: LibraryToAddress,
    pub contract_fqn: Option<String>,
    pub force: bool,
}

impl VerificationArgs {
    /// 0x-prefixed lowercase hex representation of the contract address,
    /// the form the explorer expects.
    pub fn address_hex(&self) -> String {
        format!("{:#x}", self.address)
    }
}

pub async fn resolve_arguments(request: VerifyRequest) -> Result<VerificationArgs, Error> {
    let address = request.address.ok_or(Error::MissingAddress)?;
    let address = parse_address(&address).ok_or(Error::InvalidAddress(address))?;

    if let Some(contract) = &request.contract {
        if !is_fully_qualified_name(contract) {
            return Err(Error::InvalidContractName(contract.clone()));
        }
    }

    let constructor_args = resolve_constructor_arguments(
        request.constructor_args_params,
        request.constructor_args_file.as_deref(),
    )
    .await?;
    let libraries = match request.libraries_file {
        Some(path) => resolve_libraries(&path).await?,
        None => LibraryToAddress::new(),
    };

    Ok(VerificationArgs {
        address,
        constructor_args,
        libraries,
        contract_fqn: request.contract,
        force: request.force,
    })
}

async fn resolve_constructor_arguments(
    params: Vec<String>,
    file: Option<&Path>,
) -> Result<Vec<Value>, Error> {
    let path = match file {
        None => return Ok(params.into_iter().map(Value::String).collect()),
        Some(_) if !params.is_empty() => return Err(Error::ExclusiveConstructorArguments),
        Some(path) => path,
    };

    let invalid = |reason: String| Error::InvalidConstructorArgumentsFile {
        path: path.to_path_buf(),
        reason,
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| invalid(err.to_string()))?;
    match serde_json::from_str::<Value>(&content).map_err(|err| invalid(err.to_string()))? {
        Value::Array(arguments) => Ok(arguments),
        _ => Err(invalid("the file must contain an array of arguments".to_string())),
    }
}

async fn resolve_libraries(path: &Path) -> Result<LibraryToAddress, Error> {
    let invalid = |reason: String| Error::InvalidLibrariesFile {
        path: path.to_path_buf(),
        reason,
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| invalid(err.to_string()))?;
    serde_json::from_str(&content).map_err(|err| {
        invalid(format!(
            "the file must contain an object mapping library names to addresses: {err}"
        ))
    })
}
