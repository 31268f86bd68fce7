use crate::verifier::VerifyRequest;
use clap::Parser;
use std::path::PathBuf;

/// Verifies contracts deployed on Conflux core space on confluxscan.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file; `CIVE_VERIFY__CONFIG` is used if not given.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// JSON file containing an array with the constructor arguments.
    #[clap(long, value_name = "FILE")]
    pub constructor_args: Option<PathBuf>,

    /// JSON file containing an object that maps library names to their addresses.
    #[clap(long, value_name = "FILE")]
    pub libraries: Option<PathBuf>,

    /// Fully qualified name of the contract to verify, e.g. contracts/Example.sol:ExampleContract.
    #[clap(long, value_name = "FQN")]
    pub contract: Option<String>,

    /// Verify the contract even if the explorer reports it as verified.
    #[clap(long)]
    pub force: bool,

    /// Print the networks supported for verification and exit.
    #[clap(long)]
    pub list_networks: bool,

    /// Address of the contract to verify.
    pub address: Option<String>,

    /// Constructor arguments of the contract.
    pub constructor_args_params: Vec<String>,
}

impl Args {
    pub fn verify_request(&self) -> VerifyRequest {
        VerifyRequest {
            address: self.address.clone(),
            constructor_args_params: self.constructor_args_params.clone(),
            constructor_args_file: self.constructor_args.clone(),
            libraries_file: self.libraries.clone(),
            contract: self.contract.clone(),
            force: self.force,
        }
    }
}
