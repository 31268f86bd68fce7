pub mod abi;
pub mod artifacts;
pub mod bytecode;
pub mod metadata;

pub use artifacts::{
    get_contract_information, BuildInfo, BuildInfos, CompilerInput, ContractInformation,
    ExtendedContractInformation, LibraryLinks, LibraryToAddress,
};
pub use bytecode::Bytecode;
pub use metadata::InferredVersion;
