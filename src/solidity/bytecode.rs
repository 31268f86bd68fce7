use super::{
    artifacts::{CompiledBytecode, LibraryLinks, Offset},
    metadata::{get_metadata_section_length, infer_compiler_version, InferredVersion},
};
use crate::chain::{self, ChainClient};
use bytes::Bytes;
use ethers_core::types::Address;
use semver::Version;
use std::collections::BTreeMap;

/// Concatenation of the opcodes the OVM compiler inserts around every external call.
/// There is no way to infer a solc version from such bytecode.
const OVM_SIGNATURE: &str =
    "336000905af158601d01573d60011458600c01573d6000803e3d621234565260ea61109c52";

/// `PUSH20 <address>` of the call protection check at the start of deployed libraries.
const CALL_PROTECTION: Offset = Offset {
    start: 1,
    length: 20,
};

/// Deployed bytecode together with what could be inferred from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bytecode {
    bytecode: Bytes,
    version: InferredVersion,
    executable_section_length: usize,
    is_ovm: bool,
}

/// Values extracted from the deployed bytecode during a successful comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BytecodeExtractedData {
    pub library_links: LibraryLinks,
    pub immutable_values: BTreeMap<String, Vec<String>>,
    pub normalized_bytecode: String,
}

impl Bytecode {
    pub fn new(bytecode: Bytes) -> Self {
        let version = infer_compiler_version(&bytecode);
        let executable_section_length = match version {
            InferredVersion::MissingMetadata => bytecode.len(),
            _ => get_metadata_section_length(&bytecode)
                .map(|metadata_length| bytecode.len().saturating_sub(metadata_length))
                .unwrap_or(bytecode.len()),
        };
        let is_ovm = contains_ovm_signature(&bytecode);

        Self {
            bytecode,
            version,
            executable_section_length,
            is_ovm,
        }
    }

    /// Reads the code deployed at `address` on the network `network_id`.
    pub async fn get_deployed_contract_bytecode(
        address: &Address,
        network_id: u64,
        chain: &dyn ChainClient,
        network_name: &str,
    ) -> Result<Self, chain::Error> {
        let code = chain.get_code(address, network_id).await?;
        if code.is_empty() {
            return Err(chain::Error::NoContractCode {
                address: *address,
                network: network_name.to_string(),
            });
        }
        Ok(Self::new(code))
    }

    pub fn is_ovm(&self) -> bool {
        self.is_ovm
    }

    pub fn get_version(&self) -> &InferredVersion {
        &self.version
    }

    pub fn has_version_range(&self) -> bool {
        self.version.is_range()
    }

    /// Filters `candidates` down to the versions that could have produced the bytecode.
    ///
    /// The result is meaningless for OVM bytecode, which has no version signal.
    pub fn get_matching_versions(&self, candidates: &[Version]) -> Vec<Version> {
        candidates
            .iter()
            .filter(|version| self.version.matches(version))
            .cloned()
            .collect()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytecode
    }

    /// Bytecode without the trailing metadata section.
    pub fn executable_section(&self) -> &[u8] {
        &self.bytecode[..self.executable_section_length]
    }

    /// Compares the executable section with the compiled `deployedBytecode` of a contract.
    ///
    /// Metadata is ignored; library addresses, immutable values and the address
    /// a library embeds for its call protection are zeroed out in both bytecodes
    /// before the comparison.
    pub fn compare(&self, compiled: &CompiledBytecode) -> Option<BytecodeExtractedData> {
        let deployed = hex::encode(self.executable_section());
        let reference = compiled
            .object
            .trim_start_matches("0x")
            .to_ascii_lowercase();
        let reference_length = executable_section_hex_length(&reference);

        // OVM bytecode has some special metadata
        if deployed.len() != reference_length && !self.is_ovm {
            return None;
        }

        let deployed = normalize_bytecode(&deployed, compiled);
        let reference = normalize_bytecode(&reference, compiled);

        let prefix = |s: &str| s[..reference_length.min(s.len())].to_string();
        if prefix(&deployed.normalized_bytecode) == prefix(&reference.normalized_bytecode) {
            Some(deployed)
        } else {
            None
        }
    }
}

fn contains_ovm_signature(bytecode: &[u8]) -> bool {
    let signature = hex::decode(OVM_SIGNATURE).expect("valid hex");
    bytecode
        .windows(signature.len())
        .any(|window| window == signature.as_slice())
}

/// Length in hex characters of the compiled bytecode without its metadata section.
/// The compiled object may contain link placeholders, but never in its tail.
fn executable_section_hex_length(bytecode: &str) -> usize {
    if bytecode.len() < 4 {
        return bytecode.len();
    }
    let metadata_length = u16::from_str_radix(&bytecode[bytecode.len() - 4..], 16)
        .map(|length| (length as usize + 2) * 2);
    match metadata_length {
        Ok(metadata_length) if metadata_length <= bytecode.len() => {
            bytecode.len() - metadata_length
        }
        _ => bytecode.len(),
    }
}

/// Zeroes out link references and immutable references, collecting the replaced values.
fn normalize_bytecode(bytecode: &str, symbols: &CompiledBytecode) -> BytecodeExtractedData {
    let mut normalized = bytecode.as_bytes().to_vec();
    let mut extract_and_zero = |start: usize, length: usize| -> Option<String> {
        let (from, to) = (start * 2, (start + length) * 2);
        if to > normalized.len() {
            return None;
        }
        let value = String::from_utf8_lossy(&normalized[from..to]).into_owned();
        normalized[from..to].fill(b'0');
        Some(value)
    };

    let reference = symbols.object.trim_start_matches("0x");
    let protection_end = (CALL_PROTECTION.start + CALL_PROTECTION.length) * 2;
    let is_library = reference.len() >= protection_end
        && reference.starts_with("73")
        && reference[2..protection_end].bytes().all(|c| c == b'0');
    if is_library {
        extract_and_zero(CALL_PROTECTION.start, CALL_PROTECTION.length);
    }

    let mut library_links = LibraryLinks::new();
    for (source_name, libraries) in &symbols.link_references {
        for (library_name, offsets) in libraries {
            for offset in offsets {
                if let Some(address) = extract_and_zero(offset.start, offset.length) {
                    library_links
                        .entry(source_name.clone())
                        .or_default()
                        .insert(library_name.clone(), format!("0x{address}"));
                }
            }
        }
    }

    let mut immutable_values = BTreeMap::<String, Vec<String>>::new();
    for (id, offsets) in &symbols.immutable_references {
        for offset in offsets {
            if let Some(value) = extract_and_zero(offset.start, offset.length) {
                immutable_values.entry(id.clone()).or_default().push(value);
            }
        }
    }

    BytecodeExtractedData {
        library_links,
        immutable_values,
        normalized_bytecode: String::from_utf8_lossy(&normalized).into_owned(),
    }
}
