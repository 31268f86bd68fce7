//! Hardhat build information: compiler inputs and outputs of the local project.

use super::bytecode::{Bytecode, BytecodeExtractedData};
use crate::chain::parse_address;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// e.g. `"contracts/Lib.sol"`
pub type SourceName = String;
/// e.g. `"Lib"`
pub type ContractName = String;

/// Libraries supplied by the user, keyed either by bare name or by fully qualified name.
pub type LibraryToAddress = BTreeMap<String, String>;
/// Linked library addresses grouped by source, as `settings.libraries` of the compiler input.
pub type LibraryLinks = BTreeMap<SourceName, BTreeMap<ContractName, String>>;
pub type LinkReferences = BTreeMap<SourceName, BTreeMap<ContractName, Vec<Offset>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConflict {
    pub library: String,
    pub detected_address: String,
    pub input_address: String,
}

impl std::fmt::Display for LibraryConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: given {}, detected {}",
            self.library, self.input_address, self.detected_address
        )
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{path}' is not a valid build info file: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("the contract {0} is not present in your project")]
    ContractNotFound(String),
    #[error(
        "the contract {contract} you want to verify was compiled with \
         solidity {build_info_version}, but the bytecode deployed on the network '{network}' \
         {deployed_version}"
    )]
    BuildInfoCompilerVersionMismatch {
        contract: String,
        /// e.g. `"was compiled with 0.8.19"` or `"is in the range 0.4.7 - 0.5.8"`
        deployed_version: String,
        build_info_version: String,
        network: String,
    },
    #[error(
        "the address provided as argument contains a contract, \
         but its bytecode doesn't match the contract {contract} on the network '{network}'"
    )]
    DeployedBytecodeMismatch { contract: String, network: String },
    #[error(
        "the address provided as argument contains a contract, \
         but its bytecode doesn't match any of your local contracts on the network '{network}'"
    )]
    DeployedBytecodeNoMatch { network: String },
    #[error(
        "more than one contract was found to match the deployed bytecode \
         on the network '{network}'; use the contract flag with one of: {}",
        .contracts.join(", ")
    )]
    DeployedBytecodeMultipleMatches {
        contracts: Vec<String>,
        network: String,
    },
    #[error(
        "you gave an invalid address '{address}' for the library {library} \
         of the contract {contract}"
    )]
    InvalidLibraryAddress {
        contract: String,
        library: String,
        address: String,
    },
    #[error(
        "you gave a link for the library {library} of the contract {contract}, \
         which it doesn't use; the contract uses: {}",
        .all_libraries.join(", ")
    )]
    UnnecessaryLibrary {
        contract: String,
        library: String,
        all_libraries: Vec<String>,
    },
    #[error(
        "the library name {library} is ambiguous for the contract {contract}; \
         it may resolve to one of: {}",
        .matching.join(", ")
    )]
    AmbiguousLibraryName {
        contract: String,
        library: String,
        matching: Vec<String>,
    },
    #[error("the library {library} is linked more than once; it resolves to {fqn}")]
    DuplicatedLibrary { library: String, fqn: String },
    #[error(
        "the following library addresses don't match the ones detected \
         in the deployed bytecode: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    LibraryAddressesMismatch(Vec<LibraryConflict>),
    #[error(
        "the contract {contract} has one or more library addresses that cannot be detected \
         from deployed bytecode; missing: {}",
        .missing.join(", ")
    )]
    MissingLibraries {
        contract: String,
        missing: Vec<String>,
        undetectable: Vec<String>,
    },
}

/// Position of a placeholder in a compiled bytecode object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub start: usize,
    pub length: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledBytecode {
    /// Hexadecimal format with placeholders for links.
    pub object: String,
    #[serde(default)]
    pub link_references: LinkReferences,
    #[serde(default)]
    pub immutable_references: BTreeMap<String, Vec<Offset>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evm {
    #[serde(default)]
    pub bytecode: CompiledBytecode,
    #[serde(default)]
    pub deployed_bytecode: CompiledBytecode,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOutput {
    #[serde(default)]
    pub abi: Value,
    #[serde(default)]
    pub evm: Evm,
}

/// Standard json input of solc.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerInput {
    pub language: String,
    pub sources: BTreeMap<SourceName, Value>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl CompilerInput {
    /// Ensures the linking information is present in the input.
    pub fn with_libraries(mut self, libraries: &LibraryLinks) -> Self {
        let libraries = serde_json::to_value(libraries).unwrap_or_default();
        self.settings.insert("libraries".to_string(), libraries);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SourceOutput {
    #[serde(default)]
    pub ast: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CompilerOutput {
    #[serde(default)]
    pub contracts: BTreeMap<SourceName, BTreeMap<ContractName, ContractOutput>>,
    #[serde(default)]
    pub sources: BTreeMap<SourceName, SourceOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(default)]
    pub id: String,
    pub solc_version: String,
    pub solc_long_version: String,
    pub input: CompilerInput,
    pub output: CompilerOutput,
}

impl BuildInfo {
    fn compiled_with_any_of(&self, versions: &[Version]) -> bool {
        Version::parse(&self.solc_version)
            .map(|version| versions.contains(&version))
            .unwrap_or(false)
    }

    /// Compiler input containing only `source_name` and the sources it imports.
    pub fn minimal_input(&self, source_name: &str) -> CompilerInput {
        let mut required = BTreeSet::new();
        let mut pending = vec![source_name.to_string()];
        while let Some(source) = pending.pop() {
            if !required.insert(source.clone()) {
                continue;
            }
            if let Some(output) = self.output.sources.get(&source) {
                pending.extend(imported_sources(&output.ast));
            }
        }

        CompilerInput {
            language: self.input.language.clone(),
            sources: self
                .input
                .sources
                .iter()
                .filter(|(name, _)| required.contains(*name))
                .map(|(name, source)| (name.clone(), source.clone()))
                .collect(),
            settings: self.input.settings.clone(),
        }
    }
}

fn imported_sources(ast: &Value) -> Vec<String> {
    ast.get("nodes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|node| node.get("nodeType").and_then(Value::as_str) == Some("ImportDirective"))
        .filter_map(|node| node.get("absolutePath").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

pub fn is_fully_qualified_name(name: &str) -> bool {
    parse_fully_qualified_name(name).is_some()
}

/// Splits `"contracts/Sample.sol:MyContract"` into its source and contract names.
pub fn parse_fully_qualified_name(name: &str) -> Option<(&str, &str)> {
    let (source_name, contract_name) = name.rsplit_once(':')?;
    (!source_name.is_empty() && !contract_name.is_empty()).then_some((source_name, contract_name))
}

/// Build infos of the project, read fresh for every verification run.
#[derive(Clone, Debug, Default)]
pub struct BuildInfos(Vec<BuildInfo>);

impl BuildInfos {
    pub fn new(build_infos: Vec<BuildInfo>) -> Self {
        Self(build_infos)
    }

    /// Reads every `*.json` file in `dir`. A missing directory means nothing was compiled yet.
    pub async fn load(dir: &Path) -> Result<Self, Error> {
        let io_error = |source| Error::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("build info directory {dir:?} does not exist");
                return Ok(Self::default());
            }
            Err(err) => return Err(io_error(err)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut build_infos = Vec::with_capacity(paths.len());
        for path in paths {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;
            let build_info = serde_json::from_str(&content)
                .map_err(|source| Error::Json { path, source })?;
            build_infos.push(build_info);
        }
        log::debug!("loaded {} build infos from {dir:?}", build_infos.len());
        Ok(Self(build_infos))
    }

    pub fn find(&self, source_name: &str, contract_name: &str) -> Option<&BuildInfo> {
        self.0.iter().find(|build_info| {
            build_info
                .output
                .contracts
                .get(source_name)
                .map_or(false, |contracts| contracts.contains_key(contract_name))
        })
    }
}

/// A local contract whose compiled bytecode matches the deployed one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractInformation {
    pub source_name: SourceName,
    pub contract_name: ContractName,
    pub contract_output: ContractOutput,
    pub solc_version: String,
    pub solc_long_version: String,
    pub compiler_input: CompilerInput,
    pub minimal_input: CompilerInput,
    pub extracted: BytecodeExtractedData,
}

impl ContractInformation {
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// [`ContractInformation`] with resolved library links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedContractInformation {
    pub contract: ContractInformation,
    pub libraries: LibraryLinks,
    /// Libraries used only by the constructor, hence absent from the deployed bytecode.
    pub undetectable_libraries: Vec<String>,
}

fn extract_matching_contract_information(
    source_name: &str,
    contract_name: &str,
    build_info: &BuildInfo,
    deployed_bytecode: &Bytecode,
) -> Option<ContractInformation> {
    let contract_output = build_info
        .output
        .contracts
        .get(source_name)?
        .get(contract_name)?;
    let extracted = deployed_bytecode.compare(&contract_output.evm.deployed_bytecode)?;

    Some(ContractInformation {
        source_name: source_name.to_string(),
        contract_name: contract_name.to_string(),
        contract_output: contract_output.clone(),
        solc_version: build_info.solc_version.clone(),
        solc_long_version: build_info.solc_long_version.clone(),
        compiler_input: build_info.input.clone(),
        minimal_input: build_info.minimal_input(source_name),
        extracted,
    })
}

/// Finds the local contract matching the deployed bytecode and resolves its libraries.
pub fn get_contract_information(
    build_infos: &BuildInfos,
    contract_fqn: Option<&str>,
    deployed_bytecode: &Bytecode,
    matching_compiler_versions: &[Version],
    libraries: &LibraryToAddress,
    network_name: &str,
) -> Result<ExtendedContractInformation, Error> {
    let contract = match contract_fqn {
        Some(fqn) => {
            let (source_name, contract_name) = parse_fully_qualified_name(fqn)
                .ok_or_else(|| Error::ContractNotFound(fqn.to_string()))?;
            let build_info = build_infos
                .find(source_name, contract_name)
                .ok_or_else(|| Error::ContractNotFound(fqn.to_string()))?;

            if !build_info.compiled_with_any_of(matching_compiler_versions)
                && !deployed_bytecode.is_ovm()
            {
                let inferred = deployed_bytecode.get_version();
                let deployed_version = if deployed_bytecode.has_version_range() {
                    format!("is in the range {inferred}")
                } else {
                    format!("was compiled with {inferred}")
                };
                return Err(Error::BuildInfoCompilerVersionMismatch {
                    contract: fqn.to_string(),
                    deployed_version,
                    build_info_version: build_info.solc_version.clone(),
                    network: network_name.to_string(),
                });
            }

            extract_matching_contract_information(
                source_name,
                contract_name,
                build_info,
                deployed_bytecode,
            )
            .ok_or_else(|| Error::DeployedBytecodeMismatch {
                contract: fqn.to_string(),
                network: network_name.to_string(),
            })?
        }
        None => extract_inferred_contract_information(
            build_infos,
            deployed_bytecode,
            matching_compiler_versions,
            network_name,
        )?,
    };

    let (libraries, undetectable_libraries) = get_library_information(&contract, libraries)?;
    Ok(ExtendedContractInformation {
        contract,
        libraries,
        undetectable_libraries,
    })
}

fn extract_inferred_contract_information(
    build_infos: &BuildInfos,
    deployed_bytecode: &Bytecode,
    matching_compiler_versions: &[Version],
    network_name: &str,
) -> Result<ContractInformation, Error> {
    let mut matches = Vec::new();
    for build_info in &build_infos.0 {
        if !deployed_bytecode.is_ovm()
            && !build_info.compiled_with_any_of(matching_compiler_versions)
        {
            continue;
        }
        for (source_name, contracts) in &build_info.output.contracts {
            for contract_name in contracts.keys() {
                if let Some(information) = extract_matching_contract_information(
                    source_name,
                    contract_name,
                    build_info,
                    deployed_bytecode,
                ) {
                    matches.push(information);
                }
            }
        }
    }

    match matches.len() {
        0 => Err(Error::DeployedBytecodeNoMatch {
            network: network_name.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::DeployedBytecodeMultipleMatches {
            contracts: matches
                .iter()
                .map(ContractInformation::fully_qualified_name)
                .collect(),
            network: network_name.to_string(),
        }),
    }
}

fn library_fq_names(link_references: &LinkReferences) -> Vec<String> {
    link_references
        .iter()
        .flat_map(|(source_name, libraries)| {
            libraries
                .keys()
                .map(move |library_name| format!("{source_name}:{library_name}"))
        })
        .collect()
}

/// Resolves the addresses of every library the contract is linked with.
/// Returns the merged library links and the names of the undetectable libraries.
pub fn get_library_information(
    contract: &ContractInformation,
    libraries: &LibraryToAddress,
) -> Result<(LibraryLinks, Vec<String>), Error> {
    let all_libraries = library_fq_names(&contract.contract_output.evm.bytecode.link_references);
    let detectable_libraries =
        library_fq_names(&contract.contract_output.evm.deployed_bytecode.link_references);
    let undetectable_libraries: Vec<String> = all_libraries
        .iter()
        .filter(|library| !detectable_libraries.contains(library))
        .cloned()
        .collect();

    let normalized_libraries =
        normalize_libraries(&all_libraries, libraries, &contract.fully_qualified_name())?;
    let merged_libraries =
        merge_libraries(normalized_libraries, &contract.extracted.library_links)?;

    let merged_names = library_fq_names_of_links(&merged_libraries);
    let missing: Vec<String> = all_libraries
        .iter()
        .filter(|library| !merged_names.contains(library))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingLibraries {
            contract: contract.fully_qualified_name(),
            missing,
            undetectable: undetectable_libraries,
        });
    }

    Ok((merged_libraries, undetectable_libraries))
}

fn library_fq_names_of_links(links: &LibraryLinks) -> Vec<String> {
    links
        .iter()
        .flat_map(|(source_name, libraries)| {
            libraries
                .keys()
                .map(move |library_name| format!("{source_name}:{library_name}"))
        })
        .collect()
}

fn normalize_libraries(
    all_libraries: &[String],
    libraries: &LibraryToAddress,
    contract: &str,
) -> Result<LibraryLinks, Error> {
    let mut seen = BTreeSet::new();
    let mut normalized = LibraryLinks::new();
    for (library, address) in libraries {
        let address = parse_address(address)
            .map(|address| format!("{address:#x}"))
            .ok_or_else(|| Error::InvalidLibraryAddress {
                contract: contract.to_string(),
                library: library.clone(),
                address: address.clone(),
            })?;

        let matching: Vec<&String> = all_libraries
            .iter()
            .filter(|fqn| {
                *fqn == library
                    || parse_fully_qualified_name(fqn).map(|(_, name)| name)
                        == Some(library.as_str())
            })
            .collect();
        let fqn = match matching.as_slice() {
            [] => {
                return Err(Error::UnnecessaryLibrary {
                    contract: contract.to_string(),
                    library: library.clone(),
                    all_libraries: all_libraries.to_vec(),
                })
            }
            [fqn] => (*fqn).clone(),
            _ => {
                return Err(Error::AmbiguousLibraryName {
                    contract: contract.to_string(),
                    library: library.clone(),
                    matching: matching.into_iter().cloned().collect(),
                })
            }
        };

        if !seen.insert(fqn.clone()) {
            return Err(Error::DuplicatedLibrary {
                library: library.clone(),
                fqn,
            });
        }
        if let Some((source_name, library_name)) = parse_fully_qualified_name(&fqn) {
            normalized
                .entry(source_name.to_string())
                .or_default()
                .insert(library_name.to_string(), address);
        }
    }
    Ok(normalized)
}

fn merge_libraries(
    mut normalized: LibraryLinks,
    detected: &LibraryLinks,
) -> Result<LibraryLinks, Error> {
    let mut conflicts = Vec::new();
    for (source_name, libraries) in detected {
        for (library_name, detected_address) in libraries {
            let entry = normalized.entry(source_name.clone()).or_default();
            match entry.get(library_name) {
                Some(input_address) if !input_address.eq_ignore_ascii_case(detected_address) => {
                    conflicts.push(LibraryConflict {
                        library: format!("{source_name}:{library_name}"),
                        detected_address: detected_address.clone(),
                        input_address: input_address.clone(),
                    });
                }
                _ => {
                    entry.insert(library_name.clone(), detected_address.clone());
                }
            }
        }
    }

    if !conflicts.is_empty() {
        return Err(Error::LibraryAddressesMismatch(conflicts));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const LIB_ADDRESS: &str = "0x8a81c1619f38a5bb29cfaf20db24b23f42a42dcb";
    const OTHER_ADDRESS: &str = "0x027f1fe8bbc2a7e9fe97868e82c6ec6939086c52";

    fn offsets() -> Vec<Offset> {
        vec![Offset {
            start: 1,
            length: 20,
        }]
    }

    fn contract(
        creation_links: &[(&str, &str)],
        deployed_links: &[(&str, &str)],
    ) -> ContractInformation {
        let links = |libraries: &[(&str, &str)]| {
            let mut references = LinkReferences::new();
            for (source, name) in libraries {
                references
                    .entry(source.to_string())
                    .or_default()
                    .insert(name.to_string(), offsets());
            }
            references
        };
        let mut detected = LibraryLinks::new();
        for (source, name) in deployed_links {
            detected
                .entry(source.to_string())
                .or_default()
                .insert(name.to_string(), LIB_ADDRESS.to_string());
        }

        ContractInformation {
            source_name: "contracts/Main.sol".to_string(),
            contract_name: "Main".to_string(),
            contract_output: ContractOutput {
                abi: json!([]),
                evm: Evm {
                    bytecode: CompiledBytecode {
                        link_references: links(creation_links),
                        ..Default::default()
                    },
                    deployed_bytecode: CompiledBytecode {
                        link_references: links(deployed_links),
                        ..Default::default()
                    },
                },
            },
            solc_version: "0.8.19".to_string(),
            solc_long_version: "0.8.19+commit.7dd6d404".to_string(),
            compiler_input: CompilerInput::default(),
            minimal_input: CompilerInput::default(),
            extracted: BytecodeExtractedData {
                library_links: detected,
                ..Default::default()
            },
        }
    }

    fn user_libraries(libraries: &[(&str, &str)]) -> LibraryToAddress {
        libraries
            .iter()
            .map(|(name, address)| (name.to_string(), address.to_string()))
            .collect()
    }

    #[test]
    fn fully_qualified_names() {
        assert_eq!(
            Some(("contracts/Sample.sol", "MyContract")),
            parse_fully_qualified_name("contracts/Sample.sol:MyContract")
        );
        assert!(!is_fully_qualified_name("MyContract"));
        assert!(!is_fully_qualified_name("contracts/Sample.sol:"));
        assert!(!is_fully_qualified_name(":MyContract"));
    }

    #[test]
    fn detectable_libraries_are_resolved_automatically() {
        let contract = contract(&[("contracts/Lib.sol", "Lib")], &[("contracts/Lib.sol", "Lib")]);
        let (libraries, undetectable) =
            get_library_information(&contract, &LibraryToAddress::new()).unwrap();
        assert_eq!(
            Some(&LIB_ADDRESS.to_string()),
            libraries.get("contracts/Lib.sol").and_then(|l| l.get("Lib"))
        );
        assert!(undetectable.is_empty());
    }

    #[test]
    fn undetectable_libraries_must_be_provided() {
        let contract = contract(&[("contracts/Lib.sol", "Lib")], &[]);
        let err = get_library_information(&contract, &LibraryToAddress::new())
            .expect_err("error expected");
        assert!(
            matches!(
                &err,
                Error::MissingLibraries { missing, .. }
                    if missing == &vec!["contracts/Lib.sol:Lib".to_string()]
            ),
            "expected: 'MissingLibraries', got: {err:?}"
        );

        let (libraries, undetectable) =
            get_library_information(&contract, &user_libraries(&[("Lib", OTHER_ADDRESS)]))
                .unwrap();
        assert_eq!(vec!["contracts/Lib.sol:Lib".to_string()], undetectable);
        assert_eq!(
            Some(&OTHER_ADDRESS.to_string()),
            libraries.get("contracts/Lib.sol").and_then(|l| l.get("Lib"))
        );
    }

    #[test]
    fn invalid_user_libraries_are_rejected() {
        let contract = contract(
            &[("contracts/A.sol", "Lib"), ("contracts/B.sol", "Lib")],
            &[],
        );

        let err = get_library_information(&contract, &user_libraries(&[("Lib", "0x12")]))
            .expect_err("error expected");
        assert!(matches!(err, Error::InvalidLibraryAddress { .. }), "got: {err:?}");

        let err = get_library_information(&contract, &user_libraries(&[("Other", LIB_ADDRESS)]))
            .expect_err("error expected");
        assert!(matches!(err, Error::UnnecessaryLibrary { .. }), "got: {err:?}");

        let err = get_library_information(&contract, &user_libraries(&[("Lib", LIB_ADDRESS)]))
            .expect_err("error expected");
        assert!(matches!(err, Error::AmbiguousLibraryName { .. }), "got: {err:?}");
    }

    #[test]
    fn base32_library_addresses_are_converted_to_hex() {
        let contract = contract(&[("contracts/Lib.sol", "Lib")], &[]);
        let libraries = user_libraries(&[(
            "Lib",
            "cfx:aarc9abycue0hhzgyrr53m6cxedgccrmmyybjgh4xg",
        )]);
        let (libraries, _) = get_library_information(&contract, &libraries).unwrap();
        assert_eq!(
            Some(&"0x1a2f80341409639ea6a35bbcab8299066109aa55".to_string()),
            libraries.get("contracts/Lib.sol").and_then(|l| l.get("Lib"))
        );
    }

    #[test]
    fn duplicated_library_is_rejected() {
        let contract = contract(&[("contracts/Lib.sol", "Lib")], &[]);
        let libraries = user_libraries(&[
            ("Lib", LIB_ADDRESS),
            ("contracts/Lib.sol:Lib", LIB_ADDRESS),
        ]);
        let err = get_library_information(&contract, &libraries).expect_err("error expected");
        assert!(matches!(err, Error::DuplicatedLibrary { .. }), "got: {err:?}");
    }

    #[test]
    fn conflicting_library_address_is_rejected() {
        let contract = contract(&[("contracts/Lib.sol", "Lib")], &[("contracts/Lib.sol", "Lib")]);
        let err = get_library_information(&contract, &user_libraries(&[("Lib", OTHER_ADDRESS)]))
            .expect_err("error expected");
        assert!(
            matches!(&err, Error::LibraryAddressesMismatch(conflicts) if conflicts.len() == 1),
            "got: {err:?}"
        );
    }

    #[test]
    fn minimal_input_follows_imports() {
        let import = |path: &str| json!({"nodeType": "ImportDirective", "absolutePath": path});
        let build_info: BuildInfo = serde_json::from_value(json!({
            "solcVersion": "0.8.19",
            "solcLongVersion": "0.8.19+commit.7dd6d404",
            "input": {
                "language": "Solidity",
                "sources": {
                    "contracts/Main.sol": {"content": "import './Base.sol';"},
                    "contracts/Base.sol": {"content": "import './Lib.sol';"},
                    "contracts/Lib.sol": {"content": "library Lib {}"},
                    "contracts/Unrelated.sol": {"content": "contract Unrelated {}"}
                },
                "settings": {"optimizer": {"enabled": false}}
            },
            "output": {
                "sources": {
                    "contracts/Main.sol": {"ast": {"nodes": [import("contracts/Base.sol")]}},
                    "contracts/Base.sol": {"ast": {"nodes": [
                        import("contracts/Lib.sol"),
                        import("contracts/Main.sol")
                    ]}},
                    "contracts/Lib.sol": {"ast": {"nodes": []}},
                    "contracts/Unrelated.sol": {"ast": {"nodes": []}}
                }
            }
        }))
        .unwrap();

        let minimal = build_info.minimal_input("contracts/Main.sol");
        assert_eq!(
            vec!["contracts/Base.sol", "contracts/Lib.sol", "contracts/Main.sol"],
            minimal.sources.keys().collect::<Vec<_>>()
        );
        assert_eq!(build_info.input.settings, minimal.settings);
    }

    #[test]
    fn libraries_are_set_in_compiler_input() {
        let libraries = LibraryLinks::from([(
            "contracts/Lib.sol".to_string(),
            BTreeMap::from([("Lib".to_string(), LIB_ADDRESS.to_string())]),
        )]);
        let input = CompilerInput::default().with_libraries(&libraries);
        assert_eq!(
            Some(&json!({"contracts/Lib.sol": {"Lib": LIB_ADDRESS}})),
            input.settings.get("libraries")
        );
    }
}
