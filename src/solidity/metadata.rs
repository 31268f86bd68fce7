//! Decoding of the CBOR metadata trailer that solc appends to the deployed bytecode.
//!
//! Not all compiler releases produce the same trailer:
//! - solc v0.4.7 was the first compiler to embed metadata into the bytecode;
//! - solc v0.4.26, the last release of the v0.4 series, does not put its version there;
//! - solc v0.5.9 was the first compiler to embed its own version into the metadata.

use minicbor::{data::Type, Decoder};
use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use std::fmt;
use thiserror::Error;

/// Number of bytes used to encode the length of the metadata section.
pub const METADATA_LENGTH: usize = 2;
pub const SOLC_NOT_FOUND_IN_METADATA_VERSION_RANGE: &str = "0.4.7 - 0.5.8";
pub const MISSING_METADATA_VERSION_RANGE: &str = "<0.4.7";

/// Compiler version (or range of versions) inferred from the bytecode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InferredVersion {
    /// The metadata contains the exact compiler version.
    Exact(Version),
    /// The metadata was decoded, but does not contain the compiler version.
    SolcNotFoundInMetadata,
    /// The metadata could not be decoded, so the bytecode predates metadata.
    MissingMetadata,
}

impl InferredVersion {
    pub fn is_range(&self) -> bool {
        !matches!(self, InferredVersion::Exact(_))
    }

    pub fn requirement(&self) -> VersionReq {
        let comparator = |op, major, minor, patch| Comparator {
            op,
            major,
            minor: Some(minor),
            patch: Some(patch),
            pre: Prerelease::EMPTY,
        };
        let comparators = match self {
            InferredVersion::Exact(version) => vec![Comparator {
                op: Op::Exact,
                major: version.major,
                minor: Some(version.minor),
                patch: Some(version.patch),
                pre: version.pre.clone(),
            }],
            InferredVersion::SolcNotFoundInMetadata => vec![
                comparator(Op::GreaterEq, 0, 4, 7),
                comparator(Op::LessEq, 0, 5, 8),
            ],
            InferredVersion::MissingMetadata => vec![comparator(Op::Less, 0, 4, 7)],
        };
        VersionReq { comparators }
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.requirement().matches(version)
    }
}

impl fmt::Display for InferredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredVersion::Exact(version) => write!(f, "{version}"),
            InferredVersion::SolcNotFoundInMetadata => {
                f.write_str(SOLC_NOT_FOUND_IN_METADATA_VERSION_RANGE)
            }
            InferredVersion::MissingMetadata => f.write_str(MISSING_METADATA_VERSION_RANGE),
        }
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("bytecode is too short to contain metadata length: {0} bytes")]
    BytecodeTooShort(usize),
    #[error("metadata section length {declared} exceeds bytecode length {available}")]
    Truncated { declared: usize, available: usize },
    #[error("metadata is not a valid cbor document: {0}")]
    Cbor(#[from] minicbor::decode::Error),
    #[error("metadata has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
enum ParseError {
    #[error("indefinite length maps are not supported")]
    IndefiniteMap,
}

impl From<ParseError> for minicbor::decode::Error {
    fn from(error: ParseError) -> minicbor::decode::Error {
        minicbor::decode::Error::custom(error)
    }
}

/// Decoded metadata. Only the fields required for version inference are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataHash {
    /// Raw value of the `solc` key, if it is a byte string.
    pub solc: Option<Vec<u8>>,
}

impl MetadataHash {
    /// Decodes the first cbor item of `encoded`.
    /// Returns the metadata and the number of bytes the item occupied.
    pub fn from_cbor(encoded: &[u8]) -> Result<(Self, usize), minicbor::decode::Error> {
        let mut d = Decoder::new(encoded);
        let metadata = match d.datatype()? {
            Type::Map | Type::MapIndef => decode_map(&mut d)?,
            // Valid document, but nothing we could extract a version from
            _ => {
                d.skip()?;
                Self::default()
            }
        };
        Ok((metadata, d.position()))
    }
}

fn decode_map(d: &mut Decoder) -> Result<MetadataHash, minicbor::decode::Error> {
    let entries = d.map()?.ok_or(ParseError::IndefiniteMap)?;

    let mut metadata = MetadataHash::default();
    for _ in 0..entries {
        let key = match d.datatype()? {
            Type::String => Some(d.str()?),
            _ => {
                d.skip()?;
                None
            }
        };
        match (key, d.datatype()?) {
            (Some("solc"), Type::Bytes) => metadata.solc = Some(d.bytes()?.to_vec()),
            _ => d.skip()?,
        }
    }
    Ok(metadata)
}

/// Value of the trailing length field plus the size of the field itself.
/// Returns `None` if the bytecode cannot contain a length field at all.
pub fn get_metadata_section_length(bytecode: &[u8]) -> Option<usize> {
    if bytecode.len() < METADATA_LENGTH {
        return None;
    }
    let tail = &bytecode[bytecode.len() - METADATA_LENGTH..];
    let length = u16::from_be_bytes([tail[0], tail[1]]) as usize;
    Some(length + METADATA_LENGTH)
}

/// Decodes the metadata located at the end of `bytecode`.
pub fn decode_solc_metadata(bytecode: &[u8]) -> Result<MetadataHash, MetadataError> {
    let section_length = get_metadata_section_length(bytecode)
        .ok_or(MetadataError::BytecodeTooShort(bytecode.len()))?;
    if section_length > bytecode.len() {
        return Err(MetadataError::Truncated {
            declared: section_length,
            available: bytecode.len(),
        });
    }
    log::debug!("read metadata length {section_length}");

    let payload = &bytecode[bytecode.len() - section_length..bytecode.len() - METADATA_LENGTH];
    let last_bytes = &payload[payload.len().saturating_sub(100)..];
    log::debug!(
        "last {} bytes of metadata: {}",
        last_bytes.len(),
        hex::encode(last_bytes)
    );

    let (metadata, used) = MetadataHash::from_cbor(payload)?;
    if used != payload.len() {
        return Err(MetadataError::TrailingBytes(payload.len() - used));
    }
    log::debug!("metadata decoded: {metadata:?}");
    Ok(metadata)
}

/// Tries to infer the solidity compiler version from the bytecode metadata.
///
/// Never fails: bytecode without a decodable trailer is assumed
/// to be emitted by a compiler older than v0.4.7.
pub fn infer_compiler_version(bytecode: &[u8]) -> InferredVersion {
    let metadata = match decode_solc_metadata(bytecode) {
        Ok(metadata) => metadata,
        Err(err) => {
            // Technically, this bytecode could have been emitted
            // by a compiler for another language altogether.
            log::debug!("could not decode metadata: {err}");
            return InferredVersion::MissingMetadata;
        }
    };

    match metadata.solc.as_deref() {
        Some(&[major, minor, patch]) => {
            let version = Version::new(major as u64, minor as u64, patch as u64);
            log::debug!("solc version detected in bytecode: {version}");
            InferredVersion::Exact(version)
        }
        Some(other) => {
            log::debug!(
                "found solc version field with {} elements instead of three",
                other.len()
            );
            InferredVersion::SolcNotFoundInMetadata
        }
        None => {
            log::debug!("could not detect solidity version in metadata");
            InferredVersion::SolcNotFoundInMetadata
        }
    }
}
