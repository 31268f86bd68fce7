use crate::{consts::SUPPORTED_SOLC_VERSION_RANGE, settings::SoliditySettings};
use semver::{Version, VersionReq};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid compiler version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },
    #[error(
        "unsupported solidity versions: {}; the explorer only supports versions {}",
        .0.join(", "),
        SUPPORTED_SOLC_VERSION_RANGE
    )]
    UnsupportedVersions(Vec<String>),
}

/// Every compiler version configured for the project, compilers and overrides alike.
pub fn get_compiler_versions(settings: &SoliditySettings) -> Result<Vec<Version>, Error> {
    let mut versions = Vec::new();
    for version in settings
        .compilers
        .iter()
        .chain(settings.overrides.values())
        .map(|compiler| compiler.version.as_str())
    {
        let version = Version::parse(version).map_err(|source| Error::InvalidVersion {
            version: version.to_string(),
            source,
        })?;
        if !versions.contains(&version) {
            versions.push(version);
        }
    }

    let supported =
        VersionReq::parse(SUPPORTED_SOLC_VERSION_RANGE).expect("valid version requirement");
    let unsupported: Vec<String> = versions
        .iter()
        .filter(|version| !supported.matches(version))
        .map(ToString::to_string)
        .collect();
    if !unsupported.is_empty() {
        return Err(Error::UnsupportedVersions(unsupported));
    }

    Ok(versions)
}
