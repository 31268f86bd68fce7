use crate::{
    chain::ChainConfig,
    consts::{
        BUILD_INFO_DIR, DEFAULT_ARTIFACTS_PATH, DEFAULT_NETWORK_NAME, DEFAULT_NETWORK_URL,
        VERIFICATION_STATUS_INITIAL_DELAY_MS, VERIFICATION_STATUS_POLLING_TIME_MS,
    },
};
use anyhow::anyhow;
use config::{Config, File};
use serde::{de::IgnoredAny, Deserialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub network: NetworkSettings,
    pub solidity: SoliditySettings,
    pub confluxscan: ConfluxscanSettings,
    pub artifacts: ArtifactsSettings,
    pub polling: PollingSettings,

    pub config: IgnoredAny,
}

/// The network the contract is deployed to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    pub name: String,
    /// JSON-RPC endpoint of a core space node.
    pub url: Url,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_NETWORK_NAME.to_string(),
            url: Url::try_from(DEFAULT_NETWORK_URL).expect("valid url"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoliditySettings {
    pub compilers: Vec<CompilerSettings>,
    /// Compilers used for specific source files.
    pub overrides: BTreeMap<String, CompilerSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerSettings {
    pub version: String,
}

/// Api key of the explorer. It is not sent along with verification requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ApiKey {
    Key(String),
    PerNetwork(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfluxscanSettings {
    pub enabled: bool,
    pub api_key: Option<ApiKey>,
    pub custom_chains: Vec<ChainConfig>,
}

impl Default for ConfluxscanSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            custom_chains: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsSettings {
    pub path: PathBuf,
}

impl ArtifactsSettings {
    pub fn build_info_dir(&self) -> PathBuf {
        self.path.join(BUILD_INFO_DIR)
    }
}

impl Default for ArtifactsSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_ARTIFACTS_PATH),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingSettings {
    /// Delay between two verification status requests.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub interval: Duration,
    /// Delay between the submission and the first status request.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub initial_delay: Duration,
    /// Status requests made before giving up. Polls until a final status if not set.
    pub max_attempts: Option<NonZeroUsize>,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(VERIFICATION_STATUS_POLLING_TIME_MS),
            initial_delay: Duration::from_millis(VERIFICATION_STATUS_INITIAL_DELAY_MS),
            max_attempts: None,
        }
    }
}

impl Settings {
    /// Reads the configuration file, if any, and applies `CIVE_VERIFY__*` environment overrides.
    /// The file is taken from `config_path`, falling back to the `CIVE_VERIFY__CONFIG` variable.
    pub fn new(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CIVE_VERIFY__CONFIG").ok().map(PathBuf::from));

        let mut builder = Config::builder();
        if let Some(config_path) = config_path {
            builder = builder.add_source(File::from(config_path));
        };
        builder =
            builder.add_source(config::Environment::with_prefix("CIVE_VERIFY").separator("__"));

        builder
            .build()?
            .try_deserialize()
            .map_err(|err| anyhow!(err))
    }
}
