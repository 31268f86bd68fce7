/// Name of the ephemeral in-memory network. No explorer can ever index it.
pub const HARDHAT_NETWORK_NAME: &str = "hardhat";

pub const DEFAULT_NETWORK_NAME: &str = "localhost";
pub const DEFAULT_NETWORK_URL: &str = "http://127.0.0.1:12537";

pub const DEFAULT_ARTIFACTS_PATH: &str = "artifacts";
pub const BUILD_INFO_DIR: &str = "build-info";

/// Used for polling the result of the contract verification.
pub const VERIFICATION_STATUS_POLLING_TIME_MS: u64 = 3000;
/// Compilation on the explorer side takes some time,
/// so there is no sense in requesting the status immediately.
pub const VERIFICATION_STATUS_INITIAL_DELAY_MS: u64 = 700;

/// The explorer only supports solidity versions higher than or equal to v0.4.11.
pub const SUPPORTED_SOLC_VERSION_RANGE: &str = ">=0.4.11";

pub const SOURCE_CODE_FORMAT: &str = "solidity-standard-json-input";
