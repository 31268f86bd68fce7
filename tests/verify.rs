mod common;

use async_trait::async_trait;
use bytes::Bytes;
use common::{RecordingSleeper, CONTRACT_ADDRESS};
use cive_verify::{
    chain::{self, ChainClient, ChainConfig, ChainUrls, NodeStatus},
    confluxscan,
    settings::CompilerSettings,
    solidity::artifacts,
    verifier::{resolve_arguments, Error, SubmittedInput, VerificationArgs, VerifyRequest},
    Settings, VerificationOutcome, Verifier,
};
use ethers_core::types::Address;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tempfile::TempDir;
use url::Url;
use wiremock::{
    matchers::{body_string_contains, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const CHAIN_ID: u64 = 1029;
// {"ipfs": h'1220...', "solc": h'000813'}
const METADATA_0_8_19: &str = "a2646970667358221220d1a1ae0e85c8c6fd0bfa8d1b3d4e6c3f4c5f2e3a8b9c0d1e2f3a4b5c6d7e8f9064736f6c63430008130033";

#[derive(Debug)]
struct MockChain {
    chain_id: u64,
    code: Bytes,
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_status(&self) -> Result<NodeStatus, chain::Error> {
        Ok(NodeStatus {
            chain_id: self.chain_id,
            network_id: self.chain_id,
        })
    }

    async fn get_code(&self, _address: &Address, network_id: u64) -> Result<Bytes, chain::Error> {
        assert_eq!(self.chain_id, network_id, "network id of the node status is expected");
        Ok(self.code.clone())
    }
}

fn deployed_code() -> String {
    format!("6080604052348015600f57600080fd5b{METADATA_0_8_19}")
}

fn build_info(greeter_code: &str) -> Value {
    json!({
        "_format": "hh-sol-build-info-1",
        "id": "4c3d1c5c0f7e7a4e3a0d5e6f",
        "solcVersion": "0.8.19",
        "solcLongVersion": "0.8.19+commit.7dd6d404",
        "input": {
            "language": "Solidity",
            "sources": {
                "contracts/Greeter.sol": {"content": "contract Greeter {}"},
                "contracts/Unrelated.sol": {"content": "contract Unrelated {}"}
            },
            "settings": {
                "optimizer": {"enabled": false, "runs": 200},
                "outputSelection": {"*": {"*": ["abi", "evm.bytecode", "evm.deployedBytecode"]}}
            }
        },
        "output": {
            "contracts": {
                "contracts/Greeter.sol": {
                    "Greeter": {
                        "abi": [],
                        "evm": {
                            "bytecode": {"object": "6080", "linkReferences": {}},
                            "deployedBytecode": {
                                "object": greeter_code,
                                "linkReferences": {},
                                "immutableReferences": {}
                            }
                        }
                    }
                },
                "contracts/Unrelated.sol": {
                    "Unrelated": {
                        "abi": [],
                        "evm": {
                            "bytecode": {"object": "6080", "linkReferences": {}},
                            "deployedBytecode": {
                                "object": format!("60806040526000{METADATA_0_8_19}")
                            }
                        }
                    }
                }
            },
            "sources": {
                "contracts/Greeter.sol": {"id": 0, "ast": {"nodeType": "SourceUnit", "nodes": []}},
                "contracts/Unrelated.sol": {"id": 1, "ast": {"nodeType": "SourceUnit", "nodes": []}}
            }
        }
    })
}

struct TestSetup {
    mock_server: MockServer,
    artifacts: TempDir,
    sleeper: Arc<RecordingSleeper>,
    code: String,
}

impl TestSetup {
    async fn new() -> Self {
        Self::with_deployed_code(deployed_code()).await
    }

    /// The Greeter contract of the build info is compiled to `code`, which is also deployed.
    async fn with_deployed_code(code: String) -> Self {
        let artifacts = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(artifacts.path().join("build-info")).unwrap();
        let setup = Self {
            mock_server: MockServer::start().await,
            artifacts,
            sleeper: RecordingSleeper::new(),
            code,
        };
        setup.write_build_info("4c3d1c5c0f7e7a4e3a0d5e6f", &build_info(&setup.code).to_string());
        setup
    }

    fn write_build_info(&self, id: &str, content: &str) {
        let path = self
            .artifacts
            .path()
            .join("build-info")
            .join(format!("{id}.json"));
        std::fs::write(path, content).unwrap();
    }

    fn settings(&self, compiler_version: &str) -> Settings {
        let mut settings = Settings::default();
        settings.network.name = "mainnet".to_string();
        settings.solidity.compilers = vec![CompilerSettings {
            version: compiler_version.to_string(),
        }];
        settings.artifacts.path = self.artifacts.path().to_path_buf();
        settings.confluxscan.custom_chains = vec![ChainConfig {
            network: "mainnet-mirror".to_string(),
            chain_id: CHAIN_ID,
            urls: ChainUrls {
                api_url: Url::parse(&self.mock_server.uri()).unwrap(),
                browser_url: Url::parse("https://scan.example.org/").unwrap(),
            },
        }];
        settings
    }

    fn verifier(&self, settings: Settings) -> Verifier {
        self.verifier_with_code(settings, Bytes::from(hex::decode(&self.code).unwrap()))
    }

    fn verifier_with_code(&self, settings: Settings, code: Bytes) -> Verifier {
        let chain = MockChain {
            chain_id: CHAIN_ID,
            code,
        };
        Verifier::new(Arc::new(chain), settings).with_sleeper(self.sleeper.clone())
    }

    async fn mount_is_verified(&self, status: u16, body: Value) {
        Mock::given(method("GET"))
            .and(path("/contract/getabi"))
            .and(query_param("address", CONTRACT_ADDRESS))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(1)
            .mount(&self.mock_server)
            .await;
    }

    async fn mount_not_verified(&self) {
        self.mount_is_verified(200, json!({"status": "0", "message": "NOTOK", "result": ""}))
            .await
    }

    /// Answers submissions containing `marker` with `guid`.
    async fn mount_submission(&self, marker: &str, guid: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/contract/verifysourcecode"))
            .and(body_string_contains(marker))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 0, "message": "OK", "data": guid})),
            )
            .expect(times)
            .mount(&self.mock_server)
            .await;
    }

    async fn mount_status(&self, guid: &str, data: &str) {
        Mock::given(method("GET"))
            .and(path("/contract/checkverifystatus"))
            .and(query_param("guid", guid))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 0, "message": "OK", "data": data})),
            )
            .mount(&self.mock_server)
            .await;
    }
}

async fn args(force: bool) -> VerificationArgs {
    resolve_arguments(VerifyRequest {
        address: Some(CONTRACT_ADDRESS.to_string()),
        force,
        ..Default::default()
    })
    .await
    .unwrap()
}

fn contract_url() -> String {
    format!("https://scan.example.org/address/{CONTRACT_ADDRESS}#code")
}

#[tokio::test]
async fn already_verified_contract_is_not_submitted() {
    let setup = TestSetup::new().await;
    setup
        .mount_is_verified(200, json!({"status": "1", "message": "OK", "result": "[]"}))
        .await;
    setup.mount_submission("", "guid", 0).await;

    let outcome = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .unwrap();

    assert_eq!(
        VerificationOutcome::AlreadyVerified { url: contract_url() },
        outcome
    );
}

#[tokio::test]
async fn minimal_input_is_submitted_first() {
    let setup = TestSetup::new().await;
    setup.mount_not_verified().await;
    setup.mount_submission("Unrelated", "guid-full", 0).await;
    setup.mount_submission("Greeter", "guid-minimal", 1).await;
    setup.mount_status("guid-minimal", "Pass - Verified").await;

    let outcome = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .unwrap();

    assert_eq!(
        VerificationOutcome::Verified {
            url: contract_url(),
            input: SubmittedInput::Minimal
        },
        outcome
    );
    assert_eq!(vec![Duration::from_millis(700)], setup.sleeper.sleeps());
}

#[tokio::test]
async fn failed_minimal_input_is_retried_with_full_input() {
    let setup = TestSetup::new().await;
    setup.mount_not_verified().await;
    setup.mount_submission("Unrelated", "guid-full", 1).await;
    setup.mount_submission("Greeter", "guid-minimal", 1).await;
    setup.mount_status("guid-minimal", "Fail - Unable to verify").await;
    setup.mount_status("guid-full", "Pass - Verified").await;

    let outcome = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .unwrap();

    assert_eq!(
        VerificationOutcome::Verified {
            url: contract_url(),
            input: SubmittedInput::Full
        },
        outcome
    );
    assert_eq!(vec![Duration::from_millis(700); 2], setup.sleeper.sleeps());
}

#[tokio::test]
async fn verification_fails_after_full_input() {
    let setup = TestSetup::new().await;
    setup.mount_not_verified().await;
    setup.mount_submission("Unrelated", "guid-full", 1).await;
    setup.mount_submission("Greeter", "guid-minimal", 1).await;
    setup.mount_status("guid-minimal", "Fail - Unable to verify").await;
    setup.mount_status("guid-full", "Fail - Unable to verify").await;

    let err = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(
            &err,
            Error::VerificationFailed { contract, address, undetectable_libraries, .. }
                if contract == "contracts/Greeter.sol:Greeter"
                    && address == CONTRACT_ADDRESS
                    && undetectable_libraries.is_empty()
        ),
        "expected: 'VerificationFailed', got: {err:?}"
    );
}

#[tokio::test]
async fn already_verified_during_polling() {
    let setup = TestSetup::new().await;
    setup.mount_not_verified().await;
    setup.mount_submission("Greeter", "guid-minimal", 1).await;
    setup.mount_status("guid-minimal", "Already Verified").await;

    let err = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(
            err,
            Error::Confluxscan(confluxscan::Error::ContractAlreadyVerified { .. })
        ),
        "expected: 'ContractAlreadyVerified', got: {err:?}"
    );
}

#[tokio::test]
async fn unexpected_status_is_fatal() {
    let setup = TestSetup::new().await;
    setup.mount_not_verified().await;
    setup.mount_submission("Greeter", "guid-minimal", 1).await;
    setup.mount_status("guid-minimal", "Queued for review").await;

    let err = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(
            &err,
            Error::Confluxscan(confluxscan::Error::UnexpectedMessage { contract, address, message })
                if contract == "contracts/Greeter.sol:Greeter"
                    && address == CONTRACT_ADDRESS
                    && message == "Queued for review"
        ),
        "expected: 'UnexpectedMessage', got: {err:?}"
    );
}

#[tokio::test]
async fn forced_verification_ignores_failed_check() {
    let setup = TestSetup::new().await;
    setup.mount_is_verified(503, json!({"message": "unavailable"})).await;
    setup.mount_submission("Greeter", "guid-minimal", 1).await;
    setup.mount_status("guid-minimal", "Pass - Verified").await;

    let outcome = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(true).await)
        .await
        .unwrap();

    assert!(
        matches!(outcome, VerificationOutcome::Verified { .. }),
        "got: {outcome:?}"
    );
}

#[tokio::test]
async fn failed_check_without_force_is_an_error() {
    let setup = TestSetup::new().await;
    setup.mount_is_verified(503, json!({"message": "unavailable"})).await;
    setup.mount_submission("", "guid", 0).await;

    let err = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(
            err,
            Error::Confluxscan(confluxscan::Error::InvalidStatusCode { .. })
        ),
        "expected: 'InvalidStatusCode', got: {err:?}"
    );
}

#[tokio::test]
async fn compiler_versions_mismatch() {
    let setup = TestSetup::new().await;
    setup.mount_not_verified().await;
    setup.mount_submission("", "guid", 0).await;

    let err = setup
        .verifier(setup.settings("0.7.6"))
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(
            &err,
            Error::CompilerVersionsMismatch { configured, inferred, .. }
                if configured == "0.7.6" && inferred == "0.8.19"
        ),
        "expected: 'CompilerVersionsMismatch', got: {err:?}"
    );
}

#[tokio::test]
async fn unknown_chain_is_rejected() {
    let setup = TestSetup::new().await;
    let chain = MockChain {
        chain_id: 4242,
        code: Bytes::new(),
    };
    let err = Verifier::new(Arc::new(chain), setup.settings("0.8.19"))
        .with_sleeper(setup.sleeper.clone())
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(err, Error::Chain(chain::Error::ChainConfigNotFound(4242))),
        "expected: 'ChainConfigNotFound', got: {err:?}"
    );
}

#[tokio::test]
async fn address_without_code_is_rejected() {
    let setup = TestSetup::new().await;
    setup.mount_not_verified().await;
    setup.mount_submission("", "guid", 0).await;

    let err = setup
        .verifier_with_code(setup.settings("0.8.19"), Bytes::new())
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(
            &err,
            Error::Chain(chain::Error::NoContractCode { network, .. }) if network == "mainnet"
        ),
        "expected: 'NoContractCode', got: {err:?}"
    );
}

#[tokio::test]
async fn ovm_bytecode_skips_compiler_version_checks() {
    let ovm_signature =
        "336000905af158601d01573d60011458600c01573d6000803e3d621234565260ea61109c52";
    let setup =
        TestSetup::with_deployed_code(format!("6080{ovm_signature}6000{METADATA_0_8_19}")).await;
    setup.mount_not_verified().await;
    setup.mount_submission("Greeter", "guid-minimal", 1).await;
    setup.mount_status("guid-minimal", "Pass - Verified").await;

    // the build info was compiled with 0.8.19, which isn't configured
    let outcome = setup
        .verifier(setup.settings("0.7.6"))
        .verify(&args(false).await)
        .await
        .unwrap();

    assert_eq!(
        VerificationOutcome::Verified {
            url: contract_url(),
            input: SubmittedInput::Minimal
        },
        outcome
    );
}

#[tokio::test]
async fn network_failure_of_check_is_fatal_even_when_forced() {
    let setup = TestSetup::new().await;
    setup.mount_submission("", "guid", 0).await;
    let mut settings = setup.settings("0.8.19");
    // nothing listens on the discard port
    settings.confluxscan.custom_chains[0].urls.api_url = Url::parse("http://127.0.0.1:9").unwrap();

    let err = setup
        .verifier(settings)
        .verify(&args(true).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(
            err,
            Error::Confluxscan(confluxscan::Error::NetworkRequest(_))
        ),
        "expected: 'NetworkRequest', got: {err:?}"
    );
}

#[tokio::test]
async fn build_infos_are_not_read_for_verified_contracts() {
    let setup = TestSetup::new().await;
    setup.write_build_info("corrupted", "{\"solcVersion\": ");
    setup
        .mount_is_verified(200, json!({"status": "1", "message": "OK", "result": "[]"}))
        .await;

    let outcome = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .unwrap();

    assert_eq!(
        VerificationOutcome::AlreadyVerified { url: contract_url() },
        outcome
    );
}

#[tokio::test]
async fn corrupted_build_info_fails_unverified_contracts() {
    let setup = TestSetup::new().await;
    setup.write_build_info("corrupted", "{\"solcVersion\": ");
    setup.mount_not_verified().await;
    setup.mount_submission("", "guid", 0).await;

    let err = setup
        .verifier(setup.settings("0.8.19"))
        .verify(&args(false).await)
        .await
        .expect_err("error expected");

    assert!(
        matches!(err, Error::Artifacts(artifacts::Error::Json { .. })),
        "expected: 'Json', got: {err:?}"
    );
}
