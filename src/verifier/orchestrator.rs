use super::{Error, VerificationArgs};
use crate::{
    chain::{get_current_chain_config, ChainClient, ChainConfig, NodeStatus},
    compiler::get_compiler_versions,
    confluxscan::{
        self, ConfluxscanClient, PollingPolicy, Sleeper, TokioSleeper, VerificationStatus,
    },
    settings::Settings,
    solidity::{
        abi::encode_arguments, get_contract_information, BuildInfos, Bytecode, CompilerInput,
        ExtendedContractInformation,
    },
};
use std::sync::Arc;

/// Compiler input that got the contract verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmittedInput {
    /// Only the sources the contract depends on.
    Minimal,
    /// Every source of the original compilation.
    Full,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The explorer had the source code before the run; nothing was submitted.
    AlreadyVerified { url: String },
    Verified { url: String, input: SubmittedInput },
}

struct AttemptResult {
    success: bool,
    message: String,
}

/// Runs verifications against the explorer of the chain `chain` is connected to.
#[derive(Clone)]
pub struct Verifier {
    chain: Arc<dyn ChainClient>,
    settings: Settings,
    sleeper: Arc<dyn Sleeper>,
}

impl Verifier {
    pub fn new(chain: Arc<dyn ChainClient>, settings: Settings) -> Self {
        Self {
            chain,
            settings,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn network_name(&self) -> &str {
        &self.settings.network.name
    }

    async fn current_chain_config(&self) -> Result<(ChainConfig, NodeStatus), Error> {
        let status = self.chain.get_status().await?;
        let chain_config = get_current_chain_config(
            self.network_name(),
            status.chain_id,
            &self.settings.confluxscan.custom_chains,
        )?;
        log::debug!(
            "chain {} resolved to the explorer at {}",
            status.chain_id,
            chain_config.urls.api_url
        );
        Ok((chain_config, status))
    }

    async fn load_build_infos(&self) -> Result<BuildInfos, Error> {
        Ok(BuildInfos::load(&self.settings.artifacts.build_info_dir()).await?)
    }

    pub async fn verify(&self, args: &VerificationArgs) -> Result<VerificationOutcome, Error> {
        let address = args.address_hex();
        let (chain_config, status) = self.current_chain_config().await?;

        let client = ConfluxscanClient::from_chain_config(&chain_config)?.with_polling(
            PollingPolicy::from(&self.settings.polling),
            self.sleeper.clone(),
        );

        let is_verified = match client.is_verified(&address).await {
            Ok(is_verified) => is_verified,
            Err(err @ confluxscan::Error::NetworkRequest(_)) => return Err(err.into()),
            Err(err) if args.force => {
                log::debug!("ignoring failed verification check: {err}");
                false
            }
            Err(err) => return Err(err.into()),
        };
        if !args.force && is_verified {
            let url = client.get_contract_url(&address);
            log::warn!(
                "The contract {address} has already been verified on the block explorer. \
                 If you're trying to verify a partially verified contract, \
                 please use the force flag.\n{url}"
            );
            return Ok(VerificationOutcome::AlreadyVerified { url });
        }

        let configured_versions = get_compiler_versions(&self.settings.solidity)?;
        let (deployed_bytecode, build_infos) = futures::try_join!(
            async {
                Bytecode::get_deployed_contract_bytecode(
                    &args.address,
                    status.network_id,
                    self.chain.as_ref(),
                    self.network_name(),
                )
                .await
                .map_err(Error::from)
            },
            self.load_build_infos()
        )?;
        let matching_versions = deployed_bytecode.get_matching_versions(&configured_versions);
        if matching_versions.is_empty() && !deployed_bytecode.is_ovm() {
            return Err(Error::CompilerVersionsMismatch {
                configured: configured_versions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                inferred: deployed_bytecode.get_version().to_string(),
                network: self.network_name().to_string(),
            });
        }

        let contract_information = get_contract_information(
            &build_infos,
            args.contract_fqn.as_deref(),
            &deployed_bytecode,
            &matching_versions,
            &args.libraries,
            self.network_name(),
        )?;
        let contract = &contract_information.contract;
        let encoded_constructor_arguments = encode_arguments(
            &contract.contract_output.abi,
            &contract.source_name,
            &contract.contract_name,
            &args.constructor_args,
        )?;

        let minimal = self
            .attempt_verification(
                &client,
                &address,
                contract.minimal_input.clone(),
                &contract_information,
                &encoded_constructor_arguments,
            )
            .await?;
        if minimal.success {
            return Ok(VerificationOutcome::Verified {
                url: client.get_contract_url(&address),
                input: SubmittedInput::Minimal,
            });
        }

        log::warn!(
            "We tried verifying your contract {} without including any unrelated one, \
             but it failed.\n\
             Trying again with the full solc input used to compile and deploy it.\n\
             This means that unrelated contracts may be displayed on the block explorer...",
            contract.contract_name
        );
        let full = self
            .attempt_verification(
                &client,
                &address,
                contract.compiler_input.clone(),
                &contract_information,
                &encoded_constructor_arguments,
            )
            .await?;
        if full.success {
            return Ok(VerificationOutcome::Verified {
                url: client.get_contract_url(&address),
                input: SubmittedInput::Full,
            });
        }

        Err(Error::VerificationFailed {
            contract: contract.fully_qualified_name(),
            address,
            message: full.message,
            undetectable_libraries: contract_information.undetectable_libraries.clone(),
        })
    }

    async fn attempt_verification(
        &self,
        client: &ConfluxscanClient,
        address: &str,
        compiler_input: CompilerInput,
        contract_information: &ExtendedContractInformation,
        encoded_constructor_arguments: &str,
    ) -> Result<AttemptResult, Error> {
        let contract = &contract_information.contract;
        let compiler_input = compiler_input.with_libraries(&contract_information.libraries);
        let source_code =
            serde_json::to_string(&compiler_input).map_err(Error::InputSerialization)?;
        let contract_fqn = contract.fully_qualified_name();

        let response = client
            .verify(
                address,
                &source_code,
                &contract_fqn,
                &format!("v{}", contract.solc_long_version),
                encoded_constructor_arguments,
            )
            .await?;
        log::info!(
            "Successfully submitted source code for contract\n{contract_fqn} at {address}\n\
             for verification on the block explorer. Waiting for verification result..."
        );

        client.wait_before_polling().await;
        let status = client
            .get_verification_status(&response.data)
            .await
            .map_err(|source| Error::VerificationStatus {
                contract: contract_fqn.clone(),
                address: address.to_string(),
                source,
            })?;
        match status.status() {
            VerificationStatus::AlreadyVerified => {
                Err(confluxscan::Error::ContractAlreadyVerified {
                    contract: contract_fqn,
                    address: address.to_string(),
                }
                .into())
            }
            VerificationStatus::Success => {
                log::info!(
                    "Successfully verified contract {} on the block explorer.\n{}",
                    contract.contract_name,
                    client.get_contract_url(address)
                );
                Ok(AttemptResult {
                    success: true,
                    message: status.message,
                })
            }
            VerificationStatus::Failure => Ok(AttemptResult {
                success: false,
                message: status.message,
            }),
            _ => Err(confluxscan::Error::UnexpectedMessage {
                contract: contract_fqn,
                address: address.to_string(),
                message: status.data,
            }
            .into()),
        }
    }
}
