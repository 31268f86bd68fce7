use super::{
    types::{GetAbiResponse, VerificationResponse, VerificationStatus},
    Error,
};
use crate::{
    chain::ChainConfig,
    consts::{
        SOURCE_CODE_FORMAT, VERIFICATION_STATUS_INITIAL_DELAY_MS,
        VERIFICATION_STATUS_POLLING_TIME_MS,
    },
    settings::PollingSettings,
};
use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::{fmt::Debug, num::NonZeroUsize, sync::Arc, time::Duration};
use url::Url;

#[async_trait]
pub trait Sleeper: Debug + Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub interval: Duration,
    pub initial_delay: Duration,
    /// `None` polls until the explorer reports a final status.
    pub max_attempts: Option<NonZeroUsize>,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(VERIFICATION_STATUS_POLLING_TIME_MS),
            initial_delay: Duration::from_millis(VERIFICATION_STATUS_INITIAL_DELAY_MS),
            max_attempts: None,
        }
    }
}

impl From<&PollingSettings> for PollingPolicy {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: settings.interval,
            initial_delay: settings.initial_delay,
            max_attempts: settings.max_attempts,
        }
    }
}

/// Client of the confluxscan verification api. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct ConfluxscanClient {
    api_url: Url,
    browser_url: String,
    reqwest_client: reqwest::Client,
    polling: PollingPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ConfluxscanClient {
    pub fn new(api_url: Url, browser_url: &Url) -> Result<Self, Error> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            api_url,
            browser_url: browser_url.as_str().trim().trim_end_matches('/').to_string(),
            reqwest_client,
            polling: PollingPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_chain_config(chain_config: &ChainConfig) -> Result<Self, Error> {
        Self::new(
            chain_config.urls.api_url.clone(),
            &chain_config.urls.browser_url,
        )
    }

    pub fn with_polling(mut self, polling: PollingPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        self.polling = polling;
        self.sleeper = sleeper;
        self
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.api_url.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    /// Checks whether the explorer already has the source code of `address`.
    pub async fn is_verified(&self, address: &str) -> Result<bool, Error> {
        let mut url = self.endpoint("contract/getabi");
        url.query_pairs_mut().append_pair("address", address);

        let response = self.reqwest_client.get(url.clone()).send().await?;
        let response: GetAbiResponse = Self::process_response(url, response).await?;
        Ok(response.has_source_code())
    }

    /// Submits the standard json input of a contract for verification.
    /// Returns the response containing the guid of the verification request.
    pub async fn verify(
        &self,
        contract_address: &str,
        source_code: &str,
        contract_name: &str,
        compiler_version: &str,
        constructor_arguments: &str,
    ) -> Result<VerificationResponse, Error> {
        let url = self.endpoint("contract/verifysourcecode");
        let form = [
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", contract_address),
            ("sourceCode", source_code),
            ("codeformat", SOURCE_CODE_FORMAT),
            ("contractname", contract_name),
            ("compilerversion", compiler_version),
            ("constructorArguements", constructor_arguments),
        ];

        let response = self
            .reqwest_client
            .post(url.clone())
            .form(&form)
            .send()
            .await?;
        let response: VerificationResponse = Self::process_response(url, response).await?;

        match response.status() {
            VerificationStatus::BytecodeMissing => Err(Error::BytecodeMissing {
                api_url: self.api_url.to_string(),
                address: contract_address.to_string(),
            }),
            VerificationStatus::AlreadyVerified => Err(Error::ContractAlreadyVerified {
                contract: contract_name.to_string(),
                address: contract_address.to_string(),
            }),
            _ if !response.is_ok() => Err(Error::Explorer {
                contract: contract_name.to_string(),
                address: contract_address.to_string(),
                message: response.message,
            }),
            _ => Ok(response),
        }
    }

    /// Waits for the explorer to start processing a freshly submitted request.
    pub async fn wait_before_polling(&self) {
        self.sleeper.sleep(self.polling.initial_delay).await
    }

    /// Polls the status of the verification request `guid` while it is pending.
    /// Returns on success, failure or an already verified contract.
    pub async fn get_verification_status(
        &self,
        guid: &str,
    ) -> Result<VerificationResponse, Error> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let response = self.check_verify_status(guid).await?;
            match response.status() {
                VerificationStatus::Pending => {
                    if let Some(max_attempts) = self.polling.max_attempts {
                        if attempts >= max_attempts.get() {
                            return Err(Error::PollingAttemptsExhausted {
                                guid: guid.to_string(),
                                attempts,
                            });
                        }
                    }
                    log::debug!("verification request {guid} is pending (attempt {attempts})");
                    self.sleeper.sleep(self.polling.interval).await;
                }
                VerificationStatus::Failure | VerificationStatus::AlreadyVerified => {
                    return Ok(response)
                }
                _ if !response.is_ok() => {
                    return Err(Error::PollingResponseNotOk {
                        guid: guid.to_string(),
                        message: response.message,
                    })
                }
                _ => return Ok(response),
            }
        }
    }

    async fn check_verify_status(&self, guid: &str) -> Result<VerificationResponse, Error> {
        let mut url = self.endpoint("contract/checkverifystatus");
        url.query_pairs_mut()
            .append_pair("module", "contract")
            .append_pair("action", "checkverifystatus")
            .append_pair("guid", guid);

        let response = self.reqwest_client.get(url.clone()).send().await?;
        Self::process_response(url, response).await
    }

    pub fn get_contract_url(&self, address: &str) -> String {
        format!("{}/address/{address}#code", self.browser_url)
    }
}

impl ConfluxscanClient {
    async fn process_response<T: DeserializeOwned>(
        url: Url,
        response: Response,
    ) -> Result<T, Error> {
        let status_code = response.status();
        log::debug!("{url} responded with {status_code}");
        if !status_code.is_success() {
            return Err(Error::InvalidStatusCode {
                url: url.to_string(),
                status_code,
                body: response.text().await?,
            });
        }
        Ok(response.json::<T>().await?)
    }
}
