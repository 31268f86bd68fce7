use serde::Deserialize;
use serde_json::Value;

/// Answer of `contract/getabi`.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct GetAbiResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

impl GetAbiResponse {
    pub fn has_source_code(&self) -> bool {
        if self.message != "OK" {
            return false;
        }
        match &self.result {
            Value::Null => false,
            Value::String(result) => !result.is_empty(),
            Value::Array(result) => !result.is_empty(),
            Value::Object(result) => !result.is_empty(),
            _ => true,
        }
    }
}

/// Status of a verification request, as reported in the `data` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Failure,
    Success,
    AlreadyVerified,
    BytecodeMissing,
    Unknown,
}

/// Answer of `contract/verifysourcecode` and `contract/checkverifystatus`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerificationResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// Guid of the submitted request, or a human readable status.
    #[serde(default, alias = "result", deserialize_with = "string_or_null")]
    pub data: String,
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl VerificationResponse {
    pub fn status(&self) -> VerificationStatus {
        match self.data.as_str() {
            "Pending in queue" => VerificationStatus::Pending,
            "Fail - Unable to verify" => VerificationStatus::Failure,
            "Pass - Verified" => VerificationStatus::Success,
            data if data.starts_with("Unable to locate ContractCode at") => {
                VerificationStatus::BytecodeMissing
            }
            data if data.starts_with("Contract source code already verified")
                || data.starts_with("Already Verified") =>
            {
                VerificationStatus::AlreadyVerified
            }
            _ => VerificationStatus::Unknown,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}
