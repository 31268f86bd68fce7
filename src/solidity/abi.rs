//! ABI encoding of constructor arguments.

use ethabi::{
    token::{LenientTokenizer, Tokenizer},
    Contract, ParamType, Token,
};
use primitive_types::U256;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("the ABI of {contract} is invalid: {source}")]
    InvalidAbi {
        contract: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "the constructor for {source_name}:{contract_name} has {requested} parameters \
         but {received} arguments were provided instead"
    )]
    Length {
        source_name: String,
        contract_name: String,
        requested: usize,
        received: usize,
    },
    #[error("value {value} cannot be encoded for the parameter {argument}: {reason}")]
    Type {
        argument: String,
        value: String,
        reason: String,
    },
    #[error(
        "value {value} is not a safe integer and cannot be encoded as {kind}; \
         use a string instead of a plain number"
    )]
    Overflow { kind: String, value: String },
}

/// Encodes `arguments` against the constructor of the contract described by `abi`.
/// Returns the hex encoding without the `0x` prefix.
pub fn encode_arguments(
    abi: &Value,
    source_name: &str,
    contract_name: &str,
    arguments: &[Value],
) -> Result<String, Error> {
    let contract: Contract =
        serde_json::from_value(abi.clone()).map_err(|source| Error::InvalidAbi {
            contract: format!("{source_name}:{contract_name}"),
            source,
        })?;
    let inputs = contract
        .constructor
        .map(|constructor| constructor.inputs)
        .unwrap_or_default();

    if inputs.len() != arguments.len() {
        return Err(Error::Length {
            source_name: source_name.to_string(),
            contract_name: contract_name.to_string(),
            requested: inputs.len(),
            received: arguments.len(),
        });
    }

    let tokens = inputs
        .iter()
        .zip(arguments)
        .map(|(param, value)| tokenize(&param.name, &param.kind, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hex::encode(ethabi::encode(&tokens)))
}

fn tokenize(argument: &str, kind: &ParamType, value: &Value) -> Result<Token, Error> {
    let type_error = |reason: String| Error::Type {
        argument: argument.to_string(),
        value: value.to_string(),
        reason,
    };

    match (kind, value) {
        (ParamType::String, Value::String(s)) => Ok(Token::String(s.clone())),
        (ParamType::String, _) => Err(type_error("invalid string value".to_string())),
        (ParamType::Bool, Value::Bool(b)) => Ok(Token::Bool(*b)),
        (ParamType::Array(inner), Value::Array(values)) => values
            .iter()
            .map(|value| tokenize(argument, inner, value))
            .collect::<Result<_, _>>()
            .map(Token::Array),
        (ParamType::FixedArray(inner, size), Value::Array(values)) => {
            if values.len() != *size {
                return Err(type_error(format!(
                    "expected {size} array elements, got {}",
                    values.len()
                )));
            }
            values
                .iter()
                .map(|value| tokenize(argument, inner, value))
                .collect::<Result<_, _>>()
                .map(Token::FixedArray)
        }
        (ParamType::Tuple(components), Value::Array(values)) => {
            if values.len() != components.len() {
                return Err(type_error(format!(
                    "expected {} tuple components, got {}",
                    components.len(),
                    values.len()
                )));
            }
            components
                .iter()
                .zip(values)
                .map(|(kind, value)| tokenize(argument, kind, value))
                .collect::<Result<_, _>>()
                .map(Token::Tuple)
        }
        (ParamType::Array(_) | ParamType::FixedArray(..) | ParamType::Tuple(_), _) => {
            Err(type_error("expected an array".to_string()))
        }
        (ParamType::Int(bits) | ParamType::Uint(bits), Value::Number(number)) => {
            if !(number.is_i64() || number.is_u64()) {
                return Err(Error::Overflow {
                    kind: kind.to_string(),
                    value: number.to_string(),
                });
            }
            tokenize_integer(kind, *bits, &number.to_string()).map_err(type_error)
        }
        (ParamType::Int(bits) | ParamType::Uint(bits), Value::String(s)) => {
            tokenize_integer(kind, *bits, s).map_err(type_error)
        }
        (_, Value::String(s)) => {
            LenientTokenizer::tokenize(kind, s.strip_prefix("0x").unwrap_or(s))
                .map_err(|err| type_error(err.to_string()))
        }
        _ => Err(type_error(format!("invalid {kind} value"))),
    }
}

/// Parses a decimal or 0x-prefixed hex integer, optionally negative,
/// and checks that it fits into `bits`.
fn tokenize_integer(kind: &ParamType, bits: usize, value: &str) -> Result<Token, String> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex) if !hex.is_empty() => U256::from_str(hex).ok(),
        None if !digits.is_empty() => U256::from_dec_str(digits).ok(),
        _ => None,
    }
    .ok_or_else(|| format!("invalid {kind} value"))?;

    match kind {
        ParamType::Uint(_) if !negative && magnitude.bits() <= bits => {
            Ok(Token::Uint(magnitude))
        }
        ParamType::Int(_) if bits > 0 => {
            let limit = U256::one() << (bits - 1);
            if negative && magnitude <= limit {
                // two's complement
                Ok(Token::Int(U256::zero().overflowing_sub(magnitude).0))
            } else if !negative && magnitude < limit {
                Ok(Token::Int(magnitude))
            } else {
                Err("value out-of-bounds".to_string())
            }
        }
        _ => Err("value out-of-bounds".to_string()),
    }
}
