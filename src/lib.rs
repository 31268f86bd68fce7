pub mod chain;
pub mod cli;
pub mod compiler;
pub mod confluxscan;
mod consts;
pub mod settings;
pub mod solidity;
pub mod verifier;

pub use settings::Settings;
pub use verifier::{VerificationOutcome, Verifier};
