//! This module provides the error types and the configuration shared by both
//! sides of the protocol.
//!
//! Every failure in this crate is a local validation failure. None of them are
//! transient, so the core never retries anything: errors go straight back to the
//! caller, who decides whether to abort the session or report to the user.
use core::fmt;
use std::{error, time::Duration};

use serde::{Deserialize, Serialize};

use crate::constants::{LENGTH_OF_I, LENGTH_OF_L, NUMBER_OF_ROUNDS, SESSION_TTL};

/// Identifies which of the two hidden values a proof round is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvenValue {
    /// The ciphertext `C1`, encrypting the hash of the secret message.
    Message,
    /// The ciphertext `C2`, encrypting `t = K1.x mod q`.
    SignerKey,
}

impl fmt::Display for ProvenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvenValue::Message => write!(f, "C1"),
            ProvenValue::SignerKey => write!(f, "C2"),
        }
    }
}

/// Represents an error which can happen when running a protocol.
#[derive(Debug)]
pub enum ProtocolError {
    /// Key generation was attempted without a curve order.
    MissingCurveOrder,
    /// Key generation was attempted with a curve order that isn't an odd prime.
    InvalidCurveOrder,
    /// Key generation was attempted twice on the same client.
    KeysAlreadyGenerated,
    /// The client was used before generating its keys.
    KeysNotGenerated,
    /// The public key or the blinding factor passed to encryption was zero.
    InvalidPublicKeyOrRandomness,
    /// The plaintext passed to encryption was zero.
    MessageFormatError,
    /// The plaintext passed to encryption was larger than the curve order.
    MessageTooLarge,
    /// The private key or the ciphertext passed to decryption was zero.
    InvalidKeyOrCiphertext,
    /// A decrypted string plaintext was not valid UTF-8.
    PlaintextNotUtf8,
    /// The client was asked to generate keys before knowing the signer's key.
    MissingSignerKey,
    /// The client was asked to generate keys before hashing its message.
    MissingMessageHash,
    /// The client was asked to generate keys before hashing the shared info.
    MissingInfoHash,
    /// The signer's public key is not a valid secp256k1 point.
    InvalidSignerKey,
    /// A challenge bit was something other than 0 or 1.
    InvalidChallengeBit(u8),
    /// A proof round failed to verify.
    ///
    /// The whole session is aborted on the first failure.
    ZkProofVerificationFailed { value: ProvenValue, round: usize },
    /// The session token has no record, either because it was never started or
    /// because its record expired.
    SessionExpiredOrUnknown,
    /// A session was driven to a step it is not at.
    UnexpectedStep { expected: u32, found: u32 },
    /// A message did not have the shape this session expects.
    MalformedPayload(String),
    /// The session store failed.
    Store(Box<dyn error::Error + Send + Sync>),
    /// Some generic error happened.
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::MissingCurveOrder => {
                write!(f, "key generation requires the curve order q")
            }
            ProtocolError::InvalidCurveOrder => write!(f, "the curve order q must be an odd prime"),
            ProtocolError::KeysAlreadyGenerated => {
                write!(f, "keys were already generated, refusing to overwrite them")
            }
            ProtocolError::KeysNotGenerated => write!(f, "keys have not been generated yet"),
            ProtocolError::InvalidPublicKeyOrRandomness => {
                write!(f, "public key and randomness must be non-zero")
            }
            ProtocolError::MessageFormatError => write!(f, "plaintext must be non-zero"),
            ProtocolError::MessageTooLarge => {
                write!(f, "plaintext must not exceed the curve order")
            }
            ProtocolError::InvalidKeyOrCiphertext => {
                write!(f, "private key and ciphertext must be non-zero")
            }
            ProtocolError::PlaintextNotUtf8 => write!(f, "plaintext is not valid utf-8"),
            ProtocolError::MissingSignerKey => write!(f, "the signer's public point K1 is not set"),
            ProtocolError::MissingMessageHash => write!(f, "the message hash is not set"),
            ProtocolError::MissingInfoHash => write!(f, "the info hash is not set"),
            ProtocolError::InvalidSignerKey => {
                write!(f, "the signer's key is not a valid secp256k1 point")
            }
            ProtocolError::InvalidChallengeBit(b) => {
                write!(f, "challenge bit must be 0 or 1, found: {}", b)
            }
            ProtocolError::ZkProofVerificationFailed { value, round } => {
                write!(f, "proof for {} failed to verify in round {}", value, round)
            }
            ProtocolError::SessionExpiredOrUnknown => write!(f, "session expired or unknown"),
            ProtocolError::UnexpectedStep { expected, found } => {
                write!(f, "session is at step {}, expected step {}", found, expected)
            }
            ProtocolError::MalformedPayload(e) => write!(f, "malformed payload: {}", e),
            ProtocolError::Store(e) => write!(f, "session store: {}", e),
            ProtocolError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ProtocolError::Store(e) | ProtocolError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<Box<dyn error::Error + Send + Sync>> for ProtocolError {
    fn from(e: Box<dyn error::Error + Send + Sync>) -> Self {
        Self::Other(e)
    }
}

/// Represents an error which can happen when *initializing* a protocol.
///
/// These are related to bad parameters for the protocol, and things like that.
#[derive(Debug)]
pub enum InitializationError {
    BadParameters(String),
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitializationError::BadParameters(s) => write!(f, "bad parameters: {}", s),
        }
    }
}

impl error::Error for InitializationError {}

/// The tunable parameters of a signing session.
///
/// The defaults are the values both parties are expected to agree on. A host
/// can load these from its own configuration, any missing field falls back to
/// the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// The number of proof rounds per proven ciphertext.
    pub rounds: usize,
    /// The length of the client's candidate list L.
    pub candidate_count: usize,
    /// The number of indices the signer picks out of `[0, candidate_count]`.
    pub index_count: usize,
    /// How long a session record lives in the store after each write.
    pub session_ttl: Duration,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            rounds: NUMBER_OF_ROUNDS,
            candidate_count: LENGTH_OF_L,
            index_count: LENGTH_OF_I,
            session_ttl: SESSION_TTL,
        }
    }
}

impl Parameters {
    /// Check that these parameters describe a runnable session.
    pub fn validate(&self) -> Result<(), InitializationError> {
        if self.rounds == 0 {
            return Err(InitializationError::BadParameters(
                "round count cannot be 0".to_string(),
            ));
        }
        if self.candidate_count == 0 {
            return Err(InitializationError::BadParameters(
                "candidate list cannot be empty".to_string(),
            ));
        }
        // Indices are drawn without replacement from [0, candidate_count].
        if self.index_count > self.candidate_count + 1 {
            return Err(InitializationError::BadParameters(format!(
                "cannot pick {} distinct indices out of {}",
                self.index_count,
                self.candidate_count + 1
            )));
        }
        Ok(())
    }
}
