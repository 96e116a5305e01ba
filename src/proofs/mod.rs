//! Zero-knowledge proofs used by the signing protocol.
pub mod plaintext;
