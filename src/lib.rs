//! The core of a partially blind ECDSA signing protocol over secp256k1.
//!
//! A user wants a signer to sign a message without learning it, while both agree
//! on some public info string bound to the request. The user hides the hash of the
//! message inside a ciphertext under its own homomorphic key, and proves in zero
//! knowledge that the ciphertext was honestly formed.
//!
//! # Warning
//!
//! This is experimental cryptographic software, I would exercise caution.
//!
//! - The protocol does not have a formal proof of security.
//! - This library has not undergone any form of audit.
//!
//! # Design
//!
//! The crate is split in a few layers:
//!
//! - A modified Paillier scheme, in [paillier], with modulus `N = p * q * k`
//!   where `q` is the order of secp256k1, so that plaintexts live modulo `q`.
//! - A cut-and-choose proof of plaintext knowledge, in [proofs::plaintext].
//! - The two roles: the [BlindSignatureClient] and the [BlindSignatureServer].
//! - A pluggable [SessionStore] holding the signer's per-session state.
//!
//! The flow of the protocol is:
//!
//! - The signer starts a session for some token, sending back its public point `K1`
//!   and one challenge bit per round.
//! - The client generates its keys, encrypts `H(m)` as `C1` and `t = K1.x mod q` as `C2`,
//!   and answers every challenge for both ciphertexts.
//! - The signer verifies every round, and moves the session forward.
//!
//! ```ignore
//! let mut server = BlindSignatureServer::new(key, MemoryStore::new(), Parameters::default())?;
//! let hello = server.start(&mut OsRng, "token")?;
//!
//! let client = BlindSignatureClient::new()
//!     .with_signer_key(&hello.k1_x, &hello.k1_y)?
//!     .with_message("coin: 123456789")
//!     .with_info("user: alice")
//!     .generate_keys(&mut OsRng, &curve_order())?;
//! let payload = client.respond(&mut OsRng, &hello.b_list)?;
//!
//! let record = server.verify("token", &payload)?;
//! assert_eq!(record.step, 2);
//! ```
//!
//! Every message is plain serde data, and big integers travel as decimal strings,
//! so the messages can be sent over whatever transport the host likes.
//!
//! # Shortcomings
//!
//! Only the first two steps of the protocol are implemented. The later steps build
//! on what is kept around: the signer's record keeps the index list and the
//! ciphertexts, while the client keeps the candidate list `L`, `k2` and `K`.
mod client;
mod compat;
mod constants;
mod math;
mod messages;
pub mod paillier;
pub mod proofs;
pub mod protocol;
mod serde;
mod server;
pub mod session;

pub use client::{hash, BlindSignatureClient, KeyMaterial, ProofCommitments};
pub use compat::{
    curve_order, field_prime, generator, point_coordinates, point_from_coordinates, CURVE_A, CURVE_B,
};
pub use constants::{LENGTH_OF_I, LENGTH_OF_L, NUMBER_OF_ROUNDS, SESSION_TTL};
pub use math::{mod_inverse, next_prime, random_coprime, random_prime_in_range};
pub use messages::{ClientPayload, SignerHello, ZkEntry};
pub use server::{verify_payload, verify_rounds, BlindSignatureServer, SignerKey};
pub use session::{MemoryStore, SessionRecord, SessionStore};
