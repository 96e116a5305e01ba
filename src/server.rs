//! The signer's side of the protocol.
//!
//! The signer holds no per-session state of its own: everything lives in a
//! [SessionStore], keyed by an opaque token the host hands us. Each call loads
//! the record, moves it forward, and writes it back with a fresh expiry.
//!
//! A session goes through these steps:
//!
//! 1. [BlindSignatureServer::start] creates the record and sends `K1` along with
//!    the challenge bits.
//! 2. [BlindSignatureServer::verify] checks the client's proofs for `C1` and `C2`.
//!    On success the record moves to step 2. On failure it is deleted, so the same
//!    challenge bits can never be answered twice.
use elliptic_curve::sec1::ToEncodedPoint;
use k256::{ecdsa::SigningKey, pkcs8::DecodePublicKey, AffinePoint};
use num_bigint_dig::BigUint;
use num_traits::Zero;
use rand_core::CryptoRngCore;
use tracing::{error, info, instrument, warn};

use crate::{
    compat::{curve_order, point_coordinates},
    messages::{ClientPayload, SignerHello, ZkEntry},
    paillier::{Ciphertext, PublicKey},
    proofs::plaintext::{self, Statement},
    protocol::{InitializationError, Parameters, ProtocolError, ProvenValue},
    session::{delete_record, load_record, record_exists, save_record, SessionRecord, SessionStore},
};

/// The signer's long-term public point `K1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerKey {
    point: AffinePoint,
}

impl SignerKey {
    pub fn from_public_key(key: &k256::PublicKey) -> Self {
        Self {
            point: *key.as_affine(),
        }
    }

    pub fn from_signing_key(key: &SigningKey) -> Self {
        Self {
            point: *key.verifying_key().as_affine(),
        }
    }

    /// Parse a secp256k1 public key from a PEM encoded SubjectPublicKeyInfo.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, ProtocolError> {
        let key = k256::PublicKey::from_public_key_pem(pem)
            .map_err(|_| ProtocolError::InvalidSignerKey)?;
        Ok(Self::from_public_key(&key))
    }

    pub fn point(&self) -> AffinePoint {
        self.point
    }

    /// The affine coordinates `(x, y)` of `K1`.
    pub fn coordinates(&self) -> (BigUint, BigUint) {
        point_coordinates(&self.point)
    }

    /// The SEC1 uncompressed encoding of `K1`.
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.point.to_encoded_point(false).as_bytes().to_vec()
    }
}

/// The signer, driving sessions stored in `S`.
pub struct BlindSignatureServer<S> {
    key: SignerKey,
    store: S,
    params: Parameters,
    q: BigUint,
}

impl<S: SessionStore> BlindSignatureServer<S> {
    pub fn new(key: SignerKey, store: S, params: Parameters) -> Result<Self, InitializationError> {
        params.validate()?;
        Ok(Self {
            key,
            store,
            params,
            q: curve_order(),
        })
    }

    pub fn key(&self) -> &SignerKey {
        &self.key
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Begin a session, or resume the one already stored for this token.
    ///
    /// Resuming hands back the same challenge bits, and refreshes the expiry.
    #[instrument(skip_all)]
    pub fn start(
        &mut self,
        rng: &mut impl CryptoRngCore,
        token: &str,
    ) -> Result<SignerHello, ProtocolError> {
        let record = match load_record(&self.store, token)? {
            Some(record) => {
                info!(step = record.step, "resuming session");
                record
            }
            None => {
                info!("starting session");
                SessionRecord::new(rng, &self.params)
            }
        };
        save_record(&mut self.store, token, &record, self.params.session_ttl)?;

        let (k1_x, k1_y) = self.key.coordinates();
        Ok(SignerHello {
            k1_x,
            k1_y,
            b_list: record.b_list,
        })
    }

    /// Load the live record for a token.
    pub fn session(&self, token: &str) -> Result<SessionRecord, ProtocolError> {
        match load_record(&self.store, token)? {
            Some(record) => Ok(record),
            None => {
                warn!("session expired or unknown");
                Err(ProtocolError::SessionExpiredOrUnknown)
            }
        }
    }

    /// Check whether a token currently has a live session.
    pub fn has_session(&self, token: &str) -> Result<bool, ProtocolError> {
        record_exists(&self.store, token)
    }

    /// Verify the client's payload, moving the session to step 2.
    ///
    /// Any failure aborts the session.
    #[instrument(skip_all)]
    pub fn verify(
        &mut self,
        token: &str,
        payload: &ClientPayload,
    ) -> Result<SessionRecord, ProtocolError> {
        let mut record = self.session(token)?;
        if record.step != 1 {
            return Err(ProtocolError::UnexpectedStep {
                expected: 1,
                found: record.step,
            });
        }
        record.c1 = Some(payload.c1.clone());
        record.c2 = Some(payload.c2.clone());
        record.public_key = Some(payload.public_key());

        if let Err(e) = verify_payload(&record, payload, &self.q) {
            delete_record(&mut self.store, token)?;
            return Err(e);
        }
        info!("proofs verified");
        self.save_and_advance(token, record)
    }

    /// Bump the step of a record and store it with a fresh expiry.
    pub fn save_and_advance(
        &mut self,
        token: &str,
        mut record: SessionRecord,
    ) -> Result<SessionRecord, ProtocolError> {
        record.step += 1;
        save_record(&mut self.store, token, &record, self.params.session_ttl)?;
        Ok(record)
    }

    /// Drop a session once the host is done with it.
    pub fn finish(&mut self, token: &str) -> Result<(), ProtocolError> {
        delete_record(&mut self.store, token)
    }
}

/// Verify both proof lists of a payload against the challenge bits in a record.
pub fn verify_payload(
    record: &SessionRecord,
    payload: &ClientPayload,
    q: &BigUint,
) -> Result<(), ProtocolError> {
    let public = payload.public_key();
    verify_rounds(
        &public,
        q,
        &payload.c1,
        &record.b_list,
        &payload.zk_proof_c1_list,
        ProvenValue::Message,
    )?;
    verify_rounds(
        &public,
        q,
        &payload.c2,
        &record.b_list,
        &payload.zk_proof_c2_list,
        ProvenValue::SignerKey,
    )
}

/// Check the shape of a client key: `N = p * q * k` with `p * k > 1`, and `g` in `[1, N^2)`.
fn check_public_key(public: &PublicKey, q: &BigUint) -> Result<(), ProtocolError> {
    if public.n <= *q || !(&public.n % q).is_zero() {
        return Err(ProtocolError::MalformedPayload(
            "public key modulus must be a proper multiple of q".to_string(),
        ));
    }
    if public.g.is_zero() || public.g >= public.n_squared() {
        return Err(ProtocolError::MalformedPayload(
            "public key generator must lie in [1, N^2)".to_string(),
        ));
    }
    Ok(())
}

/// Ciphertexts must lie in `[1, N^2)`, so that each one has a single encoding.
fn check_ciphertext(
    c: &Ciphertext,
    n_squared: &BigUint,
    value: ProvenValue,
) -> Result<(), ProtocolError> {
    if c.0.is_zero() || c.0 >= *n_squared {
        return Err(ProtocolError::MalformedPayload(format!(
            "ciphertext for {} must lie in [1, N^2)",
            value
        )));
    }
    Ok(())
}

/// Verify every round of the proof for one ciphertext, stopping at the first failure.
pub fn verify_rounds(
    public: &PublicKey,
    q: &BigUint,
    ciphertext: &Ciphertext,
    b_list: &[u8],
    entries: &[ZkEntry],
    value: ProvenValue,
) -> Result<(), ProtocolError> {
    if entries.len() != b_list.len() {
        return Err(ProtocolError::MalformedPayload(format!(
            "expected {} proof rounds for {}, found {}",
            b_list.len(),
            value,
            entries.len()
        )));
    }
    check_public_key(public, q)?;
    let n_squared = public.n_squared();
    check_ciphertext(ciphertext, &n_squared, value)?;
    for entry in entries {
        check_ciphertext(&entry.cp, &n_squared, value)?;
    }
    let statement = Statement {
        public,
        ciphertext,
        q,
    };
    for (round, (entry, b)) in entries.iter().zip(b_list).enumerate() {
        let ok = match entry.response() {
            Some(response) => plaintext::verify(statement, &entry.commitment(), *b, &response)?,
            None => false,
        };
        if !ok {
            error!(%value, round, "proof round failed");
            return Err(ProtocolError::ZkProofVerificationFailed { value, round });
        }
    }
    Ok(())
}
