//! The user's side of the protocol.
//!
//! The client hides the hash of its message, and the value `t = K1.x mod q` tying
//! the request to the signer's key, inside two ciphertexts under its own key.
//! It then proves, round by round, that both ciphertexts were honestly formed.
//!
//! The client is a plain value: every step consumes the previous state and hands
//! back a new one, so no step can be skipped or run twice by accident.
//! ```ignore
//! let client = BlindSignatureClient::new()
//!     .with_signer_key(&hello.k1_x, &hello.k1_y)?
//!     .with_message("coin: 123456789")
//!     .with_info("user: alice")
//!     .generate_keys(&mut OsRng, &curve_order())?;
//! let payload = client.respond(&mut OsRng, &hello.b_list)?;
//! ```
use digest::Digest;
use k256::AffinePoint;
use num_bigint_dig::BigUint;
use rand_core::CryptoRngCore;
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, instrument};

use crate::{
    compat::{point_coordinates, point_from_coordinates, scalar_mul},
    constants::LENGTH_OF_L,
    math::random_coprime,
    messages::{ClientPayload, ZkEntry},
    paillier::{decrypt, encrypt, Ciphertext, Keypair, PublicKey},
    proofs::plaintext::{self, Commitment, Opening, Statement, Witness},
    protocol::{ProtocolError, ProvenValue},
    server::verify_rounds,
};

/// Hash a string to an integer, reading SHA-256 output as big endian.
///
/// This is used both for the secret message and for the shared info.
pub fn hash(message: &str) -> BigUint {
    BigUint::from_bytes_be(&Sha256::digest(message.as_bytes()))
}

/// Everything the client derives when generating its keys.
#[derive(Clone)]
struct ClientKeys {
    keypair: Keypair,
    q: BigUint,
    r1: BigUint,
    r2: BigUint,
    k2: BigUint,
    t: BigUint,
    big_k: AffinePoint,
    c1: Ciphertext,
    c2: Ciphertext,
    candidates: Vec<BigUint>,
}

/// The client's state.
#[derive(Clone, Default)]
pub struct BlindSignatureClient {
    k1: Option<AffinePoint>,
    message_hash: Option<BigUint>,
    info_hash: Option<BigUint>,
    keys: Option<ClientKeys>,
}

/// A full export of the client's key material, mostly useful for debugging.
///
/// This contains secrets, don't send it anywhere.
#[derive(Debug, Clone, Serialize)]
pub struct KeyMaterial {
    #[serde(with = "crate::serde::biguint")]
    pub p: BigUint,
    #[serde(with = "crate::serde::biguint")]
    pub k: BigUint,
    #[serde(with = "crate::serde::biguint")]
    pub k2: BigUint,
    pub public_key: PublicKey,
    #[serde(with = "crate::serde::biguint")]
    pub r1: BigUint,
    #[serde(with = "crate::serde::biguint")]
    pub r2: BigUint,
    #[serde(with = "crate::serde::biguint")]
    pub t: BigUint,
    #[serde(with = "crate::serde::biguint")]
    pub message_hash: BigUint,
    #[serde(with = "crate::serde::biguint")]
    pub info_hash: BigUint,
    pub c1: Ciphertext,
    pub c2: Ciphertext,
    #[serde(with = "crate::serde::vec_biguint")]
    pub candidates: Vec<BigUint>,
}

impl BlindSignatureClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signer's public point `K1` from its coordinates.
    pub fn with_signer_key(self, x: &BigUint, y: &BigUint) -> Result<Self, ProtocolError> {
        Ok(self.with_signer_point(point_from_coordinates(x, y)?))
    }

    /// Set the signer's public point `K1`.
    pub fn with_signer_point(self, k1: AffinePoint) -> Self {
        Self {
            k1: Some(k1),
            ..self
        }
    }

    /// Set the secret message to get signed.
    pub fn with_message(self, message: &str) -> Self {
        Self {
            message_hash: Some(hash(message)),
            ..self
        }
    }

    /// Set the info string both parties agreed on.
    pub fn with_info(self, info: &str) -> Self {
        Self {
            info_hash: Some(hash(info)),
            ..self
        }
    }

    /// Generate our keys, and encrypt the two hidden values.
    ///
    /// This needs the signer's key, the message, and the info to have been set.
    #[instrument(skip_all)]
    pub fn generate_keys(
        self,
        rng: &mut impl CryptoRngCore,
        q: &BigUint,
    ) -> Result<Self, ProtocolError> {
        if self.keys.is_some() {
            return Err(ProtocolError::KeysAlreadyGenerated);
        }
        let k1 = self.k1.ok_or(ProtocolError::MissingSignerKey)?;
        let message_hash = self
            .message_hash
            .as_ref()
            .ok_or(ProtocolError::MissingMessageHash)?;
        if self.info_hash.is_none() {
            return Err(ProtocolError::MissingInfoHash);
        }

        let keypair = Keypair::generate(&mut *rng, q)?;
        let n_squared = keypair.public.n_squared();
        let r1 = random_coprime(&mut *rng, &n_squared);
        let r2 = random_coprime(&mut *rng, &n_squared);
        let k2 = random_coprime(&mut *rng, q);

        let (k1_x, _) = point_coordinates(&k1);
        let t = k1_x % q;
        let big_k = scalar_mul(&k1, &k2);

        let c1 = encrypt(&keypair.public, message_hash, &r1, q)?;
        let c2 = encrypt(&keypair.public, &t, &r2, q)?;

        let phi = keypair.private.phi();
        let bound = &phi * &phi;
        let candidates = (0..LENGTH_OF_L)
            .map(|_| random_coprime(&mut *rng, &bound))
            .collect();
        debug!(bits = keypair.public.n.bits(), "client keys generated");

        Ok(Self {
            keys: Some(ClientKeys {
                keypair,
                q: q.clone(),
                r1,
                r2,
                k2,
                t,
                big_k,
                c1,
                c2,
                candidates,
            }),
            ..self
        })
    }

    fn keys(&self) -> Result<&ClientKeys, ProtocolError> {
        self.keys.as_ref().ok_or(ProtocolError::KeysNotGenerated)
    }

    /// Build the commitments for `rounds` proof rounds, for both ciphertexts.
    #[instrument(skip(self, rng))]
    pub fn commit_proofs(
        &self,
        rng: &mut impl CryptoRngCore,
        rounds: usize,
    ) -> Result<ProofCommitments, ProtocolError> {
        let keys = self.keys()?;
        let message_hash = self
            .message_hash
            .as_ref()
            .ok_or(ProtocolError::MissingMessageHash)?;
        let public = &keys.keypair.public;

        let mut commit_all = |ciphertext: &Ciphertext, m: &BigUint, r: &BigUint| {
            let statement = Statement {
                public,
                ciphertext,
                q: &keys.q,
            };
            (0..rounds)
                .map(|_| plaintext::commit(&mut *rng, statement, Witness { m, r }))
                .collect::<Result<Vec<_>, _>>()
        };
        let message = commit_all(&keys.c1, message_hash, &keys.r1)?;
        let signer_key = commit_all(&keys.c2, &keys.t, &keys.r2)?;

        Ok(ProofCommitments {
            message,
            signer_key,
        })
    }

    /// Answer the signer's challenge bits, bundling everything it needs to verify.
    pub fn respond(
        &self,
        rng: &mut impl CryptoRngCore,
        b_list: &[u8],
    ) -> Result<ClientPayload, ProtocolError> {
        let keys = self.keys()?;
        let proofs = self.commit_proofs(rng, b_list.len())?;
        let (zk_proof_c1_list, zk_proof_c2_list) = proofs.reveal_all(b_list)?;
        let public = &keys.keypair.public;
        Ok(ClientPayload {
            n: public.n.clone(),
            g: public.g.clone(),
            c1: keys.c1.clone(),
            c2: keys.c2.clone(),
            zk_proof_c1_list,
            zk_proof_c2_list,
        })
    }

    /// Run the signer's checks on our own payload before sending it.
    pub fn check_payload(
        &self,
        payload: &ClientPayload,
        b_list: &[u8],
    ) -> Result<(), ProtocolError> {
        let keys = self.keys()?;
        let public = &keys.keypair.public;
        verify_rounds(
            public,
            &keys.q,
            &keys.c1,
            b_list,
            &payload.zk_proof_c1_list,
            ProvenValue::Message,
        )?;
        verify_rounds(
            public,
            &keys.q,
            &keys.c2,
            b_list,
            &payload.zk_proof_c2_list,
            ProvenValue::SignerKey,
        )
    }

    /// Decrypt a ciphertext under our key.
    pub fn decrypt(&self, c: &Ciphertext) -> Result<BigUint, ProtocolError> {
        decrypt(&self.keys()?.keypair.private, c)
    }

    pub fn public_key(&self) -> Result<&PublicKey, ProtocolError> {
        Ok(&self.keys()?.keypair.public)
    }

    /// The point `K = k2 * K1`.
    pub fn blinded_point(&self) -> Result<AffinePoint, ProtocolError> {
        Ok(self.keys()?.big_k)
    }

    /// The candidate list L, for the later reveal steps.
    pub fn candidate_list(&self) -> Result<&[BigUint], ProtocolError> {
        Ok(&self.keys()?.candidates)
    }

    /// The ciphertexts `C1` and `C2`.
    pub fn ciphertexts(&self) -> Result<(&Ciphertext, &Ciphertext), ProtocolError> {
        let keys = self.keys()?;
        Ok((&keys.c1, &keys.c2))
    }

    pub fn key_material(&self) -> Result<KeyMaterial, ProtocolError> {
        let keys = self.keys()?;
        let message_hash = self
            .message_hash
            .clone()
            .ok_or(ProtocolError::MissingMessageHash)?;
        let info_hash = self.info_hash.clone().ok_or(ProtocolError::MissingInfoHash)?;
        Ok(KeyMaterial {
            p: keys.keypair.private.p.clone(),
            k: keys.keypair.private.k.clone(),
            k2: keys.k2.clone(),
            public_key: keys.keypair.public.clone(),
            r1: keys.r1.clone(),
            r2: keys.r2.clone(),
            t: keys.t.clone(),
            message_hash,
            info_hash,
            c1: keys.c1.clone(),
            c2: keys.c2.clone(),
            candidates: keys.candidates.clone(),
        })
    }
}

/// The commitments for every proof round, along with what's needed to answer them.
#[derive(Clone)]
pub struct ProofCommitments {
    message: Vec<(Commitment, Opening)>,
    signer_key: Vec<(Commitment, Opening)>,
}

impl ProofCommitments {
    fn rounds(&self, value: ProvenValue) -> &[(Commitment, Opening)] {
        match value {
            ProvenValue::Message => &self.message,
            ProvenValue::SignerKey => &self.signer_key,
        }
    }

    /// The commitments for one of the ciphertexts, in round order.
    pub fn commitments(&self, value: ProvenValue) -> Vec<Commitment> {
        self.rounds(value).iter().map(|(c, _)| c.clone()).collect()
    }

    /// Answer the challenge for a single round.
    pub fn reveal(
        &self,
        value: ProvenValue,
        round: usize,
        challenge: u8,
    ) -> Result<ZkEntry, ProtocolError> {
        let (commitment, opening) = self.rounds(value).get(round).ok_or_else(|| {
            ProtocolError::MalformedPayload(format!("no proof round {} for {}", round, value))
        })?;
        Ok(ZkEntry::new(commitment.clone(), opening.respond(challenge)?))
    }

    /// Answer every round, for both ciphertexts.
    pub fn reveal_all(
        &self,
        b_list: &[u8],
    ) -> Result<(Vec<ZkEntry>, Vec<ZkEntry>), ProtocolError> {
        if b_list.len() != self.message.len() {
            return Err(ProtocolError::MalformedPayload(format!(
                "expected {} challenge bits, found {}",
                self.message.len(),
                b_list.len()
            )));
        }
        let reveal_value = |value| {
            b_list
                .iter()
                .enumerate()
                .map(|(i, b)| self.reveal(value, i, *b))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok((
            reveal_value(ProvenValue::Message)?,
            reveal_value(ProvenValue::SignerKey)?,
        ))
    }
}

#[cfg(test)]
mod test {
    use k256::{ProjectivePoint, Scalar};
    use num_integer::Integer;
    use num_traits::One;
    use rand_core::OsRng;

    use super::*;
    use crate::{
        compat::{curve_order, scalar_from_biguint},
        session::challenge_bits,
    };

    fn signer_point() -> AffinePoint {
        (ProjectivePoint::GENERATOR * Scalar::from(123456789u64)).to_affine()
    }

    fn ready_client() -> Result<BlindSignatureClient, ProtocolError> {
        BlindSignatureClient::new()
            .with_signer_point(signer_point())
            .with_message("coin: 123456789")
            .with_info("user: alice")
            .generate_keys(&mut OsRng, &curve_order())
    }

    #[test]
    fn test_hash_is_sha256() {
        let expected = BigUint::parse_bytes(
            b"86861427450967576864219521175659183099775378321583402848299294835747922235018",
            10,
        )
        .unwrap();
        assert_eq!(hash("coin: 123456789"), expected);
    }

    #[test]
    fn test_keygen_preconditions() {
        let q = curve_order();
        let missing_key = BlindSignatureClient::new()
            .with_message("m")
            .with_info("i")
            .generate_keys(&mut OsRng, &q);
        assert!(matches!(missing_key, Err(ProtocolError::MissingSignerKey)));

        let missing_message = BlindSignatureClient::new()
            .with_signer_point(signer_point())
            .with_info("i")
            .generate_keys(&mut OsRng, &q);
        assert!(matches!(
            missing_message,
            Err(ProtocolError::MissingMessageHash)
        ));

        let missing_info = BlindSignatureClient::new()
            .with_signer_point(signer_point())
            .with_message("m")
            .generate_keys(&mut OsRng, &q);
        assert!(matches!(missing_info, Err(ProtocolError::MissingInfoHash)));

        assert!(matches!(
            BlindSignatureClient::new().commit_proofs(&mut OsRng, 1),
            Err(ProtocolError::KeysNotGenerated)
        ));
    }

    #[test]
    fn test_keys_cannot_be_regenerated() -> Result<(), ProtocolError> {
        let client = ready_client()?;
        assert!(matches!(
            client.generate_keys(&mut OsRng, &curve_order()),
            Err(ProtocolError::KeysAlreadyGenerated)
        ));
        Ok(())
    }

    #[test]
    fn test_key_material_is_consistent() -> Result<(), ProtocolError> {
        let client = ready_client()?;
        let q = curve_order();
        let material = client.key_material()?;

        let (k1_x, _) = point_coordinates(&signer_point());
        assert_eq!(material.t, &k1_x % &q);
        assert_eq!(material.message_hash, hash("coin: 123456789"));
        assert_eq!(material.info_hash, hash("user: alice"));
        assert_eq!(client.decrypt(&material.c1)?, material.message_hash);
        assert_eq!(client.decrypt(&material.c2)?, material.t);

        let n_squared = material.public_key.n_squared();
        assert!(material.r1.gcd(&n_squared).is_one());
        assert!(material.r2.gcd(&n_squared).is_one());
        assert!(material.k2.gcd(&q).is_one());

        let expected_k = (ProjectivePoint::from(signer_point()) * scalar_from_biguint(&material.k2))
            .to_affine();
        assert_eq!(client.blinded_point()?, expected_k);

        let phi = (&material.p - 1u32) * (&q - 1u32) * (&material.k - 1u32);
        let bound = &phi * &phi;
        assert_eq!(material.candidates.len(), LENGTH_OF_L);
        assert!(material
            .candidates
            .iter()
            .all(|l| *l < bound && l.gcd(&bound).is_one()));
        Ok(())
    }

    #[test]
    fn test_key_material_exports_decimal_strings() -> Result<(), Box<dyn std::error::Error>> {
        let client = ready_client()?;
        let material = client.key_material()?;
        let json = serde_json::to_value(&material)?;

        let candidates = json["candidates"].as_array().ok_or("candidates missing")?;
        assert_eq!(candidates.len(), LENGTH_OF_L);
        assert_eq!(
            candidates[0],
            serde_json::Value::String(material.candidates[0].to_str_radix(10))
        );
        assert_eq!(json["public_key"]["N"], material.public_key.n.to_str_radix(10));
        Ok(())
    }

    #[test]
    fn test_payload_passes_own_checks() -> Result<(), ProtocolError> {
        let client = ready_client()?;
        let b_list = challenge_bits(&mut OsRng, 20);
        let payload = client.respond(&mut OsRng, &b_list)?;

        assert_eq!(payload.zk_proof_c1_list.len(), 20);
        assert_eq!(payload.zk_proof_c2_list.len(), 20);
        for (entry, b) in payload.zk_proof_c1_list.iter().zip(&b_list) {
            assert_eq!(entry.x.is_some(), *b == 0);
            assert_eq!(entry.xp.is_some(), *b == 1);
        }
        client.check_payload(&payload, &b_list)
    }

    #[test]
    fn test_reveal_rejects_bad_bits_and_rounds() -> Result<(), ProtocolError> {
        let client = ready_client()?;
        let proofs = client.commit_proofs(&mut OsRng, 3)?;
        assert_eq!(proofs.commitments(ProvenValue::Message).len(), 3);
        assert!(matches!(
            proofs.reveal(ProvenValue::Message, 0, 2),
            Err(ProtocolError::InvalidChallengeBit(2))
        ));
        assert!(matches!(
            proofs.reveal(ProvenValue::SignerKey, 3, 0),
            Err(ProtocolError::MalformedPayload(_))
        ));
        assert!(matches!(
            proofs.reveal_all(&[0, 1]),
            Err(ProtocolError::MalformedPayload(_))
        ));
        Ok(())
    }
}
