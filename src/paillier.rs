//! A modified Paillier cryptosystem with plaintexts modulo a prime `q`.
//!
//! The modulus is `N = p * q * k`, where `q` is public (we use the order of secp256k1),
//! and `p, k` are the private key. The generator is `g = (1 + N)^(p * k) mod N^2`,
//! which has order `q`, so that plaintexts are naturally reduced modulo `q`.
//!
//! Encryption is `C = g^m * r^N mod N^2`, and the scheme is additively homomorphic:
//! ```ignore
//! Enc(a, r) * Enc(x, r') = Enc(a + x mod q, r * r' mod N^2)
//! ```
//! Encryption only needs public values, which lets a verifier recompute ciphertexts
//! from revealed randomness without ever holding the private key.
use num_bigint_dig::{prime::probably_prime, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    constants::PRIMALITY_REPS,
    math::{mod_inverse, random_coprime, random_prime_in_range},
    protocol::ProtocolError,
};

/// The public key of the scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(rename = "N", with = "crate::serde::biguint")]
    pub n: BigUint,
    #[serde(rename = "g", with = "crate::serde::biguint")]
    pub g: BigUint,
}

impl PublicKey {
    pub fn new(n: BigUint, g: BigUint) -> Self {
        Self { n, g }
    }

    /// The modulus ciphertexts live in.
    pub fn n_squared(&self) -> BigUint {
        &self.n * &self.n
    }

    /// Sample a blinding factor suitable for encryption under this key.
    pub fn random_blinding(&self, rng: &mut impl CryptoRngCore) -> BigUint {
        random_coprime(rng, &self.n_squared())
    }
}

/// The private key of the scheme.
///
/// Decryption also needs `q` and `N`, so we keep them alongside the secret primes.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub p: BigUint,
    pub k: BigUint,
    pub q: BigUint,
    pub n: BigUint,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("q", &self.q)
            .field("n", &self.n)
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Euler's totient of `N`, i.e. `(p - 1)(q - 1)(k - 1)`.
    pub fn phi(&self) -> BigUint {
        (&self.p - 1u32) * (&self.q - 1u32) * (&self.k - 1u32)
    }
}

/// A freshly generated key pair.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl Keypair {
    /// Generate a key pair for plaintexts modulo the prime `q`.
    ///
    /// The primes `p, k` are drawn from `(0, 2q)`, distinct from each other and from `q`,
    /// and such that neither `p - 1` nor `k - 1` is divisible by `q`. This last
    /// condition is what makes `(p - 1)(q - 1)(k - 1)` invertible modulo `q`.
    ///
    /// `q` must be an odd prime; zero is reported as a missing curve order.
    pub fn generate(rng: &mut impl CryptoRngCore, q: &BigUint) -> Result<Self, ProtocolError> {
        if q.is_zero() {
            return Err(ProtocolError::MissingCurveOrder);
        }
        // Below 3 there is no pair of primes satisfying the constraints.
        if *q < BigUint::from(3u32) || !probably_prime(q, PRIMALITY_REPS) {
            return Err(ProtocolError::InvalidCurveOrder);
        }
        let p = sample_prime_factor(&mut *rng, q, &[])?;
        let k = sample_prime_factor(&mut *rng, q, &[&p])?;

        let n = &p * q * &k;
        let n_squared = &n * &n;
        let g = (&n + 1u32).modpow(&(&p * &k), &n_squared);

        Ok(Self {
            private: PrivateKey {
                p,
                k,
                q: q.clone(),
                n: n.clone(),
            },
            public: PublicKey { n, g },
        })
    }
}

/// Sample a prime in `(0, 2q)` which differs from `q` and everything in `avoid`,
/// and such that `gcd(prime - 1, q) = 1`.
fn sample_prime_factor(
    rng: &mut impl CryptoRngCore,
    q: &BigUint,
    avoid: &[&BigUint],
) -> Result<BigUint, ProtocolError> {
    let min = BigUint::zero();
    let max = q << 1;
    loop {
        let candidate = random_prime_in_range(&mut *rng, &min, &max);
        if candidate == *q || avoid.iter().any(|x| **x == candidate) {
            continue;
        }
        if (&candidate - 1u32).gcd(q).is_one() {
            return Ok(candidate);
        }
    }
}

/// A ciphertext, living in `[0, N^2)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(#[serde(with = "crate::serde::biguint")] pub BigUint);

impl Ciphertext {
    /// Add the plaintexts of two ciphertexts under the same key.
    pub fn add(&self, other: &Self, public: &PublicKey) -> Self {
        Self((&self.0 * &other.0) % public.n_squared())
    }

    /// Big endian bytes, padded to the width of `N^2`.
    pub(crate) fn to_fixed_bytes(&self, public: &PublicKey) -> Vec<u8> {
        let width = (public.n_squared().bits() + 7) / 8;
        let bytes = self.0.to_bytes_be();
        let mut out = vec![0u8; width.saturating_sub(bytes.len())];
        out.extend_from_slice(&bytes);
        out
    }
}

/// Encrypt a plaintext `0 < m <= q` with the blinding factor `r`.
///
/// The two exponentiations are reduced separately before multiplying, which keeps
/// intermediate values below `N^4`.
pub fn encrypt(
    public: &PublicKey,
    m: &BigUint,
    r: &BigUint,
    q: &BigUint,
) -> Result<Ciphertext, ProtocolError> {
    if public.n.is_zero() || public.g.is_zero() || r.is_zero() {
        return Err(ProtocolError::InvalidPublicKeyOrRandomness);
    }
    if m.is_zero() {
        return Err(ProtocolError::MessageFormatError);
    }
    if q.is_zero() {
        return Err(ProtocolError::MissingCurveOrder);
    }
    if m > q {
        return Err(ProtocolError::MessageTooLarge);
    }
    let n_squared = public.n_squared();
    let g_m = public.g.modpow(m, &n_squared);
    let r_n = r.modpow(&public.n, &n_squared);
    Ok(Ciphertext((g_m * r_n) % n_squared))
}

/// Decrypt a ciphertext, recovering its plaintext in `(0, q]`.
///
/// Plaintexts are only defined modulo `q`; a residue of 0 is reported as `q`,
/// since 0 itself can never be encrypted.
pub fn decrypt(private: &PrivateKey, c: &Ciphertext) -> Result<BigUint, ProtocolError> {
    if private.p.is_zero() || private.k.is_zero() || private.q.is_zero() || private.n.is_zero() {
        return Err(ProtocolError::InvalidKeyOrCiphertext);
    }
    if c.0.is_zero() {
        return Err(ProtocolError::InvalidKeyOrCiphertext);
    }
    let n_squared = &private.n * &private.n;
    let lambda = private.phi();
    let d = c.0.modpow(&lambda, &n_squared);
    if d.is_zero() {
        return Err(ProtocolError::InvalidKeyOrCiphertext);
    }
    let l = (d - 1u32) / (&private.n * &private.p * &private.k);
    let lambda_inv =
        mod_inverse(&lambda, &private.q).ok_or(ProtocolError::InvalidKeyOrCiphertext)?;
    let m = (l * lambda_inv) % &private.q;
    if m.is_zero() {
        return Ok(private.q.clone());
    }
    Ok(m)
}

/// Encrypt a string, read as a big endian integer.
pub fn encrypt_str(
    public: &PublicKey,
    m: &str,
    r: &BigUint,
    q: &BigUint,
) -> Result<Ciphertext, ProtocolError> {
    encrypt(public, &BigUint::from_bytes_be(m.as_bytes()), r, q)
}

/// Decrypt a ciphertext produced by [encrypt_str].
pub fn decrypt_str(private: &PrivateKey, c: &Ciphertext) -> Result<String, ProtocolError> {
    let m = decrypt(private, c)?;
    String::from_utf8(m.to_bytes_be()).map_err(|_| ProtocolError::PlaintextNotUtf8)
}
