//! A cut-and-choose proof that a ciphertext was honestly formed.
//!
//! The prover knows `(m, r)` such that `C = Enc(m, r)`. In each round it commits to
//! a fresh encryption `Cp = Enc(x, r')`, and the verifier answers with a bit:
//!
//! - On 0, the prover opens `Cp` by revealing `(x, r')`.
//! - On 1, the prover reveals `(x', r'') = (m + x mod q, r * r' mod N^2)`, which
//!   the verifier checks against `C * Cp` using the homomorphism.
//!
//! Neither opening alone reveals `m`, and a prover who can answer both bits
//! for the same commitment must know an opening of `C`. Each round halves the
//! chances of a cheating prover.
use num_bigint_dig::BigUint;
use num_traits::Zero;
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;

use crate::{
    math::random_nonzero_below,
    paillier::{encrypt, Ciphertext, PublicKey},
    protocol::ProtocolError,
};

/// The public statement for this proof.
///
/// This statement claims knowledge of the plaintext and randomness behind a ciphertext.
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    pub public: &'a PublicKey,
    pub ciphertext: &'a Ciphertext,
    /// The plaintext modulus.
    pub q: &'a BigUint,
}

/// The private witness for this proof.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub m: &'a BigUint,
    pub r: &'a BigUint,
}

/// The first message of a round, sent to the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub cp: Ciphertext,
}

/// What the prover keeps between committing and answering a challenge.
///
/// Both possible answers are computed up front.
#[derive(Clone)]
pub struct Opening {
    x: BigUint,
    r_prime: BigUint,
    x_prime: BigUint,
    r_prime_prime: BigUint,
}

/// The answer to a challenge bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The opening of the commitment itself, for challenge 0.
    Mask { x: BigUint, rp: BigUint },
    /// The opening of `C * Cp`, for challenge 1.
    Shifted { xp: BigUint, rpp: BigUint },
}

/// Start a round of the proof.
pub fn commit(
    rng: &mut impl CryptoRngCore,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Result<(Commitment, Opening), ProtocolError> {
    let n_squared = statement.public.n_squared();
    // Both x and m + x have to be encryptable, i.e. non-zero mod q.
    let (x, x_prime) = loop {
        let x = random_nonzero_below(&mut *rng, statement.q);
        let x_prime = (witness.m + &x) % statement.q;
        if !x_prime.is_zero() {
            break (x, x_prime);
        }
    };
    let r_prime = statement.public.random_blinding(&mut *rng);
    let cp = encrypt(statement.public, &x, &r_prime, statement.q)?;
    let r_prime_prime = (witness.r * &r_prime) % n_squared;

    Ok((
        Commitment { cp },
        Opening {
            x,
            r_prime,
            x_prime,
            r_prime_prime,
        },
    ))
}

impl Opening {
    /// Answer a challenge bit.
    pub fn respond(&self, challenge: u8) -> Result<Response, ProtocolError> {
        match challenge {
            0 => Ok(Response::Mask {
                x: self.x.clone(),
                rp: self.r_prime.clone(),
            }),
            1 => Ok(Response::Shifted {
                xp: self.x_prime.clone(),
                rpp: self.r_prime_prime.clone(),
            }),
            b => Err(ProtocolError::InvalidChallengeBit(b)),
        }
    }
}

/// Verify one round of the proof.
///
/// A response that doesn't match the challenge, or that can't even be encrypted,
/// simply fails to verify.
pub fn verify(
    statement: Statement<'_>,
    commitment: &Commitment,
    challenge: u8,
    response: &Response,
) -> Result<bool, ProtocolError> {
    let public = statement.public;
    let (expected, actual) = match (challenge, response) {
        (0, Response::Mask { x, rp }) => match encrypt(public, x, rp, statement.q) {
            Ok(c) => (commitment.cp.clone(), c),
            Err(_) => return Ok(false),
        },
        (1, Response::Shifted { xp, rpp }) => match encrypt(public, xp, rpp, statement.q) {
            Ok(c) => (statement.ciphertext.add(&commitment.cp, public), c),
            Err(_) => return Ok(false),
        },
        (0 | 1, _) => return Ok(false),
        (b, _) => return Err(ProtocolError::InvalidChallengeBit(b)),
    };
    let ok = expected
        .to_fixed_bytes(public)
        .ct_eq(&actual.to_fixed_bytes(public));
    Ok(ok.into())
}

#[cfg(test)]
mod test {
    use num_traits::One;
    use rand_core::OsRng;

    use super::*;
    use crate::{
        compat::curve_order,
        math::random_prime_in_range,
        paillier::Keypair,
    };

    fn setup(q: &BigUint) -> (Keypair, BigUint, BigUint, Ciphertext) {
        let keys = Keypair::generate(&mut OsRng, q).unwrap();
        let m = random_nonzero_below(&mut OsRng, q);
        let r = keys.public.random_blinding(&mut OsRng);
        let c = encrypt(&keys.public, &m, &r, q).unwrap();
        (keys, m, r, c)
    }

    #[test]
    fn test_honest_rounds_verify_for_both_bits() -> Result<(), ProtocolError> {
        let q = curve_order();
        let (keys, m, r, c) = setup(&q);
        let statement = Statement {
            public: &keys.public,
            ciphertext: &c,
            q: &q,
        };
        for _ in 0..4 {
            let (commitment, opening) = commit(&mut OsRng, statement, Witness { m: &m, r: &r })?;
            for b in [0, 1] {
                let response = opening.respond(b)?;
                assert!(verify(statement, &commitment, b, &response)?);
            }
        }
        Ok(())
    }

    #[test]
    fn test_corrupted_responses_fail() -> Result<(), ProtocolError> {
        let q = random_prime_in_range(&mut OsRng, &(BigUint::one() << 64), &(BigUint::one() << 65));
        let (keys, m, r, c) = setup(&q);
        let statement = Statement {
            public: &keys.public,
            ciphertext: &c,
            q: &q,
        };
        let (commitment, opening) = commit(&mut OsRng, statement, Witness { m: &m, r: &r })?;

        let corrupted = match opening.respond(0)? {
            Response::Mask { x, rp } => vec![
                Response::Mask {
                    x: &x + 1u32,
                    rp: rp.clone(),
                },
                Response::Mask { x, rp: rp + 1u32 },
            ],
            _ => unreachable!(),
        };
        for response in &corrupted {
            assert!(!verify(statement, &commitment, 0, response)?);
        }

        let corrupted = match opening.respond(1)? {
            Response::Shifted { xp, rpp } => vec![
                Response::Shifted {
                    xp: &xp + 1u32,
                    rpp: rpp.clone(),
                },
                Response::Shifted { xp, rpp: rpp + 1u32 },
            ],
            _ => unreachable!(),
        };
        for response in &corrupted {
            assert!(!verify(statement, &commitment, 1, response)?);
        }
        Ok(())
    }

    #[test]
    fn test_mismatched_response_fails() -> Result<(), ProtocolError> {
        let q = curve_order();
        let (keys, m, r, c) = setup(&q);
        let statement = Statement {
            public: &keys.public,
            ciphertext: &c,
            q: &q,
        };
        let (commitment, opening) = commit(&mut OsRng, statement, Witness { m: &m, r: &r })?;
        assert!(!verify(statement, &commitment, 1, &opening.respond(0)?)?);
        assert!(!verify(statement, &commitment, 0, &opening.respond(1)?)?);
        Ok(())
    }

    #[test]
    fn test_invalid_challenge_bit() -> Result<(), ProtocolError> {
        let q = curve_order();
        let (keys, m, r, c) = setup(&q);
        let statement = Statement {
            public: &keys.public,
            ciphertext: &c,
            q: &q,
        };
        let (commitment, opening) = commit(&mut OsRng, statement, Witness { m: &m, r: &r })?;
        assert!(matches!(
            opening.respond(2),
            Err(ProtocolError::InvalidChallengeBit(2))
        ));
        let response = opening.respond(0)?;
        assert!(matches!(
            verify(statement, &commitment, 7, &response),
            Err(ProtocolError::InvalidChallengeBit(7))
        ));
        Ok(())
    }
}
