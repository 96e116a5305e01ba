use num_bigint_dig::{prime::probably_prime, BigUint, ModInverse, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;

use crate::constants::PRIMALITY_REPS;

/// Sample a value in `[0, n)` that is coprime to `n`.
///
/// This resamples from scratch until a coprime value comes up, so the output
/// is uniform over the units modulo `n`.
///
/// `n` **must** be non-zero.
pub fn random_coprime(rng: &mut impl CryptoRngCore, n: &BigUint) -> BigUint {
    loop {
        let candidate = rng.gen_biguint_below(n);
        if candidate.gcd(n).is_one() {
            return candidate;
        }
    }
}

/// Sample a value in `[1, n)`.
///
/// `n` **must** be larger than 1.
pub fn random_nonzero_below(rng: &mut impl CryptoRngCore, n: &BigUint) -> BigUint {
    rng.gen_biguint_range(&BigUint::one(), n)
}

/// Find the smallest prime strictly larger than `n`.
pub fn next_prime(n: &BigUint) -> BigUint {
    let two = BigUint::from(2u32);
    if *n < two {
        return two;
    }
    let mut candidate = n + 1u32;
    if candidate.is_even() {
        candidate += 1u32;
    }
    while !probably_prime(&candidate, PRIMALITY_REPS) {
        candidate += 2u32;
    }
    candidate
}

/// Sample a prime `p` with `min < p < max`.
///
/// We draw a random starting point in `[min, max)` and take the next prime after it,
/// starting over whenever that prime falls outside the range.
///
/// The range **must** contain a prime, otherwise this never returns.
pub fn random_prime_in_range(rng: &mut impl CryptoRngCore, min: &BigUint, max: &BigUint) -> BigUint {
    loop {
        let start = rng.gen_biguint_range(min, max);
        let prime = next_prime(&start);
        if *min < prime && prime < *max {
            return prime;
        }
    }
}

/// Compute the inverse of `a` modulo `m`, if it exists.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }
    let inverse = a.clone().mod_inverse(m)?.to_biguint()?;
    Some(inverse % m)
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn test_random_coprime_is_coprime_and_in_range() {
        let n = BigUint::from(2u32 * 3 * 5 * 7 * 11 * 13);
        for _ in 0..200 {
            let v = random_coprime(&mut OsRng, &n);
            assert!(v < n);
            assert!(v.gcd(&n).is_one());
        }
    }

    #[test]
    fn test_random_coprime_with_large_modulus() {
        let n = BigUint::from(1u32) << 300;
        let v = random_coprime(&mut OsRng, &n);
        assert!(v < n);
        assert!(v.is_odd());
    }

    #[test]
    fn test_next_prime() {
        assert_eq!(next_prime(&BigUint::from(0u32)), BigUint::from(2u32));
        assert_eq!(next_prime(&BigUint::from(2u32)), BigUint::from(3u32));
        assert_eq!(next_prime(&BigUint::from(13u32)), BigUint::from(17u32));
        assert_eq!(next_prime(&BigUint::from(90u32)), BigUint::from(97u32));
    }

    #[test]
    fn test_random_prime_in_range() {
        let min = BigUint::from(1000u32);
        let max = BigUint::from(2000u32);
        for _ in 0..50 {
            let p = random_prime_in_range(&mut OsRng, &min, &max);
            assert!(min < p && p < max);
            assert!(probably_prime(&p, PRIMALITY_REPS));
        }
    }

    #[test]
    fn test_mod_inverse() {
        let m = BigUint::from(97u32);
        for a in 1u32..97 {
            let a = BigUint::from(a);
            let inv = mod_inverse(&a, &m).unwrap();
            assert!(inv < m);
            assert!(((a * inv) % &m).is_one());
        }
        assert!(mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)).is_none());
    }
}
