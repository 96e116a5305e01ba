use std::time::Duration;

/// The number of cut-and-choose rounds run for each proven ciphertext.
///
/// Each round catches a cheating prover with probability 1/2, so the
/// soundness error is 2^-ROUNDS.
pub const NUMBER_OF_ROUNDS: usize = 20;

/// The number of entries in the client's candidate list L.
pub const LENGTH_OF_L: usize = 40;

/// The number of distinct indices the signer selects out of L.
pub const LENGTH_OF_I: usize = 20;

/// How long a session survives in the store without progress.
pub const SESSION_TTL: Duration = Duration::from_secs(300);

/// Miller-Rabin repetitions used when testing candidate primes.
pub const PRIMALITY_REPS: usize = 20;
