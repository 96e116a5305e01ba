//! Per-token session state, and the store it lives in.
//!
//! The signer never keeps sessions in memory between calls. Each step loads the
//! record for a token, works on it, and writes it back with a fresh expiry.
//!
//! # Concurrency
//!
//! Every operation is a read-modify-write against the store. The core assumes
//! that each token is driven by at most one caller at a time; if a host may
//! receive concurrent requests for the same token, it is the host's job (or the
//! store's) to serialize them.
use std::{
    collections::{BTreeSet, HashMap},
    convert::Infallible,
    error,
    time::{Duration, Instant},
};

use rand::Rng;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    paillier::{Ciphertext, PublicKey},
    protocol::{Parameters, ProtocolError},
    serde::{decode, encode},
};

/// The signer's view of one run of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// How far the protocol has gotten, starting at 1.
    pub step: u32,
    /// One challenge bit per proof round.
    #[serde(rename = "bList")]
    pub b_list: Vec<u8>,
    /// The sorted indices into the client's candidate list.
    #[serde(rename = "iList")]
    pub i_list: Vec<u32>,
    #[serde(rename = "C1")]
    pub c1: Option<Ciphertext>,
    #[serde(rename = "C2")]
    pub c2: Option<Ciphertext>,
    /// The client's encryption key.
    pub public_key: Option<PublicKey>,
}

impl SessionRecord {
    /// Create the record for a brand new session, at step 1.
    pub fn new(rng: &mut impl CryptoRngCore, params: &Parameters) -> Self {
        Self {
            step: 1,
            b_list: challenge_bits(&mut *rng, params.rounds),
            i_list: candidate_indices(&mut *rng, params.index_count, params.candidate_count),
            c1: None,
            c2: None,
            public_key: None,
        }
    }
}

/// Flip `count` fair coins.
pub fn challenge_bits(rng: &mut impl CryptoRngCore, count: usize) -> Vec<u8> {
    (0..count).map(|_| (rng.next_u32() & 1) as u8).collect()
}

/// Pick `count` distinct indices from `[0, max_index]`, in ascending order.
///
/// There are only `max_index + 1` such indices, so `count` is capped to that.
pub(crate) fn candidate_indices(
    rng: &mut impl CryptoRngCore,
    count: usize,
    max_index: usize,
) -> Vec<u32> {
    let max_index = u32::try_from(max_index).unwrap_or(u32::MAX);
    let count = count.min((max_index as usize).saturating_add(1));
    let mut out = BTreeSet::new();
    while out.len() < count {
        out.insert(rng.gen_range(0..=max_index));
    }
    out.into_iter().collect()
}

/// A key-value store with per-key expiry, holding serialized session records.
///
/// This is implemented by the host, typically on top of some external cache.
/// Expired keys must behave exactly like keys that were never set.
pub trait SessionStore {
    type Error: error::Error + Send + Sync + 'static;

    fn exists(&self, token: &str) -> Result<bool, Self::Error>;

    fn get(&self, token: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Store a value, replacing any previous one, and reset its expiry.
    fn set(&mut self, token: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Self::Error>;

    fn delete(&mut self, token: &str) -> Result<(), Self::Error>;
}

fn store_error<E: error::Error + Send + Sync + 'static>(e: E) -> ProtocolError {
    ProtocolError::Store(Box::new(e))
}

/// Load and decode the record for a token, if there is one.
pub fn load_record<S: SessionStore>(
    store: &S,
    token: &str,
) -> Result<Option<SessionRecord>, ProtocolError> {
    match store.get(token).map_err(store_error)? {
        Some(data) => Ok(Some(decode(&data)?)),
        None => Ok(None),
    }
}

/// Encode and store the record for a token, with a fresh expiry.
pub fn save_record<S: SessionStore>(
    store: &mut S,
    token: &str,
    record: &SessionRecord,
    ttl: Duration,
) -> Result<(), ProtocolError> {
    store.set(token, encode(record)?, ttl).map_err(store_error)
}

/// Remove the record for a token.
pub fn delete_record<S: SessionStore>(store: &mut S, token: &str) -> Result<(), ProtocolError> {
    store.delete(token).map_err(store_error)
}

/// Check whether a token currently has a record.
pub fn record_exists<S: SessionStore>(store: &S, token: &str) -> Result<bool, ProtocolError> {
    store.exists(token).map_err(store_error)
}

/// A store keeping everything in process memory.
///
/// Useful for tests, and for hosts running a single signer process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, (Vec<u8>, Instant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, token: &str) -> Option<&Vec<u8>> {
        self.entries
            .get(token)
            .filter(|(_, deadline)| Instant::now() < *deadline)
            .map(|(data, _)| data)
    }
}

impl SessionStore for MemoryStore {
    type Error = Infallible;

    fn exists(&self, token: &str) -> Result<bool, Self::Error> {
        Ok(self.live(token).is_some())
    }

    fn get(&self, token: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.live(token).cloned())
    }

    fn set(&mut self, token: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Self::Error> {
        // Drop whatever has expired while we're here.
        let now = Instant::now();
        self.entries.retain(|_, (_, deadline)| now < *deadline);
        self.entries.insert(token.to_string(), (value, now + ttl));
        Ok(())
    }

    fn delete(&mut self, token: &str) -> Result<(), Self::Error> {
        self.entries.remove(token);
        Ok(())
    }
}
