//! The messages exchanged between the client and the signer.
//!
//! Field names follow the wire layout both sides agree on, and big integers are
//! carried as base 10 strings.
use num_bigint_dig::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
    paillier::{Ciphertext, PublicKey},
    proofs::plaintext::{Commitment, Response},
};

/// The signer's first message: its public point, and the challenge bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerHello {
    #[serde(rename = "K1x", with = "crate::serde::biguint")]
    pub k1_x: BigUint,
    #[serde(rename = "K1y", with = "crate::serde::biguint")]
    pub k1_y: BigUint,
    #[serde(rename = "bList")]
    pub b_list: Vec<u8>,
}

/// One answered proof round: the commitment, and the opening the challenge asked for.
///
/// Only one of the two pairs `(x, rp)` and `(xp, rpp)` is ever present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkEntry {
    #[serde(rename = "Cp")]
    pub cp: Ciphertext,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serde::option_biguint"
    )]
    pub x: Option<BigUint>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serde::option_biguint"
    )]
    pub rp: Option<BigUint>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serde::option_biguint"
    )]
    pub xp: Option<BigUint>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serde::option_biguint"
    )]
    pub rpp: Option<BigUint>,
}

impl ZkEntry {
    pub fn new(commitment: Commitment, response: Response) -> Self {
        let mut out = Self {
            cp: commitment.cp,
            x: None,
            rp: None,
            xp: None,
            rpp: None,
        };
        match response {
            Response::Mask { x, rp } => {
                out.x = Some(x);
                out.rp = Some(rp);
            }
            Response::Shifted { xp, rpp } => {
                out.xp = Some(xp);
                out.rpp = Some(rpp);
            }
        }
        out
    }

    pub fn commitment(&self) -> Commitment {
        Commitment {
            cp: self.cp.clone(),
        }
    }

    /// Extract the response this entry carries.
    ///
    /// Returns `None` if the entry is missing one of the fields, or carries both openings.
    pub fn response(&self) -> Option<Response> {
        match (&self.x, &self.rp, &self.xp, &self.rpp) {
            (Some(x), Some(rp), None, None) => Some(Response::Mask {
                x: x.clone(),
                rp: rp.clone(),
            }),
            (None, None, Some(xp), Some(rpp)) => Some(Response::Shifted {
                xp: xp.clone(),
                rpp: rpp.clone(),
            }),
            _ => None,
        }
    }
}

/// The client's answer to [SignerHello].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPayload {
    #[serde(rename = "N", with = "crate::serde::biguint")]
    pub n: BigUint,
    #[serde(rename = "g", with = "crate::serde::biguint")]
    pub g: BigUint,
    #[serde(rename = "C1")]
    pub c1: Ciphertext,
    #[serde(rename = "C2")]
    pub c2: Ciphertext,
    #[serde(rename = "ZKProofC1List")]
    pub zk_proof_c1_list: Vec<ZkEntry>,
    #[serde(rename = "ZKProofC2List")]
    pub zk_proof_c2_list: Vec<ZkEntry>,
}

impl ClientPayload {
    /// The client's encryption key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.n.clone(), self.g.clone())
    }
}
