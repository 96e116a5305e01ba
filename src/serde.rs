use num_bigint_dig::BigUint;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::protocol::ProtocolError;

/// Encode an arbitrary serializable value into a vec.
pub fn encode<T: Serialize + ?Sized>(val: &T) -> Result<Vec<u8>, ProtocolError> {
    rmp_serde::encode::to_vec_named(val).map_err(|e| ProtocolError::Other(Box::new(e)))
}

/// Decode a value previously produced by [encode].
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    rmp_serde::decode::from_slice(data).map_err(|e| ProtocolError::Other(Box::new(e)))
}

/// Serialize big integers as base 10 strings.
///
/// This keeps them lossless in formats like JSON, where numbers are doubles.
pub mod biguint {
    use super::*;

    pub fn serialize<S: Serializer>(data: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(data)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Like [biguint], for optional fields.
pub mod option_biguint {
    use super::*;

    pub fn serialize<S: Serializer>(
        data: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match data {
            Some(x) => serializer.collect_str(x),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| s.parse().map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Like [biguint], for lists. Only used for exports, so this only serializes.
pub mod vec_biguint {
    use super::*;

    pub fn serialize<S: Serializer>(data: &[BigUint], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(data.iter().map(|x| x.to_str_radix(10)))
    }
}
