//! Glue between the curve arithmetic of `k256` and the big integers used by
//! the homomorphic encryption scheme.
use elliptic_curve::{ops::Reduce, sec1::ToEncodedPoint};
use k256::{AffinePoint, FieldBytes, ProjectivePoint, PublicKey, Scalar, U256};
use num_bigint_dig::BigUint;

use crate::protocol::ProtocolError;

/// The curve coefficient `a` of secp256k1.
pub const CURVE_A: u32 = 0;
/// The curve coefficient `b` of secp256k1.
pub const CURVE_B: u32 = 7;

const ORDER_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

const FIELD_PRIME_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];

const GENERATOR_X_BYTES: [u8; 32] = [
    0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b, 0x07,
    0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
];

const GENERATOR_Y_BYTES: [u8; 32] = [
    0x48, 0x3a, 0xda, 0x77, 0x26, 0xa3, 0xc4, 0x65, 0x5d, 0xa4, 0xfb, 0xfc, 0x0e, 0x11, 0x08, 0xa8,
    0xfd, 0x17, 0xb4, 0x48, 0xa6, 0x85, 0x54, 0x19, 0x9c, 0x47, 0xd0, 0x8f, 0xfb, 0x10, 0xd4, 0xb8,
];

/// The order of the secp256k1 base point.
///
/// This is the `q` of the encryption scheme: plaintexts live modulo this value.
pub fn curve_order() -> BigUint {
    BigUint::from_bytes_be(&ORDER_BYTES)
}

/// The prime of the field secp256k1 is defined over.
pub fn field_prime() -> BigUint {
    BigUint::from_bytes_be(&FIELD_PRIME_BYTES)
}

/// The affine coordinates of the secp256k1 base point.
pub fn generator() -> (BigUint, BigUint) {
    (
        BigUint::from_bytes_be(&GENERATOR_X_BYTES),
        BigUint::from_bytes_be(&GENERATOR_Y_BYTES),
    )
}

/// Get the affine coordinates of a point as integers.
///
/// The identity has no affine coordinates, and maps to `(0, 0)`.
pub fn point_coordinates(point: &AffinePoint) -> (BigUint, BigUint) {
    let encoded = point.to_encoded_point(false);
    match (encoded.x(), encoded.y()) {
        (Some(x), Some(y)) => (BigUint::from_bytes_be(x), BigUint::from_bytes_be(y)),
        _ => (BigUint::default(), BigUint::default()),
    }
}

/// Build a point from its affine coordinates, checking that it lies on the curve.
pub fn point_from_coordinates(x: &BigUint, y: &BigUint) -> Result<AffinePoint, ProtocolError> {
    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..33].copy_from_slice(&to_fixed_bytes(x).ok_or(ProtocolError::InvalidSignerKey)?);
    sec1[33..].copy_from_slice(&to_fixed_bytes(y).ok_or(ProtocolError::InvalidSignerKey)?);
    let public = PublicKey::from_sec1_bytes(&sec1).map_err(|_| ProtocolError::InvalidSignerKey)?;
    Ok(*public.as_affine())
}

/// Convert an integer to a scalar, reducing it modulo the curve order.
pub fn scalar_from_biguint(x: &BigUint) -> Scalar {
    let reduced = x % curve_order();
    let bytes = to_fixed_bytes(&reduced).unwrap_or_default();
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(bytes))
}

/// Multiply a point by an integer scalar.
pub fn scalar_mul(point: &AffinePoint, k: &BigUint) -> AffinePoint {
    (ProjectivePoint::from(*point) * scalar_from_biguint(k)).to_affine()
}

/// Big endian encoding padded to 32 bytes, or `None` if the value does not fit.
fn to_fixed_bytes(x: &BigUint) -> Option<[u8; 32]> {
    let bytes = x.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Some(out)
}
