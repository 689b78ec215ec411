//! Scalar encodings
//!
//! Bytes are 32-byte little-endian (the arkworks canonical form). Hex strings
//! are big-endian with an optional `0x` prefix so they read like integers.
//! Decoding rejects values at or above the field modulus instead of reducing.

use ark_ff::{BigInteger, PrimeField};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::Scalar;
use crate::error::{PrivacyError, Result};

/// Canonical little-endian bytes of a scalar.
pub fn scalar_to_bytes(s: &Scalar) -> [u8; 32] {
    let bytes = s.into_bigint().to_bytes_le();
    let mut arr = [0u8; 32];
    arr[..bytes.len()].copy_from_slice(&bytes);
    arr
}

/// Parse canonical little-endian bytes. Values `>= p` are rejected.
pub fn scalar_from_bytes(bytes: &[u8; 32]) -> Result<Scalar> {
    Scalar::deserialize_compressed(&bytes[..]).map_err(|_| PrivacyError::NonCanonicalScalar)
}

/// Reduce arbitrary bytes into the field (for hashing external secrets).
pub fn scalar_from_bytes_mod_order(bytes: &[u8]) -> Scalar {
    Scalar::from_le_bytes_mod_order(bytes)
}

pub fn scalar_to_hex(s: &Scalar) -> String {
    let mut be = scalar_to_bytes(s);
    be.reverse();
    format!("0x{}", hex::encode(be))
}

pub fn scalar_from_hex(s: &str) -> Result<Scalar> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() || digits.len() > 64 {
        return Err(PrivacyError::InvalidEncoding(s.to_string()));
    }
    let padded = format!("{digits:0>64}");
    let mut bytes: [u8; 32] = hex::decode(&padded)
        .map_err(|e| PrivacyError::InvalidEncoding(e.to_string()))?
        .try_into()
        .map_err(|_| PrivacyError::InvalidEncoding(s.to_string()))?;
    bytes.reverse();
    scalar_from_bytes(&bytes)
}

/// Parse a scalar from `0x`-hex or a decimal string. Decimal input is limited
/// to `u128`; larger values must be given in hex.
pub fn parse_scalar(s: &str) -> Result<Scalar> {
    let s = s.trim();
    if s.starts_with("0x") {
        return scalar_from_hex(s);
    }
    s.parse::<u128>()
        .map(Scalar::from)
        .map_err(|_| PrivacyError::InvalidEncoding(s.to_string()))
}

/// Serde adapter: scalar as big-endian hex string.
pub mod hex_scalar {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(s: &Scalar, ser: S) -> std::result::Result<S::Ok, S::Error> {
        ser.serialize_str(&scalar_to_hex(s))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Scalar, D::Error> {
        let s = String::deserialize(de)?;
        parse_scalar(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `Vec<Scalar>` as a list of hex strings.
pub mod hex_scalar_vec {
    use super::*;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        v: &[Scalar],
        ser: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = ser.serialize_seq(Some(v.len()))?;
        for s in v {
            seq.serialize_element(&scalar_to_hex(s))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> std::result::Result<Vec<Scalar>, D::Error> {
        let raw = Vec::<String>::deserialize(de)?;
        raw.iter()
            .map(|s| parse_scalar(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{Field, Zero};

    #[test]
    fn test_hex_is_big_endian() {
        assert_eq!(
            scalar_to_hex(&Scalar::from(0x1234u64)),
            "0x0000000000000000000000000000000000000000000000000000000000001234"
        );
        assert_eq!(scalar_from_hex("0x1234").unwrap(), Scalar::from(0x1234u64));
        assert_eq!(scalar_from_hex("ff").unwrap(), Scalar::from(255u64));
    }

    #[test]
    fn test_rejects_modulus() {
        // p itself is not a canonical encoding
        let p_minus_one = -Scalar::ONE;
        let mut bytes = scalar_to_bytes(&p_minus_one);
        bytes[0] = bytes[0].wrapping_add(1);
        assert_eq!(
            scalar_from_bytes(&bytes),
            Err(PrivacyError::NonCanonicalScalar)
        );
        assert_eq!(
            scalar_from_bytes(&[0xff; 32]),
            Err(PrivacyError::NonCanonicalScalar)
        );
    }

    #[test]
    fn test_parse_scalar_decimal_and_hex() {
        assert_eq!(parse_scalar("100000000").unwrap(), Scalar::from(100_000_000u64));
        assert_eq!(parse_scalar("0").unwrap(), Scalar::zero());
        assert_eq!(parse_scalar("0x0a").unwrap(), Scalar::from(10u64));
        assert!(parse_scalar("-5").is_err());
        assert!(parse_scalar("12ab").is_err());
        assert!(parse_scalar("").is_err());
    }

    #[test]
    fn test_parse_scalar_rejects_oversized_decimal() {
        // 2^256 is far above the modulus
        let big = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(parse_scalar(big).is_err());
    }

    #[test]
    fn test_serde_adapter() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "hex_scalar")]
            value: Scalar,
            #[serde(with = "hex_scalar_vec")]
            values: Vec<Scalar>,
        }

        let w = Wrapper {
            value: Scalar::from(42u64),
            values: vec![Scalar::from(1u64), Scalar::from(2u64)],
        };
        let json = serde_json::to_string(&w).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, w);
    }
}
