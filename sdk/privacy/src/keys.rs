//! Key Derivation Hierarchy
//!
//! ```text
//! root secret ──hash1──▶ user key
//! user key, chain id, token ──hash3──▶ spending key
//! spending key, nonce, token ──hash3──▶ nonce commitment
//! VIEW_KEY_DOMAIN, user key ──hash2──▶ view key
//! ```
//!
//! Every function here is pure. The ledger recomputes the same values, so the
//! argument order is part of the format and must never change.

use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Scalar;
use crate::encoding::{hex_scalar, scalar_from_bytes_mod_order, scalar_to_hex};
use crate::error::{PrivacyError, Result};
use crate::hash::{hash1, hash2, hash3};

/// Domain tag for view keys: the ASCII bytes of `VEILVAULT_VIEW_KEY`, big-endian.
pub static VIEW_KEY_DOMAIN: std::sync::LazyLock<Scalar> =
    std::sync::LazyLock::new(|| Scalar::from_be_bytes_mod_order(b"VEILVAULT_VIEW_KEY"));

macro_rules! secret_scalar {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq)]
        pub struct $name(Scalar);

        impl $name {
            pub fn from_scalar(s: Scalar) -> Self {
                Self(s)
            }

            pub fn as_scalar(&self) -> Scalar {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(<redacted>)"))
            }
        }
    };
}

secret_scalar!(
    /// The user's master scalar. Everything else derives from it.
    UserKey
);
secret_scalar!(
    /// Binds note ownership for one (account, chain, token). Never persisted.
    SpendingKey
);
secret_scalar!(
    /// Decryption-only capability for encrypted balances.
    ViewKey
);

impl UserKey {
    /// Derive the user key from an external 32-byte root secret.
    pub fn from_root_secret(root: &[u8; 32]) -> Self {
        Self(hash1(scalar_from_bytes_mod_order(root)))
    }
}

/// Public per-note tag. The ledger indexes records by it and marks each one
/// used at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NonceCommitment(#[serde(with = "hex_scalar")] pub Scalar);

impl NonceCommitment {
    pub fn as_scalar(&self) -> Scalar {
        self.0
    }
}

impl fmt::Display for NonceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&scalar_to_hex(&self.0))
    }
}

/// A 20-byte token contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenAddress(pub [u8; 20]);

impl TokenAddress {
    /// Parse a `0x`-prefixed (or bare) 40-digit hex address.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| PrivacyError::InvalidEncoding(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| PrivacyError::InvalidEncoding(format!("address must be 20 bytes: {s}")))?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// The address as a field element (big-endian, always < p).
    pub fn to_scalar(&self) -> Scalar {
        Scalar::from_be_bytes_mod_order(&self.0)
    }
}

impl fmt::Debug for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenAddress({})", self.to_hex())
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for TokenAddress {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> std::result::Result<S::Ok, S::Error> {
        ser.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TokenAddress {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(de)?;
        TokenAddress::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// `spendingKey = hash3(userKey, chainId, token)`
pub fn derive_spending_key(user_key: &UserKey, chain_id: u64, token: &TokenAddress) -> SpendingKey {
    SpendingKey(hash3(
        user_key.0,
        Scalar::from(chain_id),
        token.to_scalar(),
    ))
}

/// `nonceCommitment = hash3(spendingKey, nonce, token)`
pub fn derive_nonce_commitment(
    spending_key: &SpendingKey,
    nonce: u64,
    token: &TokenAddress,
) -> NonceCommitment {
    NonceCommitment(hash3(spending_key.0, Scalar::from(nonce), token.to_scalar()))
}

/// `viewKey = hash2(VIEW_KEY_DOMAIN, userKey)`
pub fn derive_view_key(user_key: &UserKey) -> ViewKey {
    ViewKey(hash2(*VIEW_KEY_DOMAIN, user_key.0))
}

/// Non-secret account identity used to key local caches.
pub fn account_fingerprint(spending_key: &SpendingKey) -> Scalar {
    hash1(spending_key.0)
}
