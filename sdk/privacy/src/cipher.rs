//! Balance Encryption
//!
//! Additive stream cipher over the field:
//!
//! ```text
//! keystream(key, counter) = hash2(key, counter)
//! encrypt(p)              = p + keystream   (mod p)
//! decrypt(c)              = c - keystream   (mod p)
//! ```
//!
//! A (key, counter) pair must never encrypt two different plaintexts: the
//! difference of the ciphertexts would equal the difference of the
//! plaintexts. [`EncryptionSlot`] is a one-shot token for the encrypting
//! side; it is consumed by [`EncryptionSlot::seal`].

use crate::Scalar;
use crate::error::{PrivacyError, Result};
use crate::hash::hash2;
use crate::keys::ViewKey;

/// Largest accepted keystream counter. Larger values are rejected, never wrapped.
pub const MAX_COUNTER: u64 = u32::MAX as u64;

/// Counter used for a note's encrypted balance.
pub const BALANCE_COUNTER: u64 = 0;

/// Counter used for a note's encrypted nullifier.
pub const NULLIFIER_COUNTER: u64 = 1;

fn check_counter(counter: u64) -> Result<()> {
    if counter > MAX_COUNTER {
        return Err(PrivacyError::CounterOutOfRange {
            counter,
            max: MAX_COUNTER,
        });
    }
    Ok(())
}

pub fn keystream(key: &Scalar, counter: u64) -> Result<Scalar> {
    check_counter(counter)?;
    Ok(hash2(*key, Scalar::from(counter)))
}

pub fn encrypt(plaintext: &Scalar, key: &Scalar, counter: u64) -> Result<Scalar> {
    Ok(*plaintext + keystream(key, counter)?)
}

/// Field subtraction already normalises a negative intermediate into `[0, p)`.
pub fn decrypt(ciphertext: &Scalar, key: &Scalar, counter: u64) -> Result<Scalar> {
    Ok(*ciphertext - keystream(key, counter)?)
}

pub fn decrypt_with_view_key(ciphertext: &Scalar, view_key: &ViewKey, counter: u64) -> Result<Scalar> {
    decrypt(ciphertext, &view_key.as_scalar(), counter)
}

/// One-shot permission to encrypt under a (key, counter) pair.
///
/// Deliberately neither `Clone` nor `Copy`.
pub struct EncryptionSlot {
    key: Scalar,
    counter: u64,
}

impl std::fmt::Debug for EncryptionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSlot")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl EncryptionSlot {
    pub fn new(view_key: &ViewKey, counter: u64) -> Result<Self> {
        check_counter(counter)?;
        Ok(Self {
            key: view_key.as_scalar(),
            counter,
        })
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn seal(self, plaintext: &Scalar) -> Scalar {
        // Range was checked when the slot was issued.
        *plaintext + hash2(self.key, Scalar::from(self.counter))
    }
}
