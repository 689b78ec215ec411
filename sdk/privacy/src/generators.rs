//! Fixed commitment generators
//!
//! Five nothing-up-my-sleeve points derived by try-and-increment: BLAKE3 in
//! key-derivation mode hashes a per-slot tag and a counter to a candidate `y`,
//! `x` is recovered from the curve equation, and the cofactor is cleared so
//! every generator lies in the prime-order subgroup. Nobody knows a discrete
//! log relation between any two of them.

use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use std::sync::LazyLock;

use crate::Scalar;
use crate::curve::{CurvePoint, coeff_a, coeff_d};

const GENERATOR_CONTEXT: &str = "veilvault 2024-06 pedersen generators v1";

static GENERATORS: LazyLock<GeneratorSet> = LazyLock::new(GeneratorSet::derive);

/// The five commitment bases, one per note slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSet {
    /// shares
    pub g: CurvePoint,
    /// nullifier
    pub h: CurvePoint,
    /// spending key
    pub d: CurvePoint,
    /// unlocksAt
    pub k: CurvePoint,
    /// nonce commitment
    pub j: CurvePoint,
}

impl GeneratorSet {
    fn derive() -> Self {
        Self {
            g: hash_to_point(b"G"),
            h: hash_to_point(b"H"),
            d: hash_to_point(b"D"),
            k: hash_to_point(b"K"),
            j: hash_to_point(b"J"),
        }
    }

    /// Generators in slot order `[G, H, D, K, J]`.
    pub fn as_array(&self) -> [CurvePoint; 5] {
        [self.g, self.h, self.d, self.k, self.j]
    }
}

/// The process-wide generator set.
pub fn generators() -> &'static GeneratorSet {
    &GENERATORS
}

fn hash_to_point(tag: &[u8]) -> CurvePoint {
    let a = coeff_a();
    let d = coeff_d();

    let mut counter: u32 = 0;
    loop {
        let mut hasher = blake3::Hasher::new_derive_key(GENERATOR_CONTEXT);
        hasher.update(tag);
        hasher.update(&counter.to_le_bytes());
        let mut wide = [0u8; 64];
        hasher.finalize_xof().fill(&mut wide);
        counter += 1;

        let y = Scalar::from_le_bytes_mod_order(&wide);
        let y2 = y.square();
        let den = a - d * y2;
        let Some(den_inv) = den.inverse() else {
            continue;
        };
        let Some(mut x) = ((Scalar::one() - y2) * den_inv).sqrt() else {
            continue;
        };
        // Canonical sign: take the even root.
        if x.into_bigint().is_odd() {
            x = -x;
        }
        if x.is_zero() {
            continue;
        }

        let candidate = CurvePoint::from_coordinates_unchecked(x, y).mul_by_cofactor();
        if candidate.is_zero() || !candidate.is_on_curve() {
            continue;
        }
        log::trace!(
            "derived generator {} after {} attempts",
            String::from_utf8_lossy(tag),
            counter
        );
        return candidate;
    }
}
