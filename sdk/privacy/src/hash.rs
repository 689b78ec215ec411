//! Poseidon hash oracles
//!
//! One parameter set per arity. `hash1`, `hash2` and `hash3` are distinct
//! primitives: each runs a sponge whose rate equals its arity, so an input
//! of one arity can never collide with a zero-padded input of another.
//!
//! ```text
//! hash1(a)       width 2, 8 full / 56 partial rounds
//! hash2(a, b)    width 3, 8 full / 57 partial rounds
//! hash3(a, b, c) width 4, 8 full / 56 partial rounds
//! ```
//!
//! Field: BLS12-381 Fr (255 bits), alpha = 5, capacity 1.

use ark_bls12_381::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use std::sync::LazyLock;

use crate::Scalar;

const PRIME_BITS: u64 = 255;
const FULL_ROUNDS: u64 = 8;
const ALPHA: u64 = 5;
const CAPACITY: usize = 1;

static POSEIDON_1: LazyLock<PoseidonConfig<Fr>> = LazyLock::new(|| poseidon_config(1, 56));
static POSEIDON_2: LazyLock<PoseidonConfig<Fr>> = LazyLock::new(|| poseidon_config(2, 57));
static POSEIDON_3: LazyLock<PoseidonConfig<Fr>> = LazyLock::new(|| poseidon_config(3, 56));

/// One-input oracle.
pub fn hash1(a: Scalar) -> Scalar {
    squeeze(&POSEIDON_1, &[a])
}

/// Two-input oracle. Used for Merkle nodes, commitment leaves, the view key
/// and the keystream.
pub fn hash2(a: Scalar, b: Scalar) -> Scalar {
    squeeze(&POSEIDON_2, &[a, b])
}

/// Three-input oracle. Used for the spending key and nonce commitments.
pub fn hash3(a: Scalar, b: Scalar, c: Scalar) -> Scalar {
    squeeze(&POSEIDON_3, &[a, b, c])
}

fn squeeze(config: &PoseidonConfig<Fr>, inputs: &[Scalar]) -> Scalar {
    let mut sponge = PoseidonSponge::new(config);
    for input in inputs {
        sponge.absorb(input);
    }
    let result: Fr = sponge.squeeze_field_elements(1)[0];
    result
}

fn poseidon_config(rate: usize, partial_rounds: u64) -> PoseidonConfig<Fr> {
    let (ark, mds) =
        find_poseidon_ark_and_mds::<Fr>(PRIME_BITS, rate, FULL_ROUNDS, partial_rounds, 0);

    PoseidonConfig::new(
        FULL_ROUNDS as usize,
        partial_rounds as usize,
        ALPHA,
        mds,
        ark,
        rate,
        CAPACITY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    fn s(v: u64) -> Scalar {
        Scalar::from(v)
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash1(s(7)), hash1(s(7)));
        assert_eq!(hash2(s(1), s(2)), hash2(s(1), s(2)));
        assert_eq!(hash3(s(1), s(2), s(3)), hash3(s(1), s(2), s(3)));
    }

    #[test]
    fn test_hash2_order_matters() {
        assert_ne!(hash2(s(1), s(2)), hash2(s(2), s(1)));
    }

    #[test]
    fn test_arities_are_distinct() {
        // Zero padding must not bridge one arity to another.
        assert_ne!(hash1(s(5)), hash2(s(5), Scalar::zero()));
        assert_ne!(hash2(s(5), s(6)), hash3(s(5), s(6), Scalar::zero()));
    }

    #[test]
    fn test_known_answers() {
        use crate::encoding::scalar_to_hex;

        assert_eq!(
            scalar_to_hex(&hash1(s(1))),
            "0x196cb1b8db9cf0ed6288a21db31e8ea3a606283d73277148783c17fbd3da53ce"
        );
        assert_eq!(
            scalar_to_hex(&hash2(s(1), s(2))),
            "0x51f3e312c95343a896cfd8945ea82ba956c1118ce9b9859b6ea56637b4b1ddc4"
        );
        assert_eq!(
            scalar_to_hex(&hash3(s(1), s(2), s(3))),
            "0x03ed9e6e45c050ecfa18b36cb8fa3ad18247f12897a2cbdc4afd565d2f5d04d0"
        );
    }

    #[test]
    fn test_single_input_change() {
        let base = hash3(s(10), s(20), s(30));
        assert_ne!(base, hash3(s(11), s(20), s(30)));
        assert_ne!(base, hash3(s(10), s(21), s(30)));
        assert_ne!(base, hash3(s(10), s(20), s(31)));
    }
}
