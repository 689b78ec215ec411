//! Jubjub point arithmetic
//!
//! Affine twisted-Edwards arithmetic over the BLS12-381 scalar field:
//!
//! ```text
//! a·x² + y² = 1 + d·x²·y²      a = -1, d = -(10240/10241)
//!
//! (x1, y1) + (x2, y2) = ( (x1·y2 + y1·x2) / (1 + d·x1·x2·y1·y2),
//!                         (y1·y2 - a·x1·x2) / (1 - d·x1·x2·y1·y2) )
//! ```
//!
//! `d` is a non-square, so the law is complete: the denominators never
//! vanish for points on the curve. The identity is `(0, 1)`.

use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::Scalar;
use crate::encoding::{hex_scalar, scalar_to_hex};
use crate::error::{PrivacyError, Result};

/// Jubjub cofactor.
pub const COFACTOR: u64 = 8;

static COEFF_D: LazyLock<Scalar> = LazyLock::new(|| {
    let num = Scalar::from(10240u64);
    let den = Scalar::from(10241u64);
    -(num * den.inverse().unwrap_or_default())
});

pub(crate) fn coeff_a() -> Scalar {
    -Scalar::one()
}

pub(crate) fn coeff_d() -> Scalar {
    *COEFF_D
}

/// An affine point on Jubjub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct CurvePoint {
    x: Scalar,
    y: Scalar,
}

#[derive(Serialize, Deserialize)]
struct RawPoint {
    #[serde(with = "hex_scalar")]
    x: Scalar,
    #[serde(with = "hex_scalar")]
    y: Scalar,
}

impl TryFrom<RawPoint> for CurvePoint {
    type Error = PrivacyError;

    fn try_from(raw: RawPoint) -> Result<Self> {
        CurvePoint::new(raw.x, raw.y)
    }
}

impl From<CurvePoint> for RawPoint {
    fn from(p: CurvePoint) -> Self {
        RawPoint { x: p.x, y: p.y }
    }
}

impl CurvePoint {
    /// The neutral element `(0, 1)`.
    pub fn identity() -> Self {
        Self {
            x: Scalar::zero(),
            y: Scalar::one(),
        }
    }

    /// Construct a point, rejecting coordinates that are not on the curve.
    pub fn new(x: Scalar, y: Scalar) -> Result<Self> {
        let p = Self { x, y };
        if p.is_on_curve() {
            Ok(p)
        } else {
            Err(PrivacyError::NotOnCurve {
                x: scalar_to_hex(&x),
                y: scalar_to_hex(&y),
            })
        }
    }

    pub(crate) fn from_coordinates_unchecked(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> Scalar {
        self.x
    }

    pub fn y(&self) -> Scalar {
        self.y
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_one()
    }

    pub fn is_on_curve(&self) -> bool {
        let x2 = self.x.square();
        let y2 = self.y.square();
        coeff_a() * x2 + y2 == Scalar::one() + coeff_d() * x2 * y2
    }

    pub fn add(&self, other: &Self) -> Self {
        let x1y2 = self.x * other.y;
        let y1x2 = self.y * other.x;
        let x1x2 = self.x * other.x;
        let y1y2 = self.y * other.y;
        let dxy = coeff_d() * x1x2 * y1y2;

        let x_den = Scalar::one() + dxy;
        let y_den = Scalar::one() - dxy;

        // Complete law: both denominators are non-zero for on-curve inputs.
        let x = (x1y2 + y1x2) * x_den.inverse().unwrap_or_default();
        let y = (y1y2 - coeff_a() * x1x2) * y_den.inverse().unwrap_or_default();

        Self { x, y }
    }

    pub fn double(&self) -> Self {
        self.add(self)
    }

    pub fn negate(&self) -> Self {
        Self {
            x: -self.x,
            y: self.y,
        }
    }

    /// Double-and-add over the canonical bits of `s`, most significant first.
    ///
    /// Not constant time.
    pub fn scalar_mul(&self, s: &Scalar) -> Self {
        let mut acc = Self::identity();
        if s.is_zero() || self.is_zero() {
            return acc;
        }

        let bits = s.into_bigint().to_bits_be();
        let mut started = false;
        for bit in bits {
            if started {
                acc = acc.double();
            }
            if bit {
                acc = acc.add(self);
                started = true;
            }
        }
        acc
    }

    /// Multiply by the curve cofactor.
    pub fn mul_by_cofactor(&self) -> Self {
        self.double().double().double()
    }
}

impl Default for CurvePoint {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::generators;
    use ark_ec::twisted_edwards::TECurveConfig;
    use ark_ec::{AffineRepr, CurveGroup};
    use ark_ed_on_bls12_381::{EdwardsAffine, JubjubConfig};

    fn sample_points() -> (CurvePoint, CurvePoint, CurvePoint) {
        let g = generators();
        (g.g, g.h, g.d)
    }

    fn to_ark(p: &CurvePoint) -> EdwardsAffine {
        EdwardsAffine::new_unchecked(p.x(), p.y())
    }

    #[test]
    fn test_coefficients_match_arkworks() {
        assert_eq!(coeff_a(), JubjubConfig::COEFF_A);
        assert_eq!(coeff_d(), JubjubConfig::COEFF_D);
    }

    #[test]
    fn test_identity_laws() {
        let (p, _, _) = sample_points();
        let id = CurvePoint::identity();

        assert!(id.is_zero());
        assert!(id.is_on_curve());
        assert_eq!(p.add(&id), p);
        assert_eq!(id.add(&p), p);
        assert!(p.add(&p.negate()).is_zero());
        assert_eq!(p.scalar_mul(&Scalar::zero()), id);
        assert_eq!(p.scalar_mul(&Scalar::one()), p);
        assert_eq!(id.scalar_mul(&Scalar::from(12345u64)), id);
    }

    #[test]
    fn test_add_commutative_associative() {
        let (p, q, r) = sample_points();
        assert_eq!(p.add(&q), q.add(&p));
        assert_eq!(p.add(&q).add(&r), p.add(&q.add(&r)));
        assert!(p.add(&q).is_on_curve());
    }

    #[test]
    fn test_add_matches_arkworks() {
        let (p, q, _) = sample_points();
        let ours = p.add(&q);
        let theirs = (to_ark(&p).into_group() + to_ark(&q)).into_affine();
        assert_eq!(ours.x(), theirs.x);
        assert_eq!(ours.y(), theirs.y);
    }

    #[test]
    fn test_scalar_mul_is_repeated_addition() {
        let (p, _, _) = sample_points();
        let mut acc = CurvePoint::identity();
        for _ in 0..13 {
            acc = acc.add(&p);
        }
        assert_eq!(p.scalar_mul(&Scalar::from(13u64)), acc);
    }

    #[test]
    fn test_scalar_mul_distributes() {
        let (p, _, _) = sample_points();
        let a = Scalar::from(987_654_321u64);
        let b = Scalar::from(100_000_000u64);
        assert_eq!(
            p.scalar_mul(&(a + b)),
            p.scalar_mul(&a).add(&p.scalar_mul(&b))
        );
    }

    #[test]
    fn test_scalar_mul_matches_arkworks() {
        let (p, _, _) = sample_points();
        let k = Scalar::from(0xdead_beef_u64);
        let ours = p.scalar_mul(&k);
        let theirs = (to_ark(&p).into_group() * ark_ed_on_bls12_381::Fr::from(0xdead_beef_u64))
            .into_affine();
        assert_eq!(ours.x(), theirs.x);
        assert_eq!(ours.y(), theirs.y);
    }

    #[test]
    fn test_rejects_off_curve() {
        assert!(CurvePoint::new(Scalar::from(1u64), Scalar::from(1u64)).is_err());
        assert!(CurvePoint::new(Scalar::zero(), Scalar::one()).is_ok());
    }

    #[test]
    fn test_serde_validates() {
        let (p, _, _) = sample_points();
        let json = serde_json::to_string(&p).unwrap();
        let back: CurvePoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);

        let bad = r#"{"x":"0x01","y":"0x01"}"#;
        assert!(serde_json::from_str::<CurvePoint>(bad).is_err());
    }
}
