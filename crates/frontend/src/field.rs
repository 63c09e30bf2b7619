// Copyright 2025 Irreducible Inc.
//! Native field abstraction.
//!
//! Gadgets are generic over the proof system's native prime field. The trait
//! extends [`ff::PrimeField`] with bigint conversions, which the builder needs
//! to move witness values in and out of the field representation.

use ff::PrimeField;
use num_bigint::{BigInt, BigUint, Sign};

/// The native prime field of the constraint system.
///
/// Implementations must provide exact round-trips between field elements and
/// their canonical bigint representatives in `[0, p)`.
pub trait NativeField: PrimeField {
	/// Canonical bigint representative of this element, in `[0, p)`.
	fn to_biguint(&self) -> BigUint;

	/// Build a field element from a canonical representative.
	///
	/// # Panics
	/// Panics if `x >= p`.
	fn from_canonical_biguint(x: &BigUint) -> Self;

	/// The field modulus `p`.
	fn modulus() -> BigUint {
		let hex = Self::MODULUS.trim_start_matches("0x");
		BigUint::parse_bytes(hex.as_bytes(), 16).expect("PrimeField::MODULUS is a hex string")
	}

	/// Build a field element from an arbitrary unsigned bigint, reducing mod `p`.
	fn from_biguint(x: &BigUint) -> Self {
		Self::from_canonical_biguint(&(x % Self::modulus()))
	}

	/// Build a field element from a signed bigint, reducing into `[0, p)`.
	fn from_bigint(x: &BigInt) -> Self {
		let p = BigInt::from_biguint(Sign::Plus, Self::modulus());
		let mut r = x % &p;
		if r.sign() == Sign::Minus {
			r += &p;
		}
		Self::from_canonical_biguint(&r.to_biguint().expect("reduced into [0, p)"))
	}
}

macro_rules! impl_native_field_le {
	($field:ty) => {
		impl NativeField for $field {
			fn to_biguint(&self) -> BigUint {
				BigUint::from_bytes_le(self.to_repr().as_ref())
			}

			fn from_canonical_biguint(x: &BigUint) -> Self {
				let bytes = x.to_bytes_le();
				assert!(bytes.len() <= 32, "value exceeds field size");
				let mut repr = <$field as PrimeField>::Repr::default();
				repr.as_mut()[..bytes.len()].copy_from_slice(&bytes);
				Option::from(<$field as PrimeField>::from_repr(repr))
					.expect("canonical representative")
			}
		}
	};
}

// Pallas base field, the native field of the reference deployment, and its
// sibling for completeness.
impl_native_field_le!(pasta_curves::Fp);
impl_native_field_le!(pasta_curves::Fq);

#[cfg(test)]
mod tests {
	use ff::Field;
	use num_bigint::BigInt;
	use pasta_curves::Fp;

	use super::*;

	#[test]
	fn test_biguint_round_trip() {
		let x = BigUint::from(0xdead_beef_u64) << 180;
		let f = Fp::from_biguint(&x);
		assert_eq!(f.to_biguint(), x);
	}

	#[test]
	fn test_negative_reduction() {
		let minus_one = BigInt::from(-1);
		let f = Fp::from_bigint(&minus_one);
		assert_eq!(f.to_biguint(), Fp::modulus() - 1u32);
	}

	#[test]
	fn test_modulus_matches_wraparound() {
		let p = Fp::modulus();
		assert_eq!(Fp::from_biguint(&p), Fp::ZERO);
		assert_eq!(Fp::from_biguint(&(p + 7u32)), Fp::from(7));
	}

	proptest::proptest! {
		#[test]
		fn prop_round_trip(lo: u128, hi: u128) {
			let x = (BigUint::from(hi >> 2) << 128) | BigUint::from(lo);
			proptest::prop_assert_eq!(Fp::from_biguint(&x).to_biguint(), x % Fp::modulus());
		}
	}
}
