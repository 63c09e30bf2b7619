// Copyright 2025 Irreducible Inc.
//! Typed wrappers tracking how reduced a foreign element is.
//!
//! Three levels, from weakest to strongest:
//! - [`Unreduced`]: below `2^264`. What addition chains produce.
//! - [`AlmostReduced`]: additionally, the high limb is bounded by the
//!   modulus's high limb, so the value is below `2^88·(f2 + 1)·2^176`. This is
//!   what multiplication soundness needs from its inputs.
//! - [`Canonical`]: below `f`, the unique representative.
//!
//! Levels only ever weaken implicitly; strengthening takes a proof.

use ferrite_frontend::{BoolVar, CircuitBuilder, NativeField, Result};
use num_bigint::BigUint;

use crate::{foreign_field, limbs, limbs::Field3, range_check::multi_range_check};

/// A range-checked foreign element, below `2^264`.
#[derive(Clone, Copy, Debug)]
pub struct Unreduced<F: NativeField> {
	pub limbs: Field3<F>,
}

/// A foreign element known to be almost reduced mod `f`.
#[derive(Clone, Copy, Debug)]
pub struct AlmostReduced<F: NativeField> {
	pub limbs: Field3<F>,
}

/// The canonical representative of a foreign element, below `f`.
#[derive(Clone, Copy, Debug)]
pub struct Canonical<F: NativeField> {
	pub limbs: Field3<F>,
}

impl<F: NativeField> From<AlmostReduced<F>> for Unreduced<F> {
	fn from(x: AlmostReduced<F>) -> Self {
		Unreduced { limbs: x.limbs }
	}
}

impl<F: NativeField> From<Canonical<F>> for AlmostReduced<F> {
	fn from(x: Canonical<F>) -> Self {
		AlmostReduced { limbs: x.limbs }
	}
}

impl<F: NativeField> From<Canonical<F>> for Unreduced<F> {
	fn from(x: Canonical<F>) -> Self {
		Unreduced { limbs: x.limbs }
	}
}

impl<F: NativeField> Unreduced<F> {
	/// Witness an element and range check its limbs.
	pub fn witness(
		b: &CircuitBuilder<F>,
		compute: impl FnOnce() -> BigUint,
	) -> Result<Self> {
		let limbs = limbs::exists(b, compute);
		multi_range_check(b, &limbs)?;
		Ok(Unreduced { limbs })
	}

	pub fn assert_almost_reduced(
		&self,
		b: &CircuitBuilder<F>,
		f: &BigUint,
	) -> Result<AlmostReduced<F>> {
		foreign_field::assert_almost_reduced(b, &[&self.limbs], f, true)?;
		Ok(AlmostReduced { limbs: self.limbs })
	}

	/// Batched variant of [`Unreduced::assert_almost_reduced`]; cheapest when
	/// the batch size is a multiple of three.
	pub fn assert_almost_reduced_many(
		b: &CircuitBuilder<F>,
		xs: &[Self],
		f: &BigUint,
	) -> Result<Vec<AlmostReduced<F>>> {
		let refs: Vec<&Field3<F>> = xs.iter().map(|x| &x.limbs).collect();
		foreign_field::assert_almost_reduced(b, &refs, f, true)?;
		Ok(xs.iter().map(|x| AlmostReduced { limbs: x.limbs }).collect())
	}
}

impl<F: NativeField> AlmostReduced<F> {
	/// Witness an element and prove it almost reduced.
	pub fn witness(
		b: &CircuitBuilder<F>,
		f: &BigUint,
		compute: impl FnOnce() -> BigUint,
	) -> Result<Self> {
		let limbs = limbs::exists(b, compute);
		foreign_field::assert_almost_reduced(b, &[&limbs], f, false)?;
		Ok(AlmostReduced { limbs })
	}

	/// `x·y mod f`. The product is range checked but not weakly bounded.
	pub fn mul(&self, b: &CircuitBuilder<F>, y: &Self, f: &BigUint) -> Result<Unreduced<F>> {
		let limbs = foreign_field::multiply(b, &self.limbs, &y.limbs, f)?;
		Ok(Unreduced { limbs })
	}

	/// `x^-1 mod f`.
	pub fn inv(&self, b: &CircuitBuilder<F>, f: &BigUint) -> Result<AlmostReduced<F>> {
		let limbs = foreign_field::inverse(b, &self.limbs, f)?;
		Ok(AlmostReduced { limbs })
	}

	/// `x/y mod f`, proving the divisor nonzero.
	pub fn div(&self, b: &CircuitBuilder<F>, y: &Self, f: &BigUint) -> Result<AlmostReduced<F>> {
		let limbs = foreign_field::divide(b, &self.limbs, &y.limbs, f)?;
		Ok(AlmostReduced { limbs })
	}

	/// Whether `x = c mod f` for a constant `c` below `f`.
	pub fn equals(&self, b: &CircuitBuilder<F>, c: &BigUint, f: &BigUint) -> Result<BoolVar<F>> {
		foreign_field::equals(b, &self.limbs, c, f)
	}

	pub fn to_canonical(&self, b: &CircuitBuilder<F>, f: &BigUint) -> Result<Canonical<F>> {
		let limbs = foreign_field::to_canonical(b, &self.limbs, f)?;
		Ok(Canonical { limbs })
	}
}

impl<F: NativeField> Canonical<F> {
	pub fn constant(x: &BigUint, f: &BigUint) -> Result<Self> {
		if x >= f {
			return Err(ferrite_frontend::CircuitError::OutOfRange(format!(
				"{x} is not canonical mod {f}"
			)));
		}
		Ok(Canonical { limbs: limbs::constant(x) })
	}
}

macro_rules! impl_additive_ops {
	($ty:ident) => {
		impl<F: NativeField> $ty<F> {
			/// `x + y mod f`.
			pub fn add(
				&self,
				b: &CircuitBuilder<F>,
				y: &impl AsLimbs<F>,
				f: &BigUint,
			) -> Result<Unreduced<F>> {
				let limbs = foreign_field::add(b, &self.limbs, y.as_limbs(), f)?;
				Ok(Unreduced { limbs })
			}

			/// `x - y mod f`.
			pub fn sub(
				&self,
				b: &CircuitBuilder<F>,
				y: &impl AsLimbs<F>,
				f: &BigUint,
			) -> Result<Unreduced<F>> {
				let limbs = foreign_field::sub(b, &self.limbs, y.as_limbs(), f)?;
				Ok(Unreduced { limbs })
			}

			/// `-x mod f`.
			pub fn neg(&self, b: &CircuitBuilder<F>, f: &BigUint) -> Result<Unreduced<F>> {
				let limbs = foreign_field::negate(b, &self.limbs, f)?;
				Ok(Unreduced { limbs })
			}
		}

		impl<F: NativeField> AsLimbs<F> for $ty<F> {
			fn as_limbs(&self) -> &Field3<F> {
				&self.limbs
			}
		}
	};
}

/// Access to the raw limbs at any reduction level.
pub trait AsLimbs<F: NativeField> {
	fn as_limbs(&self) -> &Field3<F>;
}

impl_additive_ops!(Unreduced);
impl_additive_ops!(AlmostReduced);
impl_additive_ops!(Canonical);

#[cfg(test)]
mod tests {
	use ferrite_frontend::Mode;
	use num_bigint::{BigUint, RandBigInt};
	use num_traits::One;
	use pasta_curves::Fp;
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;
	use crate::ec::Curve;

	#[test]
	fn test_levels_compose() {
		let f = Curve::secp256k1().modulus;
		let mut rng = StdRng::seed_from_u64(20);
		let xv = rng.gen_biguint_below(&f);
		let yv = rng.gen_biguint_below(&f);

		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = Unreduced::witness(&b, || xv.clone()).unwrap();
		let y = Unreduced::witness(&b, || yv.clone()).unwrap();

		let sum = x.add(&b, &y, &f).unwrap();
		assert_eq!(limbs::value_of(&b, &sum.limbs), (&xv + &yv) % &f);

		let [x, y, sum]: [AlmostReduced<Fp>; 3] =
			Unreduced::assert_almost_reduced_many(&b, &[x, y, sum], &f)
				.unwrap()
				.try_into()
				.unwrap();

		let prod = x.mul(&b, &y, &f).unwrap();
		assert_eq!(limbs::value_of(&b, &prod.limbs), &xv * &yv % &f);

		let quot = sum.div(&b, &y, &f).unwrap();
		let back = quot.mul(&b, &y, &f).unwrap();
		assert_eq!(
			limbs::value_of(&b, &back.limbs),
			limbs::value_of(&b, &sum.limbs) % &f
		);

		let inv = x.inv(&b, &f).unwrap();
		assert_eq!(
			limbs::value_of(&b, &inv.limbs) * &xv % &f,
			BigUint::one()
		);

		let canonical = prod.assert_almost_reduced(&b, &f).unwrap().to_canonical(&b, &f).unwrap();
		assert_eq!(limbs::value_of(&b, &canonical.limbs), &xv * &yv % &f);

		b.build().verify().unwrap();
	}

	#[test]
	fn test_canonical_constant_rejects_oversized() {
		let f = Curve::secp256k1().order;
		assert!(Canonical::<Fp>::constant(&(&f - 1u32), &f).is_ok());
		assert!(Canonical::<Fp>::constant(&f, &f).is_err());
	}

	#[test]
	fn test_mixed_level_addition() {
		let f = Curve::secp256k1().order;
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let c = Canonical::<Fp>::constant(&BigUint::from(5u32), &f).unwrap();
		let x = AlmostReduced::witness(&b, &f, || f.clone() - 2u32).unwrap();
		let s = x.add(&b, &c, &f).unwrap();
		assert_eq!(limbs::value_of(&b, &s.limbs), BigUint::from(3u32));
		b.build().verify().unwrap();
	}
}
