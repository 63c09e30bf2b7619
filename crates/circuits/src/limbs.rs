// Copyright 2025 Irreducible Inc.
//! Foreign-field elements as 3-limb bigints.
//!
//! A foreign element is carried as three native field vars holding 88-bit
//! limbs, least significant first. 88 bits leaves enough headroom in a
//! ~255-bit native field for the products and carries the multiplication gate
//! accumulates.

use ferrite_frontend::{BoolVar, CircuitBuilder, FieldVar, NativeField, Wire};
use num_bigint::{BigInt, BigUint};
use num_traits::One;

pub const LIMB_BITS: u32 = 88;
pub const TWO_LIMB_BITS: u32 = 176;
pub const THREE_LIMB_BITS: u32 = 264;

pub fn limb_mask() -> BigUint {
	(BigUint::one() << LIMB_BITS) - 1u32
}

pub fn two_limb_mask() -> BigUint {
	(BigUint::one() << TWO_LIMB_BITS) - 1u32
}

/// Split into three 88-bit limbs, least significant first. `x` must be below
/// `2^264`.
pub fn split(x: &BigUint) -> [BigUint; 3] {
	let mask = limb_mask();
	[x & &mask, (x >> LIMB_BITS) & &mask, (x >> TWO_LIMB_BITS) & &mask]
}

pub fn combine(x: &[BigUint; 3]) -> BigUint {
	&x[0] + (&x[1] << LIMB_BITS) + (&x[2] << TWO_LIMB_BITS)
}

/// Split the low 176 bits into two 88-bit limbs.
pub fn split2(x: &BigUint) -> [BigUint; 2] {
	let mask = limb_mask();
	[x & &mask, (x >> LIMB_BITS) & &mask]
}

pub fn combine2(x: &[BigUint; 2]) -> BigUint {
	&x[0] + (&x[1] << LIMB_BITS)
}

/// Signed limb combination, used in witness computations where intermediate
/// values may be negative.
pub fn combine_signed(x: &[BigInt; 3]) -> BigInt {
	&x[0] + (&x[1] << LIMB_BITS) + (&x[2] << TWO_LIMB_BITS)
}

/// A foreign-field element: three 88-bit limb vars, least significant first.
pub type Field3<F> = [FieldVar<F>; 3];

/// Constant limbs of a bigint below `2^264`.
pub fn constant<F: NativeField>(x: &BigUint) -> Field3<F> {
	assert!(x.bits() <= THREE_LIMB_BITS as u64, "value exceeds three limbs");
	split(x).map(|limb| FieldVar::Constant(F::from_biguint(&limb)))
}

pub fn is_constant<F: NativeField>(x: &Field3<F>) -> bool {
	x.iter().all(FieldVar::is_constant)
}

/// The bigint a constant element holds, if all limbs are constant.
pub fn as_constant<F: NativeField>(x: &Field3<F>) -> Option<BigUint> {
	let limbs = [
		x[0].as_constant()?.to_biguint(),
		x[1].as_constant()?.to_biguint(),
		x[2].as_constant()?.to_biguint(),
	];
	Some(combine(&limbs))
}

/// Current bigint value. Only valid in prover mode.
pub fn value_of<F: NativeField>(b: &CircuitBuilder<F>, x: &Field3<F>) -> BigUint {
	let limbs = [
		b.value_biguint(&x[0]),
		b.value_biguint(&x[1]),
		b.value_biguint(&x[2]),
	];
	combine(&limbs)
}

/// Limb-wise conditional: `if cond { t } else { f }`.
pub fn select<F: NativeField>(
	b: &CircuitBuilder<F>,
	cond: &BoolVar<F>,
	t: &Field3<F>,
	f: &Field3<F>,
) -> Field3<F> {
	[
		b.select(cond, &t[0], &f[0]),
		b.select(cond, &t[1], &f[1]),
		b.select(cond, &t[2], &f[2]),
	]
}

/// Resolve all three limbs to wires, pinning constant limbs.
pub fn to_wires<F: NativeField>(b: &CircuitBuilder<F>, x: &Field3<F>) -> [Wire; 3] {
	[b.to_var(&x[0]), b.to_var(&x[1]), b.to_var(&x[2])]
}

/// Witness the limbs of a computed bigint. Adds no range checks.
pub fn exists<F: NativeField>(
	b: &CircuitBuilder<F>,
	compute: impl FnOnce() -> BigUint,
) -> Field3<F> {
	b.exists(|| split(&compute()).map(BigInt::from))
}

#[cfg(test)]
mod tests {
	use num_bigint::RandBigInt;
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;

	#[test]
	fn test_split_combine_round_trip() {
		let mut rng = StdRng::seed_from_u64(0);
		for _ in 0..100 {
			let x = rng.gen_biguint(THREE_LIMB_BITS as u64);
			let limbs = split(&x);
			for limb in &limbs {
				assert!(limb.bits() <= LIMB_BITS as u64);
			}
			assert_eq!(combine(&limbs), x);
		}
	}

	#[test]
	fn test_split2() {
		let x = (BigUint::from(5u32) << 200) | BigUint::from(3u32);
		let lo = split2(&x);
		assert_eq!(combine2(&lo), &x & two_limb_mask());
	}
}
