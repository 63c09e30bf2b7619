// Copyright 2025 Irreducible Inc.
//! GLV scalar decomposition.
//!
//! For curves with a cube-root endomorphism, a scalar `s` splits as
//! `s = s0 + s1·lambda mod q` with `|s0|, |s1|` about half the bits of `q`.
//! The short basis comes from a truncated extended Euclidean run on
//! `(lambda, q)`.

use ferrite_frontend::{BoolVar, CircuitBuilder, CircuitError, FieldVar, NativeField, Result};
use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, Zero};

use crate::{
	ec::curve::Curve,
	foreign_field::{self, Sum},
	limbs,
	limbs::{Field3, TWO_LIMB_BITS},
};

/// Precomputed GLV constants for one curve.
#[derive(Clone, Debug)]
pub struct GlvParams {
	/// Cube root of unity in the scalar field.
	pub lambda: BigUint,
	/// Matching cube root of unity in the base field.
	pub beta: BigUint,
	v00: BigInt,
	v01: BigInt,
	v10: BigInt,
	v11: BigInt,
	det: BigInt,
	/// Bit bound on the absolute value of either decomposed half.
	pub max_bits: u32,
}

/// One half of a decomposed scalar: a sign and a small absolute value.
#[derive(Clone, Debug)]
pub struct SignedScalar {
	pub is_negative: bool,
	pub abs: BigUint,
}

impl GlvParams {
	pub fn new(lambda: BigUint, beta: BigUint, order: &BigUint) -> Self {
		let [[v00, v01], [v10, v11]] = egcd_stop_early(&lambda, order);
		let det = &v00 * &v11 - &v10 * &v01;
		let max_s0: BigInt = ((v00.abs() + v01.abs()) >> 1) + 1;
		let max_s1: BigInt = ((v10.abs() + v11.abs()) >> 1) + 1;
		let max_bits = max_s0.max(max_s1).bits() as u32;
		GlvParams { lambda, beta, v00, v01, v10, v11, det, max_bits }
	}

	/// Decompose `s = s0 + s1·lambda mod q` into two signed halves of at most
	/// [`GlvParams::max_bits`] bits.
	pub fn decompose(&self, s: &BigUint) -> [SignedScalar; 2] {
		let s = BigInt::from(s.clone());
		let x0 = divide_and_round(&(-&self.v11 * &s), &self.det);
		let x1 = divide_and_round(&(&self.v10 * &s), &self.det);
		let s0 = &self.v00 * &x0 + &self.v01 * &x1 + &s;
		let s1 = &self.v10 * &x0 + &self.v11 * &x1;
		[signed(s0), signed(s1)]
	}
}

fn signed(x: BigInt) -> SignedScalar {
	SignedScalar {
		is_negative: x.is_negative(),
		abs: x.abs().to_biguint().expect("absolute value"),
	}
}

/// Extended Euclidean algorithm on `(l, p)`, stopped as soon as the remainder
/// drops below `sqrt(p)`. Returns a matrix `V` with `v0j + l·v1j = 0 (mod p)`
/// and all entries around `sqrt(p)`.
fn egcd_stop_early(l: &BigUint, p: &BigUint) -> [[BigInt; 2]; 2] {
	assert!(l < p, "lambda must be reduced");
	let p_int = BigInt::from(p.clone());
	let (mut r0, mut r1) = (p_int.clone(), BigInt::from(l.clone()));
	let (mut t0, mut t1) = (BigInt::zero(), BigInt::from(1));

	while &r1 * &r1 > p_int {
		let quotient = &r0 / &r1;
		(r0, r1) = (r1.clone(), &r0 - &quotient * &r1);
		(t0, t1) = (t1.clone(), &t0 - &quotient * &t1);
	}
	let quotient = &r0 / &r1;
	let r2 = &r0 - &quotient * &r1;
	let t2 = &t0 - &quotient * &t1;

	let (v00, v10) = (r1, -t1);
	let (v01, v11) = if r0.clone().max(t0.abs()) <= r2.clone().max(t2.abs()) {
		(r0, -t0)
	} else {
		(r2, -t2)
	};
	[[v00, v01], [v10, v11]]
}

/// `round(x / y)` for signed bigints.
fn divide_and_round(x: &BigInt, y: &BigInt) -> BigInt {
	let sign = x.sign() == y.sign() || x.is_zero();
	let (x, y) = (x.abs(), y.abs());
	let mut z = &x / &y;
	// round up if it brings z·y closer to x
	if (&x - &z * &y) * 2u32 >= y {
		z += 1;
	}
	if sign {
		z
	} else {
		-z
	}
}

/// In-circuit half of a decomposed scalar.
#[derive(Clone, Copy, Debug)]
pub struct GlvScalar<F: NativeField> {
	pub is_negative: BoolVar<F>,
	/// Two-limb absolute value; the high limb is pinned to zero.
	pub abs: Field3<F>,
}

/// Witness the GLV split `s = s0 + s1·lambda` and prove it with one foreign
/// multiplication.
///
/// The halves are not range checked here; scalar multiplication slices them
/// into window chunks, which bounds them.
pub fn decompose_no_range_check<F: NativeField>(
	b: &CircuitBuilder<F>,
	curve: &Curve,
	s: &Field3<F>,
) -> Result<(GlvScalar<F>, GlvScalar<F>)> {
	let glv = curve
		.endo
		.as_ref()
		.ok_or_else(|| CircuitError::UnsoundUsage("curve has no endomorphism".to_string()))?;
	if glv.max_bits >= TWO_LIMB_BITS {
		return Err(CircuitError::UnsoundUsage(
			"decomposed scalars must fit in two limbs".to_string(),
		));
	}
	let q = &curve.order;

	let [s0_negative, s00, s01, s1_negative, s10, s11] = b.exists(|| {
		let [s0, s1] = glv.decompose(&limbs::value_of(b, s));
		let [s00, s01, _] = limbs::split(&s0.abs);
		let [s10, s11, _] = limbs::split(&s1.abs);
		[
			BigInt::from(s0.is_negative as u8),
			BigInt::from(s00),
			BigInt::from(s01),
			BigInt::from(s1.is_negative as u8),
			BigInt::from(s10),
			BigInt::from(s11),
		]
	});
	// the high limb is zero by the bit bound
	let s0 = [s00, s01, FieldVar::zero()];
	let s1 = [s10, s11, FieldVar::zero()];
	let s0_negative = b.assert_bool("s0 sign", &s0_negative)?;
	let s1_negative = b.assert_bool("s1 sign", &s1_negative)?;

	// prove s1·lambda = s -+ s0 over the scalar field
	let lambda_pos = limbs::constant::<F>(&glv.lambda);
	let lambda_neg = limbs::constant::<F>(&(q - &glv.lambda));
	let lambda = limbs::select(b, &s1_negative, &lambda_neg, &lambda_pos);

	let s_plus_s0 = Sum::new(*s).add(s0).finish(b, q, false)?;
	let s_minus_s0 = Sum::new(*s).sub(s0).finish(b, q, false)?;
	let rhs = limbs::select(b, &s0_negative, &s_plus_s0, &s_minus_s0);

	foreign_field::assert_mul(b, s1, lambda, rhs, q, "glv decomposition")?;

	Ok((
		GlvScalar { is_negative: s0_negative, abs: s0 },
		GlvScalar { is_negative: s1_negative, abs: s1 },
	))
}

#[cfg(test)]
mod tests {
	use num_bigint::RandBigInt;
	use num_integer::Integer;
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;

	#[test]
	fn test_decompose_identity() {
		let curve = Curve::secp256k1();
		let glv = curve.endo.as_ref().unwrap();
		let q = BigInt::from(curve.order.clone());
		let lambda = BigInt::from(glv.lambda.clone());

		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..50 {
			let s = rng.gen_biguint_below(&curve.order);
			let [s0, s1] = glv.decompose(&s);
			assert!(s0.abs.bits() as u32 <= glv.max_bits);
			assert!(s1.abs.bits() as u32 <= glv.max_bits);

			let signed = |x: &SignedScalar| {
				let v = BigInt::from(x.abs.clone());
				if x.is_negative {
					-v
				} else {
					v
				}
			};
			let recombined = (signed(&s0) + signed(&s1) * &lambda).mod_floor(&q);
			assert_eq!(recombined, BigInt::from(s.clone()));
		}
	}

	#[test]
	fn test_max_bits_is_half_width() {
		let curve = Curve::secp256k1();
		assert_eq!(curve.endo.as_ref().unwrap().max_bits, 129);
	}
}
