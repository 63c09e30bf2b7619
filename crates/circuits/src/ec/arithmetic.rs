// Copyright 2025 Irreducible Inc.
//! In-circuit elliptic curve point operations in affine coordinates.
//!
//! Addition and doubling witness the slope and result coordinates and pin
//! them down with three foreign multiplications each. Neither gadget handles
//! the point at infinity; the scalar multiplication ladder keeps sums away
//! from it with an offset aggregator.

use ferrite_frontend::{CircuitBuilder, CircuitError, NativeField, Result};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::{
	ec::{curve::Curve, point::Point},
	foreign_field::{self, mod_inverse, Sum},
	limbs,
	limbs::{Field3, LIMB_BITS, TWO_LIMB_BITS},
};

/// `p1 + p2`, assuming `p1.x != p2.x` (checked) and neither point is zero.
///
/// Inputs must be almost reduced; the result coordinates are almost reduced.
pub fn add<F: NativeField>(
	b: &CircuitBuilder<F>,
	p1: &Point<F>,
	p2: &Point<F>,
	curve: &Curve,
) -> Result<Point<F>> {
	let f = &curve.modulus;

	if let (Some(c1), Some(c2)) = (p1.as_constant(), p2.as_constant()) {
		let p3 = curve.add(&c1, &c2);
		if p3.infinity {
			return Err(CircuitError::UnsoundUsage(
				"sum of constant points is the point at infinity".to_string(),
			));
		}
		return Ok(Point::constant(&p3));
	}
	if f.bits() <= TWO_LIMB_BITS as u64 {
		return Err(CircuitError::ModulusTooLarge(
			"base field moduli smaller than 2^177 are not supported".to_string(),
		));
	}

	// witness the slope and result coordinates
	let (m, x3, y3) = witness_add(b, p1, p2, f);
	foreign_field::assert_almost_reduced(b, &[&m, &x3, &y3], f, false)?;

	// x1 != x2: inputs are almost reduced, so x1 - x2 + f < 3f and the
	// difference has to avoid 0, f and 2f
	let delta_x = foreign_field::sub(b, &p1.x, &p2.x, f)?;
	let delta_x01 = b.add_scaled(&delta_x[0], &delta_x[1], pow2_limb::<F>());
	let f01 = F::from_biguint(&(f & limbs::two_limb_mask()));
	let f2 = F::from_biguint(&(f >> TWO_LIMB_BITS));
	let fx22 = F::from_biguint(&((f * 2u32) >> TWO_LIMB_BITS));
	b.assert_not_vector_equals(
		"x coordinates differ",
		&[delta_x01, delta_x[2]],
		&[F::ZERO, F::ZERO],
	)?;
	b.assert_not_vector_equals("x coordinates differ", &[delta_x01, delta_x[2]], &[f01, f2])?;
	b.assert_not_vector_equals("x coordinates differ", &[delta_x[2]], &[fx22])?;

	// (x1 - x2)·m = y1 - y2
	foreign_field::assert_mul(b, delta_x, m, Sum::new(p1.y).sub(p2.y), f, "slope")?;

	// m^2 = x1 + x2 + x3
	foreign_field::assert_mul(b, m, m, Sum::new(p1.x).add(p2.x).add(x3), f, "sum x")?;

	// (x1 - x3)·m = y1 + y3
	foreign_field::assert_mul(
		b,
		Sum::new(p1.x).sub(x3),
		m,
		Sum::new(p1.y).add(y3),
		f,
		"sum y",
	)?;

	Ok(Point { x: x3, y: y3 })
}

/// `2·p`, assuming `p` is a non-zero curve point of odd order.
pub fn double<F: NativeField>(
	b: &CircuitBuilder<F>,
	p: &Point<F>,
	curve: &Curve,
) -> Result<Point<F>> {
	let f = &curve.modulus;

	if let Some(c) = p.as_constant() {
		let p3 = curve.double(&c);
		if p3.infinity {
			return Err(CircuitError::UnsoundUsage(
				"double of constant point is the point at infinity".to_string(),
			));
		}
		return Ok(Point::constant(&p3));
	}

	let (m, x3, y3) = witness_double(b, p, curve);
	foreign_field::assert_almost_reduced(b, &[&m, &x3, &y3], f, false)?;

	// 2·y1·m = 3·x1^2 + a
	let x1x1 = foreign_field::multiply(b, &p.x, &p.x, f)?;
	let mut rhs = Sum::new(x1x1).add(x1x1).add(x1x1);
	if !curve.a.is_zero() {
		rhs = rhs.add(limbs::constant(&curve.a));
	}
	foreign_field::assert_mul(b, Sum::new(p.y).add(p.y), m, rhs, f, "slope")?;

	// m^2 = 2·x1 + x3
	foreign_field::assert_mul(b, m, m, Sum::new(p.x).add(p.x).add(x3), f, "sum x")?;

	// (x1 - x3)·m = y1 + y3
	foreign_field::assert_mul(
		b,
		Sum::new(p.x).sub(x3),
		m,
		Sum::new(p.y).add(y3),
		f,
		"sum y",
	)?;

	Ok(Point { x: x3, y: y3 })
}

pub fn negate<F: NativeField>(
	b: &CircuitBuilder<F>,
	p: &Point<F>,
	curve: &Curve,
) -> Result<Point<F>> {
	Ok(Point {
		x: p.x,
		y: foreign_field::negate(b, &p.y, &curve.modulus)?,
	})
}

/// Assert `y^2 = x^3 + a·x + b`.
pub fn assert_on_curve<F: NativeField>(
	b: &CircuitBuilder<F>,
	p: &Point<F>,
	curve: &Curve,
) -> Result<()> {
	let f = &curve.modulus;
	let x2 = foreign_field::multiply(b, &p.x, &p.x, f)?;

	// bound all multiplication inputs, so a prover cannot slip in large
	// multiples of f
	foreign_field::assert_almost_reduced(b, &[&x2, &p.x, &p.y], f, false)?;

	let y2 = foreign_field::multiply(b, &p.y, &p.y, f)?;
	let y2_minus_b = Sum::new(y2).sub(limbs::constant(&curve.b));

	// (x^2 + a)·x = y^2 - b
	let mut x2_plus_a = Sum::new(x2);
	if !curve.a.is_zero() {
		x2_plus_a = x2_plus_a.add(limbs::constant(&curve.a));
	}
	foreign_field::assert_mul(b, x2_plus_a, p.x, y2_minus_b, f, "on curve")
}

fn pow2_limb<F: NativeField>() -> F {
	F::from_biguint(&(BigUint::one() << LIMB_BITS))
}

fn witness_add<F: NativeField>(
	b: &CircuitBuilder<F>,
	p1: &Point<F>,
	p2: &Point<F>,
	f: &BigUint,
) -> (Field3<F>, Field3<F>, Field3<F>) {
	let [m0, m1, m2, x30, x31, x32, y30, y31, y32] = b.exists(|| {
		let f = BigInt::from(f.clone());
		let x1 = BigInt::from(limbs::value_of(b, &p1.x));
		let y1 = BigInt::from(limbs::value_of(b, &p1.y));
		let x2 = BigInt::from(limbs::value_of(b, &p2.x));
		let y2 = BigInt::from(limbs::value_of(b, &p2.y));

		let delta_x = (&x1 - &x2).mod_floor(&f);
		let denom = invert_or_zero(&delta_x, &f);
		let m = ((&y1 - &y2) * denom).mod_floor(&f);
		let x3 = (&m * &m - &x1 - &x2).mod_floor(&f);
		let y3 = (&m * (&x1 - &x3) - &y1).mod_floor(&f);
		split_signed(&m, &x3, &y3)
	});
	(
		[m0, m1, m2],
		[x30, x31, x32],
		[y30, y31, y32],
	)
}

fn witness_double<F: NativeField>(
	b: &CircuitBuilder<F>,
	p: &Point<F>,
	curve: &Curve,
) -> (Field3<F>, Field3<F>, Field3<F>) {
	let [m0, m1, m2, x30, x31, x32, y30, y31, y32] = b.exists(|| {
		let f = BigInt::from(curve.modulus.clone());
		let a = BigInt::from(curve.a.clone());
		let x1 = BigInt::from(limbs::value_of(b, &p.x));
		let y1 = BigInt::from(limbs::value_of(b, &p.y));

		let denom = invert_or_zero(&(&y1 * 2u32).mod_floor(&f), &f);
		let m = (((&x1 * &x1).mod_floor(&f) * 3u32 + &a) * denom).mod_floor(&f);
		let x3 = (&m * &m - &x1 * 2u32).mod_floor(&f);
		let y3 = (&m * (&x1 - &x3) - &y1).mod_floor(&f);
		split_signed(&m, &x3, &y3)
	});
	(
		[m0, m1, m2],
		[x30, x31, x32],
		[y30, y31, y32],
	)
}

fn invert_or_zero(x: &BigInt, f: &BigInt) -> BigInt {
	let x = x.to_biguint().expect("reduced representative");
	let f = f.to_biguint().expect("modulus is positive");
	mod_inverse(&x, &f).map_or_else(BigInt::zero, BigInt::from)
}

fn split_signed(m: &BigInt, x3: &BigInt, y3: &BigInt) -> [BigInt; 9] {
	let split = |v: &BigInt| {
		limbs::split(&v.to_biguint().expect("reduced representative")).map(BigInt::from)
	};
	let [m0, m1, m2] = split(m);
	let [x30, x31, x32] = split(x3);
	let [y30, y31, y32] = split(y3);
	[m0, m1, m2, x30, x31, x32, y30, y31, y32]
}
