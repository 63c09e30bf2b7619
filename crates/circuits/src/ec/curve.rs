// Copyright 2025 Irreducible Inc.
//! Curve parameters and off-circuit affine arithmetic.
//!
//! The off-circuit operations are the reference semantics the gadgets are
//! checked against, and also what the gadgets fall back to on constant
//! inputs.

use hex_literal::hex;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};

use crate::{ec::glv::GlvParams, foreign_field::mod_inverse};

/// Affine point, with an explicit marker for the point at infinity.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Affine {
	pub x: BigUint,
	pub y: BigUint,
	pub infinity: bool,
}

impl Affine {
	pub fn zero() -> Self {
		Affine { x: BigUint::zero(), y: BigUint::zero(), infinity: true }
	}

	pub fn new(x: BigUint, y: BigUint) -> Self {
		Affine { x, y, infinity: false }
	}
}

/// A short Weierstrass curve `y^2 = x^3 + ax + b` with affine arithmetic over
/// bigints.
#[derive(Clone, Debug)]
pub struct Curve {
	/// Base field modulus.
	pub modulus: BigUint,
	/// Group order.
	pub order: BigUint,
	pub a: BigUint,
	pub b: BigUint,
	pub generator: Affine,
	pub cofactor: BigUint,
	/// GLV endomorphism parameters, when the curve has one.
	pub endo: Option<GlvParams>,
}

impl Curve {
	pub fn secp256k1() -> Self {
		let modulus = BigUint::from_bytes_be(&hex!(
			"fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f"
		));
		let order = BigUint::from_bytes_be(&hex!(
			"fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"
		));
		let generator = Affine::new(
			BigUint::from_bytes_be(&hex!(
				"79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
			)),
			BigUint::from_bytes_be(&hex!(
				"483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
			)),
		);
		// cube roots of unity in the scalar and base field
		let lambda = BigUint::from_bytes_be(&hex!(
			"5363ad4cc05c30e0a5261c028812645a122e22ea20816678df02967c1b23bd72"
		));
		let beta = BigUint::from_bytes_be(&hex!(
			"7ae96a2b657c07106e64479eac3434e99cf0497512f58995c1396c28719501ee"
		));
		let endo = Some(GlvParams::new(lambda, beta, &order));
		Curve {
			modulus,
			order,
			a: BigUint::zero(),
			b: BigUint::from(7u32),
			generator,
			cofactor: BigUint::one(),
			endo,
		}
	}

	pub fn has_cofactor(&self) -> bool {
		!self.cofactor.is_one()
	}

	fn field_mod(&self, x: &BigUint) -> BigUint {
		x % &self.modulus
	}

	pub fn negate(&self, p: &Affine) -> Affine {
		if p.infinity {
			return Affine::zero();
		}
		let y = if p.y.is_zero() { BigUint::zero() } else { &self.modulus - &p.y };
		Affine::new(p.x.clone(), y)
	}

	pub fn add(&self, p: &Affine, q: &Affine) -> Affine {
		if p.infinity {
			return q.clone();
		}
		if q.infinity {
			return p.clone();
		}
		if p.x == q.x {
			if p.y == q.y {
				return self.double(p);
			}
			// q = -p
			return Affine::zero();
		}
		let f = &self.modulus;
		let dx = self.field_mod(&(f + &q.x - &p.x));
		let dy = self.field_mod(&(f + &q.y - &p.y));
		let m = self.field_mod(&(dy * mod_inverse(&dx, f).expect("dx nonzero")));
		let x3 = self.field_mod(&(f + f + &m * &m - &p.x - &q.x));
		let y3 = self.field_mod(&(f + f + &m * (f + &p.x - &x3) - &p.y));
		Affine::new(x3, y3)
	}

	pub fn double(&self, p: &Affine) -> Affine {
		if p.infinity {
			return Affine::zero();
		}
		if p.y.is_zero() {
			return Affine::zero();
		}
		let f = &self.modulus;
		let num = self.field_mod(&(3u32 * &p.x * &p.x + &self.a));
		let denom = mod_inverse(&self.field_mod(&(2u32 * &p.y)), f).expect("y nonzero");
		let m = self.field_mod(&(num * denom));
		let x3 = self.field_mod(&(f + f + &m * &m - &p.x - &p.x));
		let y3 = self.field_mod(&(f + f + &m * (f + &p.x - &x3) - &p.y));
		Affine::new(x3, y3)
	}

	pub fn sub(&self, p: &Affine, q: &Affine) -> Affine {
		self.add(p, &self.negate(q))
	}

	/// `s·p` by double-and-add.
	pub fn scale(&self, p: &Affine, s: &BigUint) -> Affine {
		let mut acc = Affine::zero();
		for i in (0..s.bits()).rev() {
			acc = self.double(&acc);
			if s.bit(i) {
				acc = self.add(&acc, p);
			}
		}
		acc
	}

	pub fn is_on_curve(&self, p: &Affine) -> bool {
		if p.infinity {
			return true;
		}
		let y2 = self.field_mod(&(&p.y * &p.y));
		let rhs = self.field_mod(&(&p.x * &p.x * &p.x + &self.a * &p.x + &self.b));
		y2 == rhs
	}

	pub fn is_in_subgroup(&self, p: &Affine) -> bool {
		self.scale(p, &self.order).infinity
	}

	/// Square root mod the base field, via Tonelli-Shanks.
	pub fn sqrt(&self, x: &BigUint) -> Option<BigUint> {
		sqrt_mod(x, &self.modulus)
	}

	/// Map an x coordinate to a curve point by incrementing it until the curve
	/// equation has a solution. Clears the cofactor if there is one.
	pub fn simple_map_to_curve(&self, x: &BigUint) -> Affine {
		let f = &self.modulus;
		let mut x = x.clone();
		loop {
			x = (&x + 1u32) % f;
			let y2 = (&x * &x * &x + &self.a * &x + &self.b) % f;
			if let Some(y) = self.sqrt(&y2) {
				let mut p = Affine::new(x, y);
				if self.has_cofactor() {
					p = self.scale(&p, &self.cofactor);
				}
				return p;
			}
		}
	}

	/// Deterministic curve point with no known discrete logarithm, used as
	/// the starting aggregator of scalar multiplication ladders.
	///
	/// Derived by hashing the curve parameters and mapping the digest to an
	/// x coordinate.
	pub fn initial_aggregator(&self) -> Affine {
		let mut h = Sha256::new();
		h.update(b"initial-aggregator");
		h.update(self.modulus.to_bytes_le());
		h.update(self.order.to_bytes_le());
		h.update(self.a.to_bytes_le());
		h.update(self.b.to_bytes_le());
		let digest = h.finalize();
		let x = BigUint::from_bytes_le(&digest) % &self.modulus;
		self.simple_map_to_curve(&x)
	}
}

/// Tonelli-Shanks square root mod an odd prime.
fn sqrt_mod(x: &BigUint, p: &BigUint) -> Option<BigUint> {
	if x.is_zero() {
		return Some(BigUint::zero());
	}
	let one = BigUint::one();
	let p_minus_1 = p - &one;
	// Euler criterion
	if x.modpow(&(&p_minus_1 >> 1), p) != one {
		return None;
	}
	if p % 4u32 == BigUint::from(3u32) {
		return Some(x.modpow(&((p + &one) >> 2), p));
	}

	// write p - 1 = q·2^s with q odd
	let s = p_minus_1.trailing_zeros().expect("p > 1");
	let q = &p_minus_1 >> s;

	// find a non-residue
	let mut z = BigUint::from(2u32);
	while z.modpow(&(&p_minus_1 >> 1), p) == one {
		z += 1u32;
	}

	let mut m = s;
	let mut c = z.modpow(&q, p);
	let mut t = x.modpow(&q, p);
	let mut r = x.modpow(&((&q + &one) >> 1), p);

	while t != one {
		// find least i with t^(2^i) = 1
		let mut i = 0u64;
		let mut t2 = t.clone();
		while t2 != one {
			t2 = &t2 * &t2 % p;
			i += 1;
		}
		let b = c.modpow(&(BigUint::one() << (m - i - 1)), p);
		m = i;
		c = &b * &b % p;
		t = t * &c % p;
		r = r * &b % p;
	}
	Some(r)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_generator_on_curve() {
		let curve = Curve::secp256k1();
		assert!(curve.is_on_curve(&curve.generator));
	}

	#[test]
	fn test_scale_by_order_is_zero() {
		let curve = Curve::secp256k1();
		let order = curve.order.clone();
		assert!(curve.scale(&curve.generator, &order).infinity);
	}

	#[test]
	fn test_add_double_agree() {
		let curve = Curve::secp256k1();
		let g = curve.generator.clone();
		assert_eq!(curve.add(&g, &g), curve.double(&g));
		let g3 = curve.add(&curve.double(&g), &g);
		assert_eq!(curve.scale(&g, &BigUint::from(3u32)), g3);
	}

	#[test]
	fn test_initial_aggregator_is_on_curve() {
		let curve = Curve::secp256k1();
		let ia = curve.initial_aggregator();
		assert!(!ia.infinity);
		assert!(curve.is_on_curve(&ia));
	}

	#[test]
	fn test_sqrt() {
		let curve = Curve::secp256k1();
		let x = BigUint::from(1234u32);
		let sq = (&x * &x) % &curve.modulus;
		let root = curve.sqrt(&sq).unwrap();
		assert!(root == x || root == &curve.modulus - &x);
	}
}
