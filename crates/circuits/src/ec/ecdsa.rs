// Copyright 2025 Irreducible Inc.
//! In-circuit ECDSA signature verification.

use ferrite_frontend::{BoolVar, CircuitBuilder, NativeField, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::cell::RefCell;

use crate::{
	ec::{
		curve::{Affine, Curve},
		point::Point,
		scalar_mul::{multi_scalar_mul, MsmMode},
	},
	foreign_field::{self, mod_inverse},
	limbs,
	limbs::Field3,
	range_check::multi_range_check,
};

/// An ECDSA signature: two scalars, each in three limbs.
#[derive(Clone, Copy, Debug)]
pub struct Signature<F: NativeField> {
	pub r: Field3<F>,
	pub s: Field3<F>,
}

impl<F: NativeField> Signature<F> {
	pub fn constant(r: &BigUint, s: &BigUint) -> Self {
		Signature { r: limbs::constant(r), s: limbs::constant(s) }
	}

	pub fn is_constant(&self) -> bool {
		limbs::is_constant(&self.r) && limbs::is_constant(&self.s)
	}

	pub fn as_constant(&self) -> Option<(BigUint, BigUint)> {
		Some((limbs::as_constant(&self.r)?, limbs::as_constant(&self.s)?))
	}

	/// Witness a signature and range check its limbs.
	pub fn witness(
		b: &CircuitBuilder<F>,
		compute: impl FnOnce() -> (BigUint, BigUint),
	) -> Result<Self> {
		let sig = RefCell::new(None::<(BigUint, BigUint)>);
		let r = limbs::exists(b, || {
			let (r, s) = compute();
			let out = r.clone();
			*sig.borrow_mut() = Some((r, s));
			out
		});
		let s = limbs::exists(b, || sig.borrow().as_ref().expect("computed above").1.clone());
		multi_range_check(b, &r)?;
		multi_range_check(b, &s)?;
		Ok(Signature { r, s })
	}
}

/// Verify an ECDSA signature against a message hash and public key.
///
/// The public key is taken on trust: callers verifying untrusted keys should
/// combine this with [`assert_on_curve`](super::arithmetic::assert_on_curve)
/// and, on cofactor curves, a subgroup check.
///
/// `r != 0` and `s != 0` are proven as part of verification. `s` must be
/// canonical or verification fails with an error; a non-canonical `r` makes
/// the result `false`.
pub fn verify<F: NativeField>(
	b: &CircuitBuilder<F>,
	curve: &Curve,
	signature: &Signature<F>,
	msg_hash: &Field3<F>,
	public_key: &Point<F>,
) -> Result<BoolVar<F>> {
	if signature.is_constant() && limbs::is_constant(msg_hash) && public_key.is_constant() {
		let (r, s) = signature.as_constant().expect("constant signature");
		let msg_hash = limbs::as_constant(msg_hash).expect("constant hash");
		let public_key = public_key.as_constant().expect("constant key");
		return Ok(BoolVar::constant(verify_constant(
			curve,
			&r,
			&s,
			&msg_hash,
			&public_key,
		)));
	}

	let q = &curve.order;

	// r = 0 would erase the public key contribution, so prove both scalars
	// invertible
	foreign_field::inverse(b, &signature.r, q)?;
	let s_inv = foreign_field::inverse(b, &signature.s, q)?;
	let u1 = foreign_field::multiply(b, msg_hash, &s_inv, q)?;
	let u2 = foreign_field::multiply(b, &signature.r, &s_inv, q)?;

	let g = Point::constant(&curve.generator);
	// proves R != 0, which is part of ECDSA verification
	let r_point = multi_scalar_mul(
		b,
		&[u1, u2],
		&[g, *public_key],
		curve,
		&[4, 4],
		MsmMode::AssertNonzero,
		None,
	)?;

	// reduce R.x modulo the curve order
	let one = limbs::constant(&BigUint::one());
	let rx = foreign_field::multiply(b, &r_point.x, &one, q)?;

	// Rx must be canonical: otherwise a prover could shift it by a multiple
	// of the order and flip the verdict on a valid signature
	foreign_field::assert_less_than_constant(b, &rx, q)?;

	// s must be canonical as well
	foreign_field::assert_less_than_constant(b, &signature.s, q)?;

	let mut equal = BoolVar::constant(true);
	for (rx_limb, r_limb) in rx.iter().zip(&signature.r) {
		let limb_equal = b.equals(rx_limb, r_limb);
		equal = b.bool_and(&equal, &limb_equal);
	}
	Ok(equal)
}

/// Bigint reference implementation of ECDSA verification.
pub fn verify_constant(
	curve: &Curve,
	r: &BigUint,
	s: &BigUint,
	msg_hash: &BigUint,
	public_key: &Affine,
) -> bool {
	let q = &curve.order;
	if public_key.infinity {
		return false;
	}
	if curve.has_cofactor() && !curve.is_in_subgroup(public_key) {
		return false;
	}
	if r.is_zero() || r >= q || s.is_zero() || s >= q {
		return false;
	}

	let s_inv = mod_inverse(s, q).expect("s is a unit");
	let u1 = msg_hash * &s_inv % q;
	let u2 = r * &s_inv % q;

	let r_point = curve.add(
		&curve.scale(&curve.generator, &u1),
		&curve.scale(public_key, &u2),
	);
	if r_point.infinity {
		return false;
	}
	&r_point.x % q == *r
}

/// Produce a signature with an explicit nonce. The nonce must be sampled
/// uniformly at random for real use.
pub fn sign_with_nonce(
	curve: &Curve,
	msg_hash: &BigUint,
	private_key: &BigUint,
	nonce: &BigUint,
) -> (BigUint, BigUint) {
	let q = &curve.order;
	let r_point = curve.scale(&curve.generator, nonce);
	assert!(!r_point.infinity, "bad nonce");
	let r = &r_point.x % q;
	let k_inv = mod_inverse(nonce, q).expect("nonce is a unit");
	let s = (msg_hash + &r * private_key) % q * k_inv % q;
	(r, s)
}
