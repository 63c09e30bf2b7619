// Copyright 2025 Irreducible Inc.
//! End-to-end tests of the curve gadgets over secp256k1, cross-checked
//! against the k256 crate.

use ferrite_frontend::{CircuitBuilder, Mode};
use k256::{
	ecdsa::{signature::hazmat::PrehashSigner, SigningKey},
	elliptic_curve::{sec1::ToEncodedPoint, PrimeField},
	ProjectivePoint, Scalar,
};
use num_bigint::{BigUint, RandBigInt};
use pasta_curves::Fp;
use rand::{rngs::StdRng, SeedableRng};

use super::{
	arithmetic::{add, assert_on_curve, double, negate},
	curve::{Affine, Curve},
	ecdsa,
	ecdsa::Signature,
	point::Point,
	scalar_mul::{multi_scalar_mul, scale, MsmMode},
};
use crate::{limbs, limbs::Field3, range_check::multi_range_check};

fn to_bytes32(x: &BigUint) -> [u8; 32] {
	let bytes = x.to_bytes_be();
	let mut out = [0u8; 32];
	out[32 - bytes.len()..].copy_from_slice(&bytes);
	out
}

fn to_k256_scalar(x: &BigUint) -> Scalar {
	Option::from(Scalar::from_repr(to_bytes32(x).into())).expect("scalar in range")
}

fn from_k256(p: &ProjectivePoint) -> Affine {
	let enc = p.to_affine().to_encoded_point(false);
	Affine::new(
		BigUint::from_bytes_be(enc.x().expect("not infinity")),
		BigUint::from_bytes_be(enc.y().expect("not infinity")),
	)
}

fn witness_point(b: &CircuitBuilder<Fp>, p: &Affine) -> Point<Fp> {
	let p = p.clone();
	Point::witness(b, move || p).unwrap()
}

fn witness_scalar(b: &CircuitBuilder<Fp>, s: &BigUint) -> Field3<Fp> {
	let limbs = limbs::exists(b, || s.clone());
	multi_range_check(b, &limbs).unwrap();
	limbs
}

fn random_point(curve: &Curve, rng: &mut StdRng) -> Affine {
	let s = rng.gen_biguint_below(&curve.order);
	curve.scale(&curve.generator, &s)
}

#[test]
fn test_off_circuit_scale_matches_k256() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(30);
	for _ in 0..5 {
		let s = rng.gen_biguint_below(&curve.order);
		let ours = curve.scale(&curve.generator, &s);
		let theirs = from_k256(&(ProjectivePoint::GENERATOR * to_k256_scalar(&s)));
		assert_eq!(ours.x, theirs.x);
		assert_eq!(ours.y, theirs.y);
	}
}

#[test]
fn test_add_matches_reference() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(31);
	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	for _ in 0..3 {
		let p = random_point(&curve, &mut rng);
		let q = random_point(&curve, &mut rng);
		let expected = curve.add(&p, &q);

		let pv = witness_point(&b, &p);
		let qv = witness_point(&b, &q);
		let sum = add(&b, &pv, &qv, &curve).unwrap();
		assert_eq!(sum.value_of(&b).x, expected.x);
		assert_eq!(sum.value_of(&b).y, expected.y);
	}
	b.build().verify().unwrap();
}

#[test]
fn test_double_and_negate_match_reference() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(32);
	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let p = random_point(&curve, &mut rng);

	let pv = witness_point(&b, &p);
	let doubled = double(&b, &pv, &curve).unwrap();
	let expected = curve.double(&p);
	assert_eq!(doubled.value_of(&b).x, expected.x);
	assert_eq!(doubled.value_of(&b).y, expected.y);

	let negated = negate(&b, &pv, &curve).unwrap();
	let expected = curve.negate(&p);
	assert_eq!(negated.value_of(&b).y, expected.y);

	b.build().verify().unwrap();
}

#[test]
fn test_add_rejects_equal_x() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(33);
	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let p = random_point(&curve, &mut rng);
	let pv = witness_point(&b, &p);
	let qv = witness_point(&b, &p);
	add(&b, &pv, &qv, &curve).unwrap();
	assert!(b.build().verify().is_err());
}

#[test]
fn test_assert_on_curve() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(34);

	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let p = random_point(&curve, &mut rng);
	let pv = witness_point(&b, &p);
	assert_on_curve(&b, &pv, &curve).unwrap();
	b.build().verify().unwrap();

	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let mut off = random_point(&curve, &mut rng);
	off.y = (&off.y + 1u32) % &curve.modulus;
	let off_v = witness_point(&b, &off);
	assert_on_curve(&b, &off_v, &curve).unwrap();
	assert!(b.build().verify().is_err());
}

#[test]
fn test_scale_matches_k256() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(35);
	let d = rng.gen_biguint_below(&curve.order);
	let s = rng.gen_biguint_below(&curve.order);

	let p = curve.scale(&curve.generator, &d);
	let expected = from_k256(&(ProjectivePoint::GENERATOR
		* (to_k256_scalar(&d) * to_k256_scalar(&s))));

	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let pv = witness_point(&b, &p);
	let sv = witness_scalar(&b, &s);
	let result = scale(&b, &sv, &pv, &curve).unwrap();
	assert_eq!(result.value_of(&b).x, expected.x);
	assert_eq!(result.value_of(&b).y, expected.y);
	b.build().verify().unwrap();
}

#[test]
fn test_multi_scalar_mul_two_points() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(36);
	let u1 = rng.gen_biguint_below(&curve.order);
	let u2 = rng.gen_biguint_below(&curve.order);
	let p = random_point(&curve, &mut rng);

	let expected = curve.add(
		&curve.scale(&curve.generator, &u1),
		&curve.scale(&p, &u2),
	);

	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let g = Point::constant(&curve.generator);
	let pv = witness_point(&b, &p);
	let u1v = witness_scalar(&b, &u1);
	let u2v = witness_scalar(&b, &u2);
	let result = multi_scalar_mul(
		&b,
		&[u1v, u2v],
		&[g, pv],
		&curve,
		&[4, 4],
		MsmMode::AssertNonzero,
		None,
	)
	.unwrap();
	assert_eq!(result.value_of(&b).x, expected.x);
	assert_eq!(result.value_of(&b).y, expected.y);
	b.build().verify().unwrap();
}

#[test]
fn test_scalar_mul_assert_zero() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(37);
	let p = random_point(&curve, &mut rng);

	// order * P = 0
	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let pv = witness_point(&b, &p);
	let order = witness_scalar(&b, &curve.order);
	multi_scalar_mul(
		&b,
		&[order],
		&[pv],
		&curve,
		&[4],
		MsmMode::AssertZero,
		None,
	)
	.unwrap();
	b.build().verify().unwrap();
}

/// Signing message hash 1 with a fixed key must agree with the reference
/// implementation, and the circuit must accept the signature.
#[test]
fn test_ecdsa_verify_signed_one() {
	let curve = Curve::secp256k1();
	let private_key = BigUint::from(123456789u64);
	let msg_hash = BigUint::from(1u32);

	let signing_key = SigningKey::from_bytes(&to_bytes32(&private_key).into()).unwrap();
	let signature: k256::ecdsa::Signature =
		signing_key.sign_prehash(&to_bytes32(&msg_hash)).unwrap();
	let (r_ref, s_ref) = signature.split_scalars();
	let r = BigUint::from_bytes_be(&r_ref.to_bytes());
	let s = BigUint::from_bytes_be(&s_ref.to_bytes());

	let public_key = curve.scale(&curve.generator, &private_key);
	assert_eq!(
		from_k256(&ProjectivePoint::from(*signing_key.verifying_key().as_affine())).x,
		public_key.x
	);

	// reference check
	assert!(ecdsa::verify_constant(&curve, &r, &s, &msg_hash, &public_key));

	// in-circuit check
	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let sig = Signature::witness(&b, || (r.clone(), s.clone())).unwrap();
	let hash_v = witness_scalar(&b, &msg_hash);
	let pk = witness_point(&b, &public_key);
	let ok = ecdsa::verify(&b, &curve, &sig, &hash_v, &pk).unwrap();
	b.assert_true("signature verifies", &ok).unwrap();
	b.build().verify().unwrap();

	// an unrelated public key must make verification return false
	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let other = curve.scale(&curve.generator, &BigUint::from(987654321u64));
	let sig = Signature::witness(&b, || (r.clone(), s.clone())).unwrap();
	let hash_v = witness_scalar(&b, &msg_hash);
	let pk = witness_point(&b, &other);
	let ok = ecdsa::verify(&b, &curve, &sig, &hash_v, &pk).unwrap();
	b.assert_false("signature rejected", &ok).unwrap();
	b.build().verify().unwrap();
}

#[test]
fn test_ecdsa_own_signer_round_trip() {
	let curve = Curve::secp256k1();
	let mut rng = StdRng::seed_from_u64(38);
	let private_key = rng.gen_biguint_below(&curve.order);
	let nonce = rng.gen_biguint_below(&curve.order);
	let msg_hash = rng.gen_biguint_below(&curve.order);

	let (r, s) = ecdsa::sign_with_nonce(&curve, &msg_hash, &private_key, &nonce);
	let public_key = curve.scale(&curve.generator, &private_key);
	assert!(ecdsa::verify_constant(&curve, &r, &s, &msg_hash, &public_key));

	// tampered s must be rejected
	let bad_s = (&s + 1u32) % &curve.order;
	assert!(!ecdsa::verify_constant(&curve, &r, &bad_s, &msg_hash, &public_key));
}

#[test]
fn test_ecdsa_constant_inputs_fold() {
	let curve = Curve::secp256k1();
	let private_key = BigUint::from(42u64);
	let nonce = BigUint::from(77u64);
	let msg_hash = BigUint::from(5u64);
	let (r, s) = ecdsa::sign_with_nonce(&curve, &msg_hash, &private_key, &nonce);
	let public_key = curve.scale(&curve.generator, &private_key);

	let b = CircuitBuilder::<Fp>::new(Mode::Prover);
	let sig = Signature::constant(&r, &s);
	let hash_v = limbs::constant(&msg_hash);
	let pk = Point::constant(&public_key);
	let ok = ecdsa::verify(&b, &curve, &sig, &hash_v, &pk).unwrap();
	assert_eq!(ok.as_constant(), Some(true));
	assert_eq!(b.n_gates(), 0);
}
