// Copyright 2025 Irreducible Inc.
//! 88-bit range checks.
//!
//! A multi-range-check proves three values are 88-bit limbs using two
//! `RangeCheck0` rows and one `RangeCheck1` row. The compact variant
//! additionally proves a 176-bit value packs two of the limbs.

use ferrite_frontend::{
	CircuitBuilder, CircuitError, FieldVar, Gate, NativeField, RangePack, Result, Wire,
};
use num_bigint::{BigInt, BigUint};
use num_traits::One;

use crate::limbs::{self, Field3, LIMB_BITS, TWO_LIMB_BITS};

fn bit_slice(x: &BigUint, start: u32, len: u32) -> BigInt {
	BigInt::from((x >> start) & ((BigUint::one() << len) - 1u32))
}

fn range_check0<F: NativeField>(b: &CircuitBuilder<F>, x: Wire, compact: bool) {
	let var = FieldVar::Var(x);
	let crumbs = b.exists(|| {
		let xx = b.value_biguint(&var);
		core::array::from_fn::<_, 8, _>(|i| bit_slice(&xx, 2 * i as u32, 2))
	});
	let slices12 = b.exists(|| {
		let xx = b.value_biguint(&var);
		core::array::from_fn::<_, 6, _>(|j| bit_slice(&xx, 16 + 12 * j as u32, 12))
	});
	b.push_gate(Gate::RangeCheck0 {
		value: x,
		slices12: slices12.map(|s| b.to_var(&s)),
		crumbs: crumbs.map(|c| b.to_var(&c)),
		compact,
	});
}

fn range_check1<F: NativeField>(b: &CircuitBuilder<F>, z: Wire, pack: Option<RangePack>) {
	let var = FieldVar::Var(z);
	let crumbs = b.exists(|| {
		let zz = b.value_biguint(&var);
		core::array::from_fn::<_, 20, _>(|i| {
			if i < 19 {
				bit_slice(&zz, 2 * i as u32, 2)
			} else {
				bit_slice(&zz, 86, 2)
			}
		})
	});
	let slices12 = b.exists(|| {
		let zz = b.value_biguint(&var);
		core::array::from_fn::<_, 4, _>(|j| bit_slice(&zz, 38 + 12 * j as u32, 12))
	});
	b.push_gate(Gate::RangeCheck1 {
		value: z,
		pack,
		slices12: slices12.map(|s| b.to_var(&s)),
		crumbs: crumbs.map(|c| b.to_var(&c)),
	});
}

/// Assert that all three limbs are in `[0, 2^88)`.
pub fn multi_range_check<F: NativeField>(b: &CircuitBuilder<F>, x: &Field3<F>) -> Result<()> {
	if limbs::is_constant(x) {
		for limb in x {
			let v = limb.as_constant().expect("constant limb").to_biguint();
			if v.bits() > LIMB_BITS as u64 {
				return Err(CircuitError::OutOfRange(format!(
					"limb {v} exceeds {LIMB_BITS} bits"
				)));
			}
		}
		return Ok(());
	}
	let [w0, w1, w2] = limbs::to_wires(b, x);
	range_check0(b, w0, false);
	range_check0(b, w1, false);
	range_check1(b, w2, None);
	Ok(())
}

/// Assert that `xy < 2^176` and `z < 2^88`, and return limbs `[x, y, z]` with
/// `xy = x + 2^88·y` proven.
pub fn compact_multi_range_check<F: NativeField>(
	b: &CircuitBuilder<F>,
	xy: &FieldVar<F>,
	z: &FieldVar<F>,
) -> Result<Field3<F>> {
	if let (Some(cxy), Some(cz)) = (xy.as_constant(), z.as_constant()) {
		let (cxy, cz) = (cxy.to_biguint(), cz.to_biguint());
		if cxy.bits() > TWO_LIMB_BITS as u64 || cz.bits() > LIMB_BITS as u64 {
			return Err(CircuitError::OutOfRange(format!(
				"compact range check: {cxy} or {cz} out of range"
			)));
		}
		let lo = limbs::split2(&cxy);
		return Ok([
			FieldVar::Constant(F::from_biguint(&lo[0])),
			FieldVar::Constant(F::from_biguint(&lo[1])),
			*z,
		]);
	}
	let wxy = b.to_var(xy);
	let wz = b.to_var(z);
	let [x, y] = b.exists(|| {
		let v = b.value_biguint(&FieldVar::Var(wxy));
		limbs::split2(&v).map(BigInt::from)
	});
	let (wx, wy) = (b.to_var(&x), b.to_var(&y));

	range_check0(b, wz, false);
	range_check0(b, wx, true);
	range_check1(b, wy, Some(RangePack { packed: wxy, low: wx }));

	Ok([x, y, FieldVar::Var(wz)])
}

#[cfg(test)]
mod tests {
	use ferrite_frontend::Mode;
	use num_bigint::RandBigInt;
	use pasta_curves::Fp;
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;

	fn witness_limbs(b: &CircuitBuilder<Fp>, x: &BigUint) -> Field3<Fp> {
		limbs::exists(b, || x.clone())
	}

	#[test]
	fn test_multi_range_check_accepts_limbs() {
		let mut rng = StdRng::seed_from_u64(1);
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		for _ in 0..10 {
			let x = rng.gen_biguint(264);
			let limbs = witness_limbs(&b, &x);
			multi_range_check(&b, &limbs).unwrap();
		}
		b.build().verify().unwrap();
	}

	#[test]
	fn test_multi_range_check_rejects_oversized_limb() {
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let too_big = FieldVar::Var(b.alloc(Fp::from_biguint(&(BigUint::one() << 88))));
		let x = [too_big, FieldVar::zero(), FieldVar::zero()];
		multi_range_check(&b, &x).unwrap();
		assert!(b.build().verify().is_err());
	}

	#[test]
	fn test_constant_out_of_range_is_synchronous() {
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = [
			FieldVar::Constant(Fp::from_biguint(&(BigUint::one() << 88))),
			FieldVar::zero(),
			FieldVar::zero(),
		];
		assert!(matches!(multi_range_check(&b, &x), Err(CircuitError::OutOfRange(_))));
	}

	#[test]
	fn test_compact_multi_range_check() {
		let mut rng = StdRng::seed_from_u64(2);
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let xy_val = rng.gen_biguint(176);
		let z_val = rng.gen_biguint(88);
		let xy = FieldVar::Var(b.alloc(Fp::from_biguint(&xy_val)));
		let z = FieldVar::Var(b.alloc(Fp::from_biguint(&z_val)));
		let x3 = compact_multi_range_check(&b, &xy, &z).unwrap();
		assert_eq!(limbs::value_of(&b, &x3), (&xy_val) + (z_val << 176));
		b.build().verify().unwrap();
	}
}
