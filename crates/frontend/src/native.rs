// Copyright 2025 Irreducible Inc.
//! Gadgets over the generic gate: arithmetic, comparisons and small helper
//! constraints on native field vars.
//!
//! Everything here folds constants eagerly and emits gates only when a
//! variable forces it. Assertions on constants that cannot hold fail
//! synchronously with a typed error instead of producing an unsatisfiable row.

use num_bigint::BigInt;

use crate::{
	builder::CircuitBuilder,
	error::{CircuitError, Result},
	field::NativeField,
	gate::GenericCoeffs,
	var::{BoolVar, FieldVar, Wire},
};

impl<F: NativeField> CircuitBuilder<F> {
	fn alloc_computed(&self, compute: impl FnOnce() -> F) -> Wire {
		if self.is_prover() {
			let v = compute();
			self.alloc(v)
		} else {
			self.alloc(F::ZERO)
		}
	}

	/// `x + k·y`.
	pub fn add_scaled(&self, x: &FieldVar<F>, y: &FieldVar<F>, k: F) -> FieldVar<F> {
		match (x, y) {
			(FieldVar::Constant(cx), FieldVar::Constant(cy)) => {
				FieldVar::Constant(*cx + k * *cy)
			}
			(FieldVar::Constant(cx), FieldVar::Var(wy)) => {
				let cx = *cx;
				let wy = *wy;
				let out = self.alloc_computed(|| cx + k * self.value(y));
				self.assert_generic(
					"add",
					GenericCoeffs {
						left: k,
						output: -F::ONE,
						constant: cx,
						..GenericCoeffs::zero()
					},
					[wy, wy, out],
				);
				FieldVar::Var(out)
			}
			(FieldVar::Var(wx), FieldVar::Constant(cy)) => {
				let cy = *cy;
				let wx = *wx;
				let out = self.alloc_computed(|| self.value(x) + k * cy);
				self.assert_generic(
					"add",
					GenericCoeffs {
						left: F::ONE,
						output: -F::ONE,
						constant: k * cy,
						..GenericCoeffs::zero()
					},
					[wx, wx, out],
				);
				FieldVar::Var(out)
			}
			(FieldVar::Var(wx), FieldVar::Var(wy)) => {
				let (wx, wy) = (*wx, *wy);
				let out = self.alloc_computed(|| self.value(x) + k * self.value(y));
				self.assert_generic(
					"add",
					GenericCoeffs {
						left: F::ONE,
						right: k,
						output: -F::ONE,
						..GenericCoeffs::zero()
					},
					[wx, wy, out],
				);
				FieldVar::Var(out)
			}
		}
	}

	pub fn add(&self, x: &FieldVar<F>, y: &FieldVar<F>) -> FieldVar<F> {
		self.add_scaled(x, y, F::ONE)
	}

	pub fn sub(&self, x: &FieldVar<F>, y: &FieldVar<F>) -> FieldVar<F> {
		self.add_scaled(x, y, -F::ONE)
	}

	pub fn add_const(&self, x: &FieldVar<F>, c: F) -> FieldVar<F> {
		self.add_scaled(x, &FieldVar::Constant(c), F::ONE)
	}

	/// `k·x`.
	pub fn scale(&self, k: F, x: &FieldVar<F>) -> FieldVar<F> {
		match x {
			FieldVar::Constant(c) => FieldVar::Constant(k * *c),
			FieldVar::Var(wx) => {
				let wx = *wx;
				let out = self.alloc_computed(|| k * self.value(x));
				self.assert_generic(
					"scale",
					GenericCoeffs { left: k, output: -F::ONE, ..GenericCoeffs::zero() },
					[wx, wx, out],
				);
				FieldVar::Var(out)
			}
		}
	}

	pub fn neg(&self, x: &FieldVar<F>) -> FieldVar<F> {
		self.scale(-F::ONE, x)
	}

	pub fn mul(&self, x: &FieldVar<F>, y: &FieldVar<F>) -> FieldVar<F> {
		match (x, y) {
			(FieldVar::Constant(cx), _) => self.scale(*cx, y),
			(_, FieldVar::Constant(cy)) => self.scale(*cy, x),
			(FieldVar::Var(wx), FieldVar::Var(wy)) => {
				let (wx, wy) = (*wx, *wy);
				let out = self.alloc_computed(|| self.value(x) * self.value(y));
				self.assert_generic(
					"mul",
					GenericCoeffs { mul: F::ONE, output: -F::ONE, ..GenericCoeffs::zero() },
					[wx, wy, out],
				);
				FieldVar::Var(out)
			}
		}
	}

	/// `a·x·y + b·x + c·y + d` for coefficients `[a, b, c, d]`.
	pub fn bilinear(&self, x: &FieldVar<F>, y: &FieldVar<F>, coeffs: [F; 4]) -> FieldVar<F> {
		let [a, b, c, d] = coeffs;
		match (x, y) {
			(FieldVar::Constant(cx), _) => {
				// (a·cx + c)·y + (b·cx + d)
				let lin = self.scale(a * *cx + c, y);
				self.add_const(&lin, b * *cx + d)
			}
			(_, FieldVar::Constant(cy)) => {
				let lin = self.scale(a * *cy + b, x);
				self.add_const(&lin, c * *cy + d)
			}
			(FieldVar::Var(wx), FieldVar::Var(wy)) => {
				let (wx, wy) = (*wx, *wy);
				let out = self.alloc_computed(|| {
					let (vx, vy) = (self.value(x), self.value(y));
					a * vx * vy + b * vx + c * vy + d
				});
				self.assert_generic(
					"bilinear",
					GenericCoeffs { mul: a, left: b, right: c, output: -F::ONE, constant: d },
					[wx, wy, out],
				);
				FieldVar::Var(out)
			}
		}
	}

	/// Assert `a·x·y + b·x + c·y + d = 0`.
	pub fn assert_bilinear(
		&self,
		label: impl Into<String>,
		x: &FieldVar<F>,
		y: &FieldVar<F>,
		coeffs: [F; 4],
	) -> Result<()> {
		if let (FieldVar::Var(wx), FieldVar::Var(wy)) = (x, y) {
			let [a, b, c, d] = coeffs;
			self.assert_generic(
				label,
				GenericCoeffs { mul: a, left: b, right: c, constant: d, ..GenericCoeffs::zero() },
				[*wx, *wy, *wx],
			);
			return Ok(());
		}
		let lhs = self.bilinear(x, y, coeffs);
		self.assert_equal(label, &lhs, &FieldVar::zero())
	}

	pub fn assert_equal(
		&self,
		label: impl Into<String>,
		x: &FieldVar<F>,
		y: &FieldVar<F>,
	) -> Result<()> {
		let label = label.into();
		match (x, y) {
			(FieldVar::Constant(cx), FieldVar::Constant(cy)) => {
				if cx != cy {
					return Err(CircuitError::UnsoundUsage(format!(
						"constant assertion failed: {label}"
					)));
				}
				Ok(())
			}
			(FieldVar::Var(wx), FieldVar::Constant(c))
			| (FieldVar::Constant(c), FieldVar::Var(wx)) => {
				self.assert_generic(
					label,
					GenericCoeffs { left: F::ONE, constant: -*c, ..GenericCoeffs::zero() },
					[*wx, *wx, *wx],
				);
				Ok(())
			}
			(FieldVar::Var(wx), FieldVar::Var(wy)) => {
				self.assert_generic(
					label,
					GenericCoeffs { left: F::ONE, right: -F::ONE, ..GenericCoeffs::zero() },
					[*wx, *wy, *wx],
				);
				Ok(())
			}
		}
	}

	/// Assert `x·y = z`.
	pub fn assert_mul(
		&self,
		label: impl Into<String>,
		x: &FieldVar<F>,
		y: &FieldVar<F>,
		z: &FieldVar<F>,
	) -> Result<()> {
		match (x, y, z) {
			(FieldVar::Var(wx), FieldVar::Var(wy), FieldVar::Var(wz)) => {
				self.assert_generic(
					label,
					GenericCoeffs { mul: F::ONE, output: -F::ONE, ..GenericCoeffs::zero() },
					[*wx, *wy, *wz],
				);
				Ok(())
			}
			(FieldVar::Var(wx), FieldVar::Var(wy), FieldVar::Constant(cz)) => {
				self.assert_generic(
					label,
					GenericCoeffs { mul: F::ONE, constant: -*cz, ..GenericCoeffs::zero() },
					[*wx, *wy, *wx],
				);
				Ok(())
			}
			_ => {
				let prod = self.mul(x, y);
				self.assert_equal(label, &prod, z)
			}
		}
	}

	/// Constrain `x` to be 0 or 1.
	pub fn assert_bool(&self, label: impl Into<String>, x: &FieldVar<F>) -> Result<BoolVar<F>> {
		match x {
			FieldVar::Constant(c) => {
				if *c != F::ZERO && *c != F::ONE {
					return Err(CircuitError::UnsoundUsage(format!(
						"constant is not a bit: {}",
						label.into()
					)));
				}
				Ok(BoolVar::from_checked(*x))
			}
			FieldVar::Var(wx) => {
				// x·x - x = 0
				self.assert_generic(
					label,
					GenericCoeffs { mul: F::ONE, left: -F::ONE, ..GenericCoeffs::zero() },
					[*wx, *wx, *wx],
				);
				Ok(BoolVar::from_checked(*x))
			}
		}
	}

	/// `x == 0`, as a constrained bit.
	pub fn is_zero(&self, x: &FieldVar<F>) -> BoolVar<F> {
		let wx = match x {
			FieldVar::Constant(c) => return BoolVar::constant(*c == F::ZERO),
			FieldVar::Var(wx) => *wx,
		};
		let [z, x_inv] = self.exists(|| {
			let v = self.value(x);
			if v == F::ZERO {
				[BigInt::from(1), BigInt::from(0)]
			} else {
				let inv = Option::<F>::from(v.invert()).expect("nonzero element");
				[BigInt::from(0), BigInt::from(inv.to_biguint())]
			}
		});
		let (wz, winv) = (self.to_var(&z), self.to_var(&x_inv));
		// x·z = 0, so z = 0 whenever x != 0.
		self.assert_generic(
			"is_zero: x*z = 0",
			GenericCoeffs { mul: F::ONE, ..GenericCoeffs::zero() },
			[wx, wz, wx],
		);
		// x·x_inv + z - 1 = 0, so z = 1 whenever x = 0.
		self.assert_generic(
			"is_zero: x*inv = 1 - z",
			GenericCoeffs { mul: F::ONE, output: F::ONE, constant: -F::ONE, ..GenericCoeffs::zero() },
			[wx, winv, wz],
		);
		BoolVar::from_checked(z)
	}

	pub fn equals(&self, x: &FieldVar<F>, y: &FieldVar<F>) -> BoolVar<F> {
		if let (FieldVar::Constant(cx), FieldVar::Constant(cy)) = (x, y) {
			return BoolVar::constant(cx == cy);
		}
		let diff = self.sub(x, y);
		self.is_zero(&diff)
	}

	/// `if cond { t } else { f }`.
	pub fn select(&self, cond: &BoolVar<F>, t: &FieldVar<F>, f: &FieldVar<F>) -> FieldVar<F> {
		if let Some(b) = cond.as_constant() {
			return if b { *t } else { *f };
		}
		// f + cond·(t - f)
		let delta = self.sub(t, f);
		let scaled = self.mul(&cond.var(), &delta);
		self.add(f, &scaled)
	}

	pub fn bool_and(&self, x: &BoolVar<F>, y: &BoolVar<F>) -> BoolVar<F> {
		BoolVar::from_checked(self.mul(&x.var(), &y.var()))
	}

	pub fn bool_or(&self, x: &BoolVar<F>, y: &BoolVar<F>) -> BoolVar<F> {
		// x + y - x·y
		BoolVar::from_checked(self.bilinear(&x.var(), &y.var(), [-F::ONE, F::ONE, F::ONE, F::ZERO]))
	}

	pub fn bool_not(&self, x: &BoolVar<F>) -> BoolVar<F> {
		let one = FieldVar::Constant(F::ONE);
		BoolVar::from_checked(self.sub(&one, &x.var()))
	}

	pub fn assert_true(&self, label: impl Into<String>, b: &BoolVar<F>) -> Result<()> {
		self.assert_equal(label, &b.var(), &FieldVar::one())
	}

	pub fn assert_false(&self, label: impl Into<String>, b: &BoolVar<F>) -> Result<()> {
		self.assert_equal(label, &b.var(), &FieldVar::zero())
	}

	/// Assert that `x` takes one of the listed values, with a chain of one
	/// gate per value.
	pub fn assert_one_of(&self, label: impl Into<String>, x: &FieldVar<F>, allowed: &[F]) -> Result<()> {
		let label = label.into();
		assert!(!allowed.is_empty(), "assert_one_of needs at least one value");
		if let FieldVar::Constant(c) = x {
			if !allowed.contains(c) {
				return Err(CircuitError::UnsoundUsage(format!(
					"constant assertion failed: {label}"
				)));
			}
			return Ok(());
		}
		if allowed.len() == 1 {
			return self.assert_equal(label, x, &FieldVar::Constant(allowed[0]));
		}
		// acc_{k+1} = acc_k·(x - c_k), with acc_0 = x - c_0 and a final
		// assertion acc·(x - c_last) = 0.
		let mut acc = self.add_const(x, -allowed[0]);
		for &c in &allowed[1..allowed.len() - 1] {
			acc = self.bilinear(&acc, x, [F::ONE, -c, F::ZERO, F::ZERO]);
		}
		let last = *allowed.last().expect("non-empty");
		self.assert_bilinear(label, &acc, x, [F::ONE, -last, F::ZERO, F::ZERO])
	}

	/// Provable random access: returns `array[index]` in O(n) gates.
	///
	/// The caller must separately constrain `index < array.len()`.
	pub fn array_get(&self, array: &[FieldVar<F>], index: &FieldVar<F>) -> FieldVar<F> {
		if let FieldVar::Constant(i) = index {
			let i = i.to_biguint();
			let i = usize::try_from(&i).expect("index fits usize");
			return array[i];
		}
		let out = self.exists_one(|| {
			let i = usize::try_from(&self.value_biguint(index)).expect("index fits usize");
			BigInt::from(self.value_biguint(&array[i]))
		});
		// For each j, witness z_j with z_j·(index - j) = out - array[j]. At
		// j = index the left side vanishes, forcing out = array[index].
		for (j, entry) in array.iter().enumerate() {
			let z_j = self.exists_one(|| {
				let i = self.value(index);
				let fj = F::from(j as u64);
				if i == fj {
					BigInt::from(0)
				} else {
					let num = self.value(&out) - self.value(entry);
					let inv = Option::<F>::from((i - fj).invert()).expect("i != j");
					BigInt::from((num * inv).to_biguint())
				}
			});
			let rhs = self.sub(&out, entry);
			let lhs = self.bilinear(&z_j, index, [F::ONE, -F::from(j as u64), F::ZERO, F::ZERO]);
			self.assert_equal("array_get", &lhs, &rhs)
				.expect("both sides are variables");
		}
		out
	}

	/// Assert that the vector of vars differs from the constant vector in at
	/// least one coordinate.
	pub fn assert_not_vector_equals(
		&self,
		label: impl Into<String>,
		xs: &[FieldVar<F>],
		consts: &[F],
	) -> Result<()> {
		assert_eq!(xs.len(), consts.len());
		let mut all_equal = BoolVar::constant(true);
		for (x, c) in xs.iter().zip(consts) {
			let eq = self.equals(x, &FieldVar::Constant(*c));
			all_equal = self.bool_and(&all_equal, &eq);
		}
		self.assert_false(label, &all_equal)
	}
}

#[cfg(test)]
mod tests {
	use ff::Field;
	use pasta_curves::Fp;

	use super::*;
	use crate::builder::Mode;

	type B = CircuitBuilder<Fp>;

	fn prover() -> B {
		B::new(Mode::Prover)
	}

	fn witness(b: &B, v: u64) -> FieldVar<Fp> {
		FieldVar::Var(b.alloc(Fp::from(v)))
	}

	#[test]
	fn test_add_mul_fold_constants() {
		let b = prover();
		let x = FieldVar::<Fp>::constant(3);
		let y = FieldVar::<Fp>::constant(4);
		assert_eq!(b.add(&x, &y).as_constant(), Some(Fp::from(7)));
		assert_eq!(b.mul(&x, &y).as_constant(), Some(Fp::from(12)));
		assert_eq!(b.n_gates(), 0);
	}

	#[test]
	fn test_arithmetic_gates_verify() {
		let b = prover();
		let x = witness(&b, 5);
		let y = witness(&b, 9);
		let s = b.add(&x, &y);
		let p = b.mul(&x, &y);
		b.assert_equal("sum", &s, &FieldVar::constant(14)).unwrap();
		b.assert_equal("product", &p, &FieldVar::constant(45)).unwrap();
		b.build().verify().unwrap();
	}

	#[test]
	fn test_bad_witness_fails() {
		let b = prover();
		let x = witness(&b, 5);
		b.assert_equal("pinned", &x, &FieldVar::constant(6)).unwrap();
		let err = b.build().verify().unwrap_err();
		assert!(matches!(err, CircuitError::Unsatisfiable { .. }));
	}

	#[test]
	fn test_is_zero() {
		let b = prover();
		let z = witness(&b, 0);
		let nz = witness(&b, 17);
		let a = b.is_zero(&z);
		let c = b.is_zero(&nz);
		b.assert_true("zero is zero", &a).unwrap();
		b.assert_false("17 is not zero", &c).unwrap();
		b.build().verify().unwrap();
	}

	#[test]
	fn test_select() {
		let b = prover();
		let cond = b.assert_bool("bit", &witness(&b, 1)).unwrap();
		let t = witness(&b, 11);
		let f = witness(&b, 22);
		let out = b.select(&cond, &t, &f);
		b.assert_equal("picked", &out, &FieldVar::constant(11)).unwrap();
		b.build().verify().unwrap();
	}

	#[test]
	fn test_assert_one_of() {
		let b = prover();
		let x = witness(&b, 2);
		b.assert_one_of("in set", &x, &[Fp::ZERO, Fp::ONE, Fp::from(2)]).unwrap();
		b.build().verify().unwrap();

		let b = prover();
		let x = witness(&b, 3);
		b.assert_one_of("in set", &x, &[Fp::ZERO, Fp::ONE, Fp::from(2)]).unwrap();
		assert!(b.build().verify().is_err());
	}

	#[test]
	fn test_array_get() {
		let b = prover();
		let array: Vec<_> = [10u64, 20, 30, 40].iter().map(|&v| witness(&b, v)).collect();
		let i = witness(&b, 2);
		let got = b.array_get(&array, &i);
		b.assert_equal("lookup", &got, &FieldVar::constant(30)).unwrap();
		b.build().verify().unwrap();
	}

	#[test]
	fn test_assert_not_vector_equals() {
		let b = prover();
		let xs = [witness(&b, 1), witness(&b, 2)];
		b.assert_not_vector_equals("differs", &xs, &[Fp::from(1), Fp::from(3)]).unwrap();
		b.build().verify().unwrap();

		let b = prover();
		let xs = [witness(&b, 1), witness(&b, 2)];
		b.assert_not_vector_equals("differs", &xs, &[Fp::from(1), Fp::from(2)]).unwrap();
		assert!(b.build().verify().is_err());
	}
}
