// Copyright 2025 Irreducible Inc.
//! The gate catalogue and its reference checker.
//!
//! Every gate row carries the wires it reads plus the fixed coefficients baked
//! in at compile time. [`Gate::verify`] evaluates the row against a witness
//! assignment, which is how the whole stack is tested without a proving
//! backend: a gadget is correct when every row it emitted verifies.

use cranelift_entity::PrimaryMap;
use num_traits::Zero;

use crate::{
	error::{CircuitError, Result},
	field::NativeField,
	var::Wire,
};

/// Coefficients of a generic (Plonk-style) gate:
/// `left·a + right·b + output·o + mul·a·b + constant = 0`.
#[derive(Clone, Copy, Debug)]
pub struct GenericCoeffs<F> {
	pub left: F,
	pub right: F,
	pub output: F,
	pub mul: F,
	pub constant: F,
}

impl<F: NativeField> GenericCoeffs<F> {
	pub fn zero() -> Self {
		GenericCoeffs {
			left: F::ZERO,
			right: F::ZERO,
			output: F::ZERO,
			mul: F::ZERO,
			constant: F::ZERO,
		}
	}
}

/// Packing relation attached to a [`Gate::RangeCheck1`] row in compact mode:
/// `packed = low + 2^88 · value`.
#[derive(Clone, Copy, Debug)]
pub struct RangePack {
	pub packed: Wire,
	pub low: Wire,
}

/// A single constraint row.
#[derive(Clone, Debug)]
pub enum Gate<F: NativeField> {
	/// `left·a + right·b + output·o + mul·a·b + constant = 0` over wires
	/// `[a, b, o]`.
	Generic {
		coeffs: GenericCoeffs<F>,
		wires: [Wire; 3],
		label: String,
	},
	/// First row of a 88-bit range check: `value` decomposes into eight 2-bit
	/// crumbs (bits 0..16) and six 12-bit slices (bits 16..88), all listed
	/// least significant first.
	///
	/// `compact` marks the row whose value participates in a packing relation
	/// carried by the paired [`Gate::RangeCheck1`] row.
	RangeCheck0 {
		value: Wire,
		slices12: [Wire; 6],
		crumbs: [Wire; 8],
		compact: bool,
	},
	/// Second row of a multi-range-check: `value` decomposes into nineteen
	/// crumbs (bits 0..38), four 12-bit slices (bits 38..86) and a final crumb
	/// (bits 86..88). In compact mode also enforces the limb packing.
	RangeCheck1 {
		value: Wire,
		pack: Option<RangePack>,
		slices12: [Wire; 4],
		crumbs: [Wire; 20],
	},
	/// One step of a foreign-field addition chain:
	/// `result = left + sign·right - overflow·modulus - carry·2^176` on the
	/// bottom two limbs, with the matching top-limb equation. `overflow` must
	/// be 0 or `sign`, `carry` must be in `{-1, 0, 1}`.
	ForeignFieldAdd {
		left: [Wire; 3],
		right: [Wire; 3],
		result: [Wire; 3],
		overflow: Wire,
		carry: Wire,
		sign: F,
		modulus: [F; 3],
	},
	/// Foreign-field multiplication `a·b = q·f + r` with the remainder held as
	/// a compact pair `(r01, r2)`. `neg_modulus` holds the limbs of
	/// `2^264 - f`; `bound_shift` is `2^88 - f2 - 1`, relating `quotient[2]`
	/// to its high-limb bound.
	ForeignFieldMul {
		left: [Wire; 3],
		right: [Wire; 3],
		remainder01: Wire,
		remainder2: Wire,
		quotient: [Wire; 3],
		quotient_hi_bound: Wire,
		product1_lo: Wire,
		product1_hi_0: Wire,
		product1_hi_1: Wire,
		carry0: Wire,
		carry1_slices: [Wire; 7],
		carry1_crumbs: [Wire; 3],
		carry1_bit: Wire,
		neg_modulus: [F; 3],
		bound_shift: F,
	},
	/// A raw row with no constraint. Closes addition chains so the final
	/// result limbs occupy a readable row.
	Zero { wires: [Wire; 3] },
}

fn pow2<F: NativeField>(n: u32) -> F {
	F::from(2).pow_vartime([n as u64])
}

fn check_width<F: NativeField>(
	row: usize,
	what: &str,
	value: &F,
	bits: u32,
) -> Result<()> {
	if !(value.to_biguint() >> bits).is_zero() {
		return Err(CircuitError::Unsatisfiable {
			row,
			label: format!("{what} exceeds {bits} bits"),
		});
	}
	Ok(())
}

impl<F: NativeField> Gate<F> {
	pub fn name(&self) -> &'static str {
		match self {
			Gate::Generic { .. } => "Generic",
			Gate::RangeCheck0 { .. } => "RangeCheck0",
			Gate::RangeCheck1 { .. } => "RangeCheck1",
			Gate::ForeignFieldAdd { .. } => "ForeignFieldAdd",
			Gate::ForeignFieldMul { .. } => "ForeignFieldMul",
			Gate::Zero { .. } => "Zero",
		}
	}

	/// Check this row against a witness assignment.
	pub fn verify(&self, row: usize, values: &PrimaryMap<Wire, F>) -> Result<()> {
		let v = |w: Wire| values[w];
		match self {
			Gate::Generic { coeffs, wires, label } => {
				let [a, b, o] = wires.map(v);
				let acc = coeffs.left * a
					+ coeffs.right * b
					+ coeffs.output * o
					+ coeffs.mul * a * b
					+ coeffs.constant;
				if acc != F::ZERO {
					return Err(CircuitError::Unsatisfiable { row, label: label.clone() });
				}
				Ok(())
			}
			Gate::RangeCheck0 { value, slices12, crumbs, compact: _ } => {
				let mut acc = F::ZERO;
				for (i, &c) in crumbs.iter().enumerate() {
					check_width(row, "crumb", &v(c), 2)?;
					acc += v(c) * pow2::<F>(2 * i as u32);
				}
				for (j, &s) in slices12.iter().enumerate() {
					check_width(row, "12-bit slice", &v(s), 12)?;
					acc += v(s) * pow2::<F>(16 + 12 * j as u32);
				}
				if acc != v(*value) {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "range check decomposition".to_string(),
					});
				}
				Ok(())
			}
			Gate::RangeCheck1 { value, pack, slices12, crumbs } => {
				let mut acc = F::ZERO;
				for (i, &c) in crumbs[..19].iter().enumerate() {
					check_width(row, "crumb", &v(c), 2)?;
					acc += v(c) * pow2::<F>(2 * i as u32);
				}
				for (j, &s) in slices12.iter().enumerate() {
					check_width(row, "12-bit slice", &v(s), 12)?;
					acc += v(s) * pow2::<F>(38 + 12 * j as u32);
				}
				check_width(row, "crumb", &v(crumbs[19]), 2)?;
				acc += v(crumbs[19]) * pow2::<F>(86);
				if acc != v(*value) {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "range check decomposition".to_string(),
					});
				}
				if let Some(RangePack { packed, low }) = pack {
					if v(*packed) != v(*low) + pow2::<F>(88) * v(*value) {
						return Err(CircuitError::Unsatisfiable {
							row,
							label: "compact limb packing".to_string(),
						});
					}
				}
				Ok(())
			}
			Gate::ForeignFieldAdd { left, right, result, overflow, carry, sign, modulus } => {
				let ovf = v(*overflow);
				if ovf != F::ZERO && ovf != *sign {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "field overflow must be 0 or sign".to_string(),
					});
				}
				let cr = v(*carry);
				if cr != F::ZERO && cr != F::ONE && cr != -F::ONE {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "carry must be in {-1, 0, 1}".to_string(),
					});
				}
				let two88 = pow2::<F>(88);
				let two176 = pow2::<F>(176);
				let bottom = |limbs: &[Wire; 3]| v(limbs[0]) + two88 * v(limbs[1]);
				let f01 = modulus[0] + two88 * modulus[1];
				// Bottom two limbs, with the borrow/carry into the top limb.
				if bottom(result) != bottom(left) + *sign * bottom(right) - ovf * f01 - cr * two176
				{
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "foreign field addition (low limbs)".to_string(),
					});
				}
				if v(result[2]) != v(left[2]) + *sign * v(right[2]) - ovf * modulus[2] + cr {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "foreign field addition (high limb)".to_string(),
					});
				}
				Ok(())
			}
			Gate::ForeignFieldMul {
				left,
				right,
				remainder01,
				remainder2,
				quotient,
				quotient_hi_bound,
				product1_lo,
				product1_hi_0,
				product1_hi_1,
				carry0,
				carry1_slices,
				carry1_crumbs,
				carry1_bit,
				neg_modulus,
				bound_shift,
			} => {
				let [a0, a1, a2] = left.map(v);
				let [b0, b1, b2] = right.map(v);
				let [q0, q1, q2] = quotient.map(v);
				let [nf0, nf1, nf2] = *neg_modulus;
				let two88 = pow2::<F>(88);
				let two176 = pow2::<F>(176);

				// Partial products of a·b + q·(2^264 - f).
				let p0 = a0 * b0 + q0 * nf0;
				let p1 = a0 * b1 + a1 * b0 + q0 * nf1 + q1 * nf0;
				let p2 = a0 * b2 + a1 * b1 + a2 * b0 + q0 * nf2 + q1 * nf1 + q2 * nf0;

				let p10 = v(*product1_lo);
				let p110 = v(*product1_hi_0);
				let p111 = v(*product1_hi_1);
				check_width(row, "product1 top crumb", &p111, 2)?;
				if p1 != p10 + two88 * p110 + two176 * p111 {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "middle partial product decomposition".to_string(),
					});
				}

				let c0 = v(*carry0);
				check_width(row, "carry0", &c0, 2)?;
				if p0 + two88 * p10 - v(*remainder01) != two176 * c0 {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "bottom half product".to_string(),
					});
				}

				let mut c1 = F::ZERO;
				for (j, &s) in carry1_slices.iter().enumerate() {
					check_width(row, "carry1 slice", &v(s), 12)?;
					c1 += v(s) * pow2::<F>(12 * j as u32);
				}
				for (k, &c) in carry1_crumbs.iter().enumerate() {
					check_width(row, "carry1 crumb", &v(c), 2)?;
					c1 += v(c) * pow2::<F>(84 + 2 * k as u32);
				}
				check_width(row, "carry1 bit", &v(*carry1_bit), 1)?;
				c1 += v(*carry1_bit) * pow2::<F>(90);

				let p11 = p110 + two88 * p111;
				if two88 * c1 != p2 - v(*remainder2) + p11 + c0 {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "top half product".to_string(),
					});
				}

				if v(*quotient_hi_bound) != q2 + *bound_shift {
					return Err(CircuitError::Unsatisfiable {
						row,
						label: "quotient high limb bound".to_string(),
					});
				}
				Ok(())
			}
			Gate::Zero { .. } => Ok(()),
		}
	}
}
