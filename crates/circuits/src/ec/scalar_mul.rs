// Copyright 2025 Irreducible Inc.
//! Multi-scalar multiplication with windowed point tables.
//!
//! All points are doubled jointly, and a precomputed table of size `2^c`
//! per point skips all but every `c`th addition. On curves with an
//! endomorphism, scalars are first split with [GLV](super::glv), halving the
//! number of ladder steps at the cost of twice the points.
//!
//! To keep the running sum away from the point at infinity, the ladder
//! starts from a hashed-to-curve aggregator with no known discrete
//! logarithm, which is subtracted again at the end.

use ferrite_frontend::{
	BoolVar, CircuitBuilder, CircuitError, FieldVar, NativeField, Result,
};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use crate::{
	ec::{
		arithmetic::{add, double},
		curve::{Affine, Curve},
		glv,
		point::Point,
	},
	foreign_field, limbs,
	limbs::{Field3, LIMB_BITS},
	range_check::multi_range_check,
};

/// What to do with a scalar multiplication result that may be zero.
///
/// The gadget cannot represent the point at infinity, so the caller decides
/// up front: either prove the result is non-zero and return it, or prove it
/// is zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsmMode {
	AssertNonzero,
	AssertZero,
}

/// Default table window. Must divide the limb size.
const DEFAULT_WINDOW: u32 = 4;

/// `scalar * point`, proving the result is non-zero.
pub fn scale<F: NativeField>(
	b: &CircuitBuilder<F>,
	scalar: &Field3<F>,
	point: &Point<F>,
	curve: &Curve,
) -> Result<Point<F>> {
	multi_scalar_mul(
		b,
		&[*scalar],
		&[*point],
		curve,
		&[DEFAULT_WINDOW],
		MsmMode::AssertNonzero,
		None,
	)
}

/// Assert `[order] p = 0`, which places `p` in the prime-order subgroup.
/// A no-op on curves with cofactor 1.
pub fn assert_in_subgroup<F: NativeField>(
	b: &CircuitBuilder<F>,
	p: &Point<F>,
	curve: &Curve,
) -> Result<()> {
	if !curve.has_cofactor() {
		return Ok(());
	}
	let order = limbs::constant(&curve.order);
	multi_scalar_mul(
		b,
		&[order],
		&[*p],
		curve,
		&[DEFAULT_WINDOW],
		MsmMode::AssertZero,
		None,
	)?;
	Ok(())
}

/// `s_0*P_0 + ... + s_(n-1)*P_(n-1)` for non-zero points `P_i`.
///
/// `window_sizes` gives the table window per point; each must divide the
/// limb size. With `MsmMode::AssertZero` the sum is proven zero and the
/// all-zero point is returned for type consistency.
pub fn multi_scalar_mul<F: NativeField>(
	b: &CircuitBuilder<F>,
	scalars: &[Field3<F>],
	points: &[Point<F>],
	curve: &Curve,
	window_sizes: &[u32],
	mode: MsmMode,
	ia: Option<&Affine>,
) -> Result<Point<F>> {
	let n = points.len();
	assert_eq!(scalars.len(), n, "points and scalars lengths must match");
	assert_eq!(window_sizes.len(), n, "one window size per point");
	assert!(n > 0, "expected at least 1 point and scalar");

	if scalars.iter().all(limbs::is_constant) && points.iter().all(Point::is_constant) {
		return constant_msm(scalars, points, curve, mode);
	}
	tracing::debug!(n, glv = curve.endo.is_some(), "multi-scalar mul");

	let tables: Vec<Vec<Point<F>>> = points
		.iter()
		.zip(window_sizes)
		.map(|(p, &c)| point_table(b, p, c, curve))
		.collect::<Result<_>>()?;

	let Some(glv_params) = &curve.endo else {
		let max_bits = curve.order.bits() as u32;
		return msm_ladder(b, scalars, &tables, window_sizes, max_bits, curve, mode, ia);
	};

	// split every scalar in two and double the tables
	let mut scalars2 = Vec::with_capacity(2 * n);
	let mut tables2 = Vec::with_capacity(2 * n);
	let mut windows2 = Vec::with_capacity(2 * n);
	let mut mrc_stack = Vec::new();

	for (i, s) in scalars.iter().enumerate() {
		let (s0, s1) = glv::decompose_no_range_check(b, curve, s)?;
		scalars2.push(s0.abs);
		scalars2.push(s1.abs);

		let table = &tables[i];
		let endo_table = table
			.iter()
			.enumerate()
			.map(|(k, p)| {
				if k == 0 {
					return Ok(*p);
				}
				let (phi_p, beta_x_bound) = endomorphism(b, p, curve)?;
				mrc_stack.push(beta_x_bound);
				Ok(phi_p)
			})
			.collect::<Result<Vec<_>>>()?;
		tables2.push(
			table
				.iter()
				.map(|p| negate_if(b, &s0.is_negative, p, curve))
				.collect::<Result<Vec<_>>>()?,
		);
		tables2.push(
			endo_table
				.iter()
				.map(|p| negate_if(b, &s1.is_negative, p, curve))
				.collect::<Result<Vec<_>>>()?,
		);
		windows2.push(window_sizes[i]);
		windows2.push(window_sizes[i]);
	}
	reduce_mrc_stack(b, mrc_stack)?;

	msm_ladder(
		b,
		&scalars2,
		&tables2,
		&windows2,
		glv_params.max_bits,
		curve,
		mode,
		ia,
	)
}

#[allow(clippy::too_many_arguments)]
fn msm_ladder<F: NativeField>(
	b: &CircuitBuilder<F>,
	scalars: &[Field3<F>],
	tables: &[Vec<Point<F>>],
	windows: &[u32],
	max_bits: u32,
	curve: &Curve,
	mode: MsmMode,
	ia: Option<&Affine>,
) -> Result<Point<F>> {
	let chunks: Vec<Vec<FieldVar<F>>> = scalars
		.iter()
		.zip(windows)
		.map(|(s, &c)| slice_field3(b, s, max_bits, c))
		.collect::<Result<_>>()?;

	// start from an aggregator unrelated to the inputs, so the ladder never
	// meets the point at infinity
	let ia = ia.cloned().unwrap_or_else(|| curve.initial_aggregator());
	let mut sum = Point::constant(&ia);

	for i in (0..max_bits).rev() {
		for j in 0..scalars.len() {
			let c = windows[j];
			if i % c != 0 {
				continue;
			}
			let sj = chunks[j][(i / c) as usize];
			let sj_p = if c == 1 {
				tables[j][1]
			} else {
				table_get(b, &tables[j], &sj)
			};

			let added = add(b, &sum, &sj_p, curve)?;
			// chunk 0 selects the zero entry, whose add result is garbage
			let skip = b.is_zero(&sj);
			sum = Point::select(b, &skip, &sum, &added);
		}
		if i == 0 {
			break;
		}
		sum = double(b, &sum, curve)?;
	}

	// sum is now 2^(maxBits-1)*IA + result
	let ia_final = curve.scale(&ia, &(BigUint::one() << (max_bits - 1)));
	let is_zero = sum.equals_constant(b, &ia_final, curve)?;

	match mode {
		MsmMode::AssertNonzero => {
			b.assert_false("multi-scalar mul is non-zero", &is_zero)?;
			add(b, &sum, &Point::constant(&curve.negate(&ia_final)), curve)
		}
		MsmMode::AssertZero => {
			b.assert_true("multi-scalar mul is zero", &is_zero)?;
			Ok(zero_point())
		}
	}
}

fn constant_msm<F: NativeField>(
	scalars: &[Field3<F>],
	points: &[Point<F>],
	curve: &Curve,
	mode: MsmMode,
) -> Result<Point<F>> {
	let mut sum = Affine::zero();
	for (s, p) in scalars.iter().zip(points) {
		let s = limbs::as_constant(s).expect("constant scalar");
		let p = p.as_constant().expect("constant point");
		sum = curve.add(&sum, &curve.scale(&p, &s));
	}
	match mode {
		MsmMode::AssertZero => {
			if !sum.infinity {
				return Err(CircuitError::UnsoundUsage(
					"scalar multiplication: expected zero result".to_string(),
				));
			}
			Ok(zero_point())
		}
		MsmMode::AssertNonzero => {
			if sum.infinity {
				return Err(CircuitError::UnsoundUsage(
					"scalar multiplication: expected non-zero result".to_string(),
				));
			}
			Ok(Point::constant(&sum))
		}
	}
}

/// All-zero placeholder standing in for the point at infinity.
fn zero_point<F: NativeField>() -> Point<F> {
	let zero = limbs::constant(&BigUint::zero());
	Point { x: zero, y: zero }
}

/// Table of multiples `[0, P, 2P, ..., (2^c - 1) P]`.
///
/// Index 0 is an all-zero placeholder; the ladder never adds it. Costs no
/// constraints for a constant point.
fn point_table<F: NativeField>(
	b: &CircuitBuilder<F>,
	p: &Point<F>,
	window_size: u32,
	curve: &Curve,
) -> Result<Vec<Point<F>>> {
	assert!(window_size > 0, "invalid window size");
	let n = 1usize << window_size;

	let mut table = vec![zero_point(), *p];
	if n == 2 {
		return Ok(table);
	}

	let mut p_i = double(b, p, curve)?;
	table.push(p_i);
	for _ in 3..n {
		p_i = add(b, &p_i, p, curve)?;
		table.push(p_i);
	}
	Ok(table)
}

/// Apply the curve endomorphism `(x, y) -> (beta*x, y)`.
///
/// Returns the mapped point and the high-limb bound of `beta*x`, which the
/// caller batches into multi-range checks.
fn endomorphism<F: NativeField>(
	b: &CircuitBuilder<F>,
	p: &Point<F>,
	curve: &Curve,
) -> Result<(Point<F>, FieldVar<F>)> {
	let glv_params = curve.endo.as_ref().expect("curve has an endomorphism");
	let beta = limbs::constant(&glv_params.beta);
	let beta_x = foreign_field::multiply(b, &beta, &p.x, &curve.modulus)?;
	let bound = foreign_field::weak_bound(b, &beta_x[2], &curve.modulus);
	Ok((Point { x: beta_x, y: p.y }, bound))
}

fn negate_if<F: NativeField>(
	b: &CircuitBuilder<F>,
	cond: &BoolVar<F>,
	p: &Point<F>,
	curve: &Curve,
) -> Result<Point<F>> {
	let neg_y = foreign_field::negate(b, &p.y, &curve.modulus)?;
	Ok(Point {
		x: p.x,
		y: limbs::select(b, cond, &neg_y, &p.y),
	})
}

/// Look up a table entry by variable index, one coordinate limb at a time.
fn table_get<F: NativeField>(
	b: &CircuitBuilder<F>,
	table: &[Point<F>],
	index: &FieldVar<F>,
) -> Point<F> {
	let limb = |pick: fn(&Point<F>) -> &Field3<F>, k: usize| {
		let column: Vec<FieldVar<F>> = table.iter().map(|p| pick(p)[k]).collect();
		b.array_get(&column, index)
	};
	Point {
		x: [limb(|p| &p.x, 0), limb(|p| &p.x, 1), limb(|p| &p.x, 2)],
		y: [limb(|p| &p.y, 0), limb(|p| &p.y, 1), limb(|p| &p.y, 2)],
	}
}

/// Split a scalar into `chunk_size`-bit windows, least significant first.
///
/// Covers `max_bits` bits; higher limbs are constrained to zero. The window
/// must divide the limb size so chunks never straddle limb boundaries. Each
/// chunk is constrained to `[0, 2^chunk_size)` and the chunks of each limb
/// are constrained to recombine to it.
fn slice_field3<F: NativeField>(
	b: &CircuitBuilder<F>,
	s: &Field3<F>,
	max_bits: u32,
	chunk_size: u32,
) -> Result<Vec<FieldVar<F>>> {
	if chunk_size == 0 || LIMB_BITS % chunk_size != 0 {
		return Err(CircuitError::UnsoundUsage(format!(
			"window size must divide the limb size, got {chunk_size}"
		)));
	}
	let allowed: Vec<F> = (0..1u64 << chunk_size).map(F::from).collect();
	let chunk_mask = BigUint::from((1u64 << chunk_size) - 1);

	let mut chunks = Vec::with_capacity(max_bits.div_ceil(chunk_size) as usize);
	for (k, limb) in s.iter().enumerate() {
		let limb_start = k as u32 * LIMB_BITS;
		if limb_start >= max_bits {
			// beyond the bit bound, the limb must vanish
			b.assert_equal("scalar limb is zero", limb, &FieldVar::zero())?;
			continue;
		}
		let n_chunks = (max_bits - limb_start).min(LIMB_BITS).div_ceil(chunk_size);

		if let Some(c) = limb.as_constant() {
			let v = c.to_biguint();
			if v.bits() > (n_chunks * chunk_size) as u64 {
				return Err(CircuitError::OutOfRange(format!(
					"scalar limb exceeds {max_bits} bits"
				)));
			}
			for j in 0..n_chunks {
				let chunk = (&v >> (j * chunk_size)) & &chunk_mask;
				chunks.push(FieldVar::Constant(F::from_biguint(&chunk)));
			}
			continue;
		}

		let mut recombined = FieldVar::zero();
		for j in 0..n_chunks {
			let chunk = b.exists_one(|| {
				let v = b.value_biguint(limb);
				BigInt::from((v >> (j * chunk_size)) & &chunk_mask)
			});
			b.assert_one_of("scalar chunk", &chunk, &allowed)?;
			let shift = F::from_biguint(&(BigUint::one() << (j * chunk_size)));
			recombined = b.add_scaled(&recombined, &chunk, shift);
			chunks.push(chunk);
		}
		// also bounds the limb below 2^(chunks * chunk_size)
		b.assert_equal("scalar limb recombines", &recombined, limb)?;
	}
	Ok(chunks)
}

/// Range check queued high-limb bounds, three per gate batch.
fn reduce_mrc_stack<F: NativeField>(
	b: &CircuitBuilder<F>,
	stack: Vec<FieldVar<F>>,
) -> Result<()> {
	let mut iter = stack.into_iter();
	loop {
		let Some(x0) = iter.next() else { return Ok(()) };
		let x1 = iter.next().unwrap_or_else(FieldVar::zero);
		let x2 = iter.next().unwrap_or_else(FieldVar::zero);
		multi_range_check(b, &[x0, x1, x2])?;
	}
}
