// Copyright 2025 Irreducible Inc.
//! Foreign field arithmetic gadgets.
//!
//! All gadgets assume their inputs are range checked to three 88-bit limbs;
//! multiplication inputs must additionally be almost reduced (see
//! [`assert_almost_reduced`]). Outputs are range checked unless noted.

use std::cell::RefCell;

use ferrite_frontend::{
	BoolVar, CircuitBuilder, CircuitError, FieldVar, Gate, NativeField, Result,
};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::{
	limbs::{self, Field3, LIMB_BITS, THREE_LIMB_BITS, TWO_LIMB_BITS},
	range_check::{compact_multi_range_check, multi_range_check},
};

/// Sign of a summand in an addition chain.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sign {
	Plus,
	Minus,
}

impl Sign {
	pub fn as_bigint(self) -> BigInt {
		match self {
			Sign::Plus => BigInt::one(),
			Sign::Minus => -BigInt::one(),
		}
	}

	fn as_field<F: NativeField>(self) -> F {
		match self {
			Sign::Plus => F::ONE,
			Sign::Minus => -F::ONE,
		}
	}
}

fn limb_values<F: NativeField>(b: &CircuitBuilder<F>, x: &Field3<F>) -> [BigInt; 3] {
	[
		BigInt::from(b.value_biguint(&x[0])),
		BigInt::from(b.value_biguint(&x[1])),
		BigInt::from(b.value_biguint(&x[2])),
	]
}

pub(crate) fn mod_inverse(x: &BigUint, f: &BigUint) -> Option<BigUint> {
	let f_int = BigInt::from(f.clone());
	let x_int = BigInt::from(x.clone()).mod_floor(&f_int);
	let gcd = x_int.extended_gcd(&f_int);
	if !gcd.gcd.is_one() {
		return None;
	}
	Some(gcd.x.mod_floor(&f_int).to_biguint().expect("mod_floor is non-negative"))
}

fn check_modulus_for_add(f: &BigUint) -> Result<()> {
	if f.bits() > THREE_LIMB_BITS as u64 {
		return Err(CircuitError::ModulusTooLarge(format!(
			"modulus must fit in {THREE_LIMB_BITS} bits, got {} bits",
			f.bits()
		)));
	}
	Ok(())
}

fn check_modulus_for_mul(f: &BigUint) -> Result<()> {
	if f.bits() > 259 {
		return Err(CircuitError::ModulusTooLarge(format!(
			"modulus must fit in 259 bits for multiplication, got {} bits",
			f.bits()
		)));
	}
	Ok(())
}

/// `x + y mod f`.
pub fn add<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	f: &BigUint,
) -> Result<Field3<F>> {
	sum(b, &[*x, *y], &[Sign::Plus], f)
}

/// `x - y mod f`.
pub fn sub<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	f: &BigUint,
) -> Result<Field3<F>> {
	sum(b, &[*x, *y], &[Sign::Minus], f)
}

/// `-x mod f`.
pub fn negate<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	f: &BigUint,
) -> Result<Field3<F>> {
	sum(b, &[limbs::constant(&BigUint::zero()), *x], &[Sign::Minus], f)
}

/// `x[0] + sign[0]·x[1] + ... + sign[n-1]·x[n] mod f`.
///
/// Assumes the inputs are range checked; range checks the result.
pub fn sum<F: NativeField>(
	b: &CircuitBuilder<F>,
	xs: &[Field3<F>],
	signs: &[Sign],
	f: &BigUint,
) -> Result<Field3<F>> {
	assert_eq!(xs.len(), signs.len() + 1, "inputs and operators must match");
	check_modulus_for_add(f)?;

	// constant case
	if xs.iter().all(limbs::is_constant) {
		return Ok(limbs::constant(&constant_sum(xs, signs, f)?));
	}

	// chain of ffadd rows, closed by a zero row holding the result
	let mut result = xs[0];
	for (x, sign) in xs[1..].iter().zip(signs) {
		(result, _) = single_add(b, &result, x, *sign, f);
	}
	b.zero_row(limbs::to_wires(b, &result));

	multi_range_check(b, &result)?;
	Ok(result)
}

fn constant_sum<F: NativeField>(
	xs: &[Field3<F>],
	signs: &[Sign],
	f: &BigUint,
) -> Result<BigUint> {
	let mut acc = BigInt::from(limbs::as_constant(&xs[0]).expect("constant"));
	for (x, sign) in xs[1..].iter().zip(signs) {
		acc += sign.as_bigint() * BigInt::from(limbs::as_constant(x).expect("constant"));
	}
	if f.is_zero() {
		// modulus 0 is used by comparisons; the sum must already be a
		// canonical 3-limb value
		if acc.is_negative() || acc.bits() > THREE_LIMB_BITS as u64 {
			return Err(CircuitError::OutOfRange(format!(
				"sum {acc} is not a 3-limb value"
			)));
		}
		return Ok(acc.to_biguint().expect("non-negative"));
	}
	let f_int = BigInt::from(f.clone());
	Ok(acc.mod_floor(&f_int).to_biguint().expect("non-negative"))
}

/// One ffadd row computing `x + sign·y` with a single conditional subtraction
/// of `f`.
///
/// The returned limbs live in the next row; callers must follow up with a gate
/// that holds them (another ffadd, an ffmul, or a zero row).
fn single_add<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	sign: Sign,
	f: &BigUint,
) -> (Field3<F>, FieldVar<F>) {
	let f_limbs = limbs::split(f);

	let [r0, r1, r2, overflow, carry] = b.exists(|| {
		let x_ = limb_values(b, x);
		let y_ = limb_values(b, y);
		let s = sign.as_bigint();

		// figure out if there's overflow
		let r = limbs::combine_signed(&x_) + &s * limbs::combine_signed(&y_);
		let f_int = BigInt::from(f.clone());
		let mut overflow = BigInt::zero();
		if sign == Sign::Plus && r >= f_int {
			overflow = BigInt::one();
		}
		if sign == Sign::Minus && r.is_negative() {
			overflow = -BigInt::one();
		}
		if f.is_zero() {
			overflow = BigInt::zero();
		}

		// add with carry on the bottom two limbs; this works with a
		// transiently negative r01 because of two's complement masking
		let combine2 = |v: &[BigInt; 3]| &v[0] + (&v[1] << LIMB_BITS);
		let f01 = BigInt::from(limbs::combine2(&[f_limbs[0].clone(), f_limbs[1].clone()]));
		let mut r01 = combine2(&x_) + &s * combine2(&y_) - &overflow * f01;
		let carry = &r01 >> TWO_LIMB_BITS;
		r01 &= BigInt::from(limbs::two_limb_mask());
		let r01 = r01.to_biguint().expect("masked");
		let [r0, r1] = limbs::split2(&r01);
		let r2 = &x_[2] + s * &y_[2] - overflow.clone() * BigInt::from(f_limbs[2].clone())
			+ &carry;

		[BigInt::from(r0), BigInt::from(r1), r2, overflow, carry]
	});

	b.push_gate(Gate::ForeignFieldAdd {
		left: limbs::to_wires(b, x),
		right: limbs::to_wires(b, y),
		result: [b.to_var(&r0), b.to_var(&r1), b.to_var(&r2)],
		overflow: b.to_var(&overflow),
		carry: b.to_var(&carry),
		sign: sign.as_field(),
		modulus: f_limbs.map(|limb| F::from_biguint(&limb)),
	});

	([r0, r1, r2], overflow)
}

/// `x·y mod f`. Range checks quotient and remainder.
pub fn multiply<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	f: &BigUint,
) -> Result<Field3<F>> {
	check_modulus_for_mul(f)?;

	if let (Some(xc), Some(yc)) = (limbs::as_constant(x), limbs::as_constant(y)) {
		return Ok(limbs::constant(&((xc * yc) % f)));
	}

	let (r01, r2, q) = multiply_no_range_check(b, x, y, f)?;
	multi_range_check(b, &q)?;
	compact_multi_range_check(b, &r01, &r2)
}

/// `x^-1 mod f`. The result is almost reduced.
pub fn inverse<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	f: &BigUint,
) -> Result<Field3<F>> {
	check_modulus_for_mul(f)?;

	if let Some(xc) = limbs::as_constant(x) {
		let inv = mod_inverse(&xc, f)
			.ok_or_else(|| CircuitError::NotInvertible(format!("{xc} mod {f}")))?;
		return Ok(limbs::constant(&inv));
	}

	let x_inv = limbs::exists(b, || {
		mod_inverse(&limbs::value_of(b, x), f).unwrap_or_else(BigUint::zero)
	});
	multi_range_check(b, &x_inv)?;
	// the inverse is a multiplication input, so it needs a weak bound
	let x_inv_bound = weak_bound(b, &x_inv[2], f);

	// x·xInv = 1, with the remainder given as a compact pair
	let one01 = FieldVar::Constant(F::ONE);
	let one2 = FieldVar::Constant(F::ZERO);
	assert_mul_internal_compact(b, x, &x_inv, &one01, &one2, f, "inverse")?;

	multi_range_check(b, &[x_inv_bound, FieldVar::zero(), FieldVar::zero()])?;
	Ok(x_inv)
}

/// `x / y mod f`, proving `z·y = x` and `y != 0`. The result is almost
/// reduced.
pub fn divide<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	f: &BigUint,
) -> Result<Field3<F>> {
	check_modulus_for_mul(f)?;

	if let (Some(xc), Some(yc)) = (limbs::as_constant(x), limbs::as_constant(y)) {
		let y_inv = mod_inverse(&yc, f)
			.ok_or_else(|| CircuitError::NotInvertible(format!("{yc} mod {f}")))?;
		return Ok(limbs::constant(&((xc * y_inv) % f)));
	}

	let z = limbs::exists(b, || {
		let (xc, yc) = (limbs::value_of(b, x), limbs::value_of(b, y));
		match mod_inverse(&yc, f) {
			Some(y_inv) => (xc * y_inv) % f,
			None => BigUint::zero(),
		}
	});
	multi_range_check(b, &z)?;
	let z_bound = weak_bound(b, &z[2], f);
	assert_mul_internal(b, &z, y, x, f, "divide")?;
	multi_range_check(b, &[z_bound, FieldVar::zero(), FieldVar::zero()])?;

	// rule out the unconstrained 0/0 case
	let y_is_zero = equals(b, y, &BigUint::zero(), f)?;
	b.assert_false("divisor is nonzero", &y_is_zero)?;
	Ok(z)
}

/// Assert `x·y = xy mod f` where `xy` is a 3-limb value.
fn assert_mul_internal<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	xy: &Field3<F>,
	f: &BigUint,
	label: &str,
) -> Result<()> {
	let two88 = F::from_biguint(&(BigUint::one() << LIMB_BITS));
	let xy01 = b.add_scaled(&xy[0], &xy[1], two88);
	assert_mul_internal_compact(b, x, y, &xy01, &xy[2], f, label)
}

/// Assert `x·y = xy mod f` where `xy` is given as a compact pair
/// `(xy01, xy2)`.
fn assert_mul_internal_compact<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	xy01: &FieldVar<F>,
	xy2: &FieldVar<F>,
	f: &BigUint,
	label: &str,
) -> Result<()> {
	let (r01, r2, q) = multiply_no_range_check(b, x, y, f)?;
	multi_range_check(b, &q)?;
	b.assert_equal(label, &r01, xy01)?;
	b.assert_equal(label, &r2, xy2)?;
	Ok(())
}

/// The ffmul gate with its internal range checks, and nothing else.
///
/// No range checks are added on the quotient or remainder; callers wire them
/// to already-checked values or check them as fits their use.
fn multiply_no_range_check<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
	f: &BigUint,
) -> Result<(FieldVar<F>, FieldVar<F>, Field3<F>)> {
	// negated modulus f' = 2^264 - f, and the shift relating q2 to its bound
	let f_neg = (BigUint::one() << THREE_LIMB_BITS) - f;
	let f_neg_limbs = limbs::split(&f_neg);
	let f2 = f >> TWO_LIMB_BITS;
	let f2_bound = (BigUint::one() << LIMB_BITS) - &f2 - 1u32;

	let witnesses = b.exists(|| {
		let x_ = limbs::value_of(b, x);
		let y_ = limbs::value_of(b, y);

		// compute q and r such that x·y = q·f + r
		let xy = &x_ * &y_;
		let q = &xy / f;
		let r = &xy - &q * f;

		let [x0, x1, x2] = limbs::split(&x_).map(BigInt::from);
		let [y0, y1, y2] = limbs::split(&y_).map(BigInt::from);
		let [q0, q1, q2] = limbs::split(&q).map(BigInt::from);
		let [r0, r1, r2] = limbs::split(&r).map(BigInt::from);
		let r01 = &r0 + (&r1 << LIMB_BITS);
		let [nf0, nf1, nf2] = f_neg_limbs.clone().map(BigInt::from);

		// partial products
		let p0 = &x0 * &y0 + &q0 * &nf0;
		let p1 = &x0 * &y1 + &x1 * &y0 + &q0 * &nf1 + &q1 * &nf0;
		let p2 = &x0 * &y2 + &x1 * &y1 + &x2 * &y0 + &q0 * &nf2 + &q1 * &nf1 + &q2 * &nf0;

		let mask = BigInt::from(limbs::limb_mask());
		let p10 = &p1 & &mask;
		let p110 = (&p1 >> LIMB_BITS) & &mask;
		let p111 = &p1 >> TWO_LIMB_BITS;
		let p11 = &p110 + (&p111 << LIMB_BITS);

		// carry of the bottom half, then of the top half
		let c0 = (&p0 + (&p10 << LIMB_BITS) - &r01) >> TWO_LIMB_BITS;
		let c1 = (&p2 - &r2 + &p11 + &c0) >> LIMB_BITS;

		let slice = |x: &BigInt, start: u32, len: u32| {
			(x >> start) & BigInt::from((BigUint::one() << len) - 1u32)
		};
		let q2_bound = &q2 + BigInt::from(f2_bound.clone());

		[
			r01,
			r2,
			q0,
			q1,
			q2,
			q2_bound,
			p10,
			p110,
			p111,
			c0,
			slice(&c1, 0, 12),
			slice(&c1, 12, 12),
			slice(&c1, 24, 12),
			slice(&c1, 36, 12),
			slice(&c1, 48, 12),
			slice(&c1, 60, 12),
			slice(&c1, 72, 12),
			slice(&c1, 84, 2),
			slice(&c1, 86, 2),
			slice(&c1, 88, 2),
			slice(&c1, 90, 1),
		]
	});

	let [r01, r2, q0, q1, q2, q2_bound, p10, p110, p111, c0, c1_00, c1_12, c1_24, c1_36, c1_48, c1_60, c1_72, c1_84, c1_86, c1_88, c1_90] =
		witnesses;
	let q = [q0, q1, q2];

	b.push_gate(Gate::ForeignFieldMul {
		left: limbs::to_wires(b, x),
		right: limbs::to_wires(b, y),
		remainder01: b.to_var(&r01),
		remainder2: b.to_var(&r2),
		quotient: limbs::to_wires(b, &q),
		quotient_hi_bound: b.to_var(&q2_bound),
		product1_lo: b.to_var(&p10),
		product1_hi_0: b.to_var(&p110),
		product1_hi_1: b.to_var(&p111),
		carry0: b.to_var(&c0),
		carry1_slices: [&c1_00, &c1_12, &c1_24, &c1_36, &c1_48, &c1_60, &c1_72]
			.map(|v| b.to_var(v)),
		carry1_crumbs: [&c1_84, &c1_86, &c1_88].map(|v| b.to_var(v)),
		carry1_bit: b.to_var(&c1_90),
		neg_modulus: f_neg_limbs.map(|limb| F::from_biguint(&limb)),
		bound_shift: F::from_biguint(&f2_bound),
	});
	// the gate is followed by a zero row holding the compact remainder
	b.zero_row([b.to_var(&r01), b.to_var(&r2), b.to_var(&q2_bound)]);

	// multi-range check on internal values
	multi_range_check(b, &[p10, p110, q2_bound])?;

	Ok((r01, r2, q))
}

/// `x[2] + 2^88 - 1 - (f >> 176)`, which is an 88-bit value iff the high limb
/// of `x` is at most that of `f`.
///
/// When the low 176 bits of `f` are zero the offset is one larger, bounding
/// the high limb strictly.
pub fn weak_bound<F: NativeField>(
	b: &CircuitBuilder<F>,
	x2: &FieldVar<F>,
	f: &BigUint,
) -> FieldVar<F> {
	let f2 = f >> TWO_LIMB_BITS;
	let offset = if (f & limbs::two_limb_mask()).is_zero() {
		(BigUint::one() << LIMB_BITS) - f2
	} else {
		limbs::limb_mask() - f2
	};
	b.add_const(x2, F::from_biguint(&offset))
}

/// Range check a batch of elements and prove each is almost reduced mod `f`:
/// below `2^264` with high limb at most that of `f`.
///
/// Weak bounds are packed three per multi-range-check, so batches of three are
/// cheapest.
pub fn assert_almost_reduced<F: NativeField>(
	b: &CircuitBuilder<F>,
	xs: &[&Field3<F>],
	f: &BigUint,
	skip_mrc: bool,
) -> Result<()> {
	let mut bounds: Vec<FieldVar<F>> = Vec::with_capacity(3);
	for x in xs {
		if !skip_mrc {
			multi_range_check(b, x)?;
		}
		bounds.push(weak_bound(b, &x[2], f));
		if bounds.len() == 3 {
			multi_range_check(b, &[bounds[0], bounds[1], bounds[2]])?;
			bounds.clear();
		}
	}
	while bounds.len() % 3 != 0 {
		bounds.push(FieldVar::zero());
	}
	if !bounds.is_empty() {
		multi_range_check(b, &[bounds[0], bounds[1], bounds[2]])?;
	}
	Ok(())
}

/// Whether `x = c mod f`, for a constant `c` in `[0, f)`.
///
/// Assumes `x` is almost reduced, so that `x` can only be `c` or `c + f`.
pub fn equals<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	c: &BigUint,
	f: &BigUint,
) -> Result<BoolVar<F>> {
	if c >= f {
		return Err(CircuitError::UnsoundUsage(format!(
			"equals: constant {c} must be below the modulus"
		)));
	}

	if let Some(xc) = limbs::as_constant(x) {
		return Ok(BoolVar::constant(&xc % f == *c));
	}

	let two88 = F::from_biguint(&(BigUint::one() << LIMB_BITS));
	if f.bits() > TWO_LIMB_BITS as u64 {
		// x is c or c + f; compare compact low limbs and the high limb
		let x01 = b.add_scaled(&x[0], &x[1], two88);
		let half = |v: &BigUint| {
			(
				F::from_biguint(&(v & limbs::two_limb_mask())),
				F::from_biguint(&(v >> TWO_LIMB_BITS)),
			)
		};
		let (c01, c2) = half(c);
		let (cf01, cf2) = half(&(c + f));

		let eq01 = b.equals(&x01, &FieldVar::Constant(c01));
		let eq2 = b.equals(&x[2], &FieldVar::Constant(c2));
		let is_c = b.bool_and(&eq01, &eq2);

		let eqf01 = b.equals(&x01, &FieldVar::Constant(cf01));
		let eqf2 = b.equals(&x[2], &FieldVar::Constant(cf2));
		let is_c_plus_f = b.bool_and(&eqf01, &eqf2);

		Ok(b.bool_or(&is_c, &is_c_plus_f))
	} else {
		// small moduli fit in the native field; prove x < f and compare the
		// packed value directly
		assert_less_than_constant(b, x, f)?;
		let x01 = b.add_scaled(&x[0], &x[1], two88);
		let two176 = F::from_biguint(&(BigUint::one() << TWO_LIMB_BITS));
		let x012 = b.add_scaled(&x01, &x[2], two176);
		Ok(b.equals(&x012, &FieldVar::Constant(F::from_biguint(c))))
	}
}

/// Reduce `x` (which may be any 3-limb value) to its canonical representative
/// below `f`.
pub fn to_canonical<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	f: &BigUint,
) -> Result<Field3<F>> {
	// multiply by 1 to get a reduced representative, then bound it
	let one = limbs::constant(&BigUint::one());
	let x_reduced = multiply(b, x, &one, f)?;
	assert_less_than_constant(b, &x_reduced, f)?;
	Ok(x_reduced)
}

/// Assert `x < y` for 3-limb values.
pub fn assert_less_than<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
) -> Result<()> {
	if let Some(yc) = limbs::as_constant(y) {
		return assert_less_than_constant(b, x, &yc);
	}
	// z = y - x - 1 mod 0: the range check on z proves x < y
	let one = limbs::constant(&BigUint::one());
	sum(b, &[*y, *x, one], &[Sign::Minus, Sign::Minus], &BigUint::zero())?;
	Ok(())
}

/// Assert `x < y` for a constant bound `y`.
pub fn assert_less_than_constant<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &BigUint,
) -> Result<()> {
	if let Some(xc) = limbs::as_constant(x) {
		if xc >= *y {
			return Err(CircuitError::OutOfRange(format!("expected {xc} < {y}")));
		}
		return Ok(());
	}
	if y.is_zero() {
		return Err(CircuitError::UnsoundUsage(
			"assert_less_than: bound is zero, so x < y is impossible".to_string(),
		));
	}
	// (y - 1) - x mod (y - 1) is range-checked, which proves x <= y - 1
	negate(b, x, &(y - 1u32))?;
	Ok(())
}

/// Assert `x <= y` for 3-limb values.
pub fn assert_less_than_or_equal<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: &Field3<F>,
	y: &Field3<F>,
) -> Result<()> {
	if let (Some(xc), Some(yc)) = (limbs::as_constant(x), limbs::as_constant(y)) {
		if xc > yc {
			return Err(CircuitError::OutOfRange(format!("expected {xc} <= {yc}")));
		}
		return Ok(());
	}
	// z = y - x mod 0: the range check on z proves x <= y
	sum(b, &[*y, *x], &[Sign::Minus], &BigUint::zero())?;
	Ok(())
}

/// Lazy sum of 3-limb elements, usable as an input to [`assert_mul`].
///
/// Deferring the sum lets `assert_mul` skip the result range check and chain
/// the final addition row directly into the multiplication gate.
pub struct Sum<F: NativeField> {
	summands: Vec<Field3<F>>,
	signs: Vec<Sign>,
}

impl<F: NativeField> From<Field3<F>> for Sum<F> {
	fn from(x: Field3<F>) -> Self {
		Sum::new(x)
	}
}

impl<F: NativeField> Sum<F> {
	pub fn new(x: Field3<F>) -> Self {
		Sum { summands: vec![x], signs: Vec::new() }
	}

	pub fn add(mut self, y: Field3<F>) -> Self {
		self.signs.push(Sign::Plus);
		self.summands.push(y);
		self
	}

	pub fn sub(mut self, y: Field3<F>) -> Self {
		self.signs.push(Sign::Minus);
		self.summands.push(y);
		self
	}

	pub fn len(&self) -> usize {
		self.summands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.summands.is_empty()
	}

	fn is_constant(&self) -> bool {
		self.summands.iter().all(limbs::is_constant)
	}

	/// Emit the addition chain. The result is not range checked; when
	/// `is_chained` the closing zero row is skipped because the next gate
	/// holds the result.
	pub fn finish(
		self,
		b: &CircuitBuilder<F>,
		f: &BigUint,
		is_chained: bool,
	) -> Result<Field3<F>> {
		if self.signs.is_empty() {
			return Ok(self.summands[0]);
		}
		if self.is_constant() {
			return Ok(limbs::constant(&constant_sum(&self.summands, &self.signs, f)?));
		}

		let mut result = self.summands[0];
		for (x, sign) in self.summands[1..].iter().zip(&self.signs) {
			(result, _) = single_add(b, &result, x, *sign, f);
		}
		if !is_chained {
			b.zero_row(limbs::to_wires(b, &result));
		}
		Ok(result)
	}

	/// Emit the addition chain for a multiplication input.
	///
	/// ffadd only constrains the low and middle limbs together, but a
	/// multiplication input needs all limbs individually bounded. Instead of
	/// a full range check, the lowest limb is recomputed with generic gates
	/// and small carries, and wired to each ffadd result.
	pub fn finish_for_mul_input(
		self,
		b: &CircuitBuilder<F>,
		f: &BigUint,
		is_chained: bool,
	) -> Result<Field3<F>> {
		if self.signs.is_empty() {
			return Ok(self.summands[0]);
		}
		if self.is_constant() {
			return Ok(limbs::constant(&constant_sum(&self.summands, &self.signs, f)?));
		}

		let n = self.signs.len();
		let f0 = f & limbs::limb_mask();
		let two88 = F::from_biguint(&(BigUint::one() << LIMB_BITS));

		// running full value, shared between the per-step witness callbacks
		let x_ref = RefCell::new(if b.is_prover() {
			BigInt::from(limbs::value_of(b, &self.summands[0]))
		} else {
			BigInt::zero()
		});

		// low-limb chain mirroring what the ffadd rows below compute
		let mut x0 = self.summands[0][0];
		let mut x0s: Vec<FieldVar<F>> = Vec::with_capacity(n);
		let mut overflows: Vec<FieldVar<F>> = Vec::with_capacity(n);
		for i in 0..n {
			let sign = self.signs[i];
			let xi = self.summands[i + 1];
			let [carry, overflow] = b.exists(|| {
				let mut x = x_ref.borrow_mut();
				let x0v = &*x & BigInt::from(limbs::limb_mask());
				let xi_ = limb_values(b, &xi);
				let s = sign.as_bigint();

				*x += &s * limbs::combine_signed(&xi_);
				let f_int = BigInt::from(f.clone());
				let mut overflow = BigInt::zero();
				if sign == Sign::Plus && *x >= f_int {
					overflow = BigInt::one();
				}
				if sign == Sign::Minus && x.is_negative() {
					overflow = -BigInt::one();
				}
				if f.is_zero() {
					overflow = BigInt::zero();
				}
				*x -= &overflow * f_int;

				let x0v = x0v + s * &xi_[0] - &overflow * BigInt::from(f0.clone());
				let carry = x0v >> LIMB_BITS;
				[carry, overflow]
			});
			b.assert_one_of("sum carry", &carry, &[F::ZERO, F::ONE, -F::ONE])?;

			// x0 <- x0 + s·xi0 - o·f0 - c·2^88
			let t = b.add_scaled(&x0, &xi[0], sign.as_field());
			let t = b.add_scaled(&t, &overflow, -F::from_biguint(&f0));
			x0 = b.add_scaled(&t, &carry, -two88);
			x0s.push(x0);
			overflows.push(overflow);
		}

		// the actual ffadd chain, with low limb and overflow pinned to the
		// generic-gate chain above
		let mut x = self.summands[0];
		for i in 0..n {
			let (result, overflow) = single_add(b, &x, &self.summands[i + 1], self.signs[i], f);
			b.assert_equal("sum low limb", &result[0], &x0s[i])?;
			b.assert_equal("sum overflow", &overflow, &overflows[i])?;
			x = result;
		}
		if !is_chained {
			b.zero_row(limbs::to_wires(b, &x));
		}
		Ok(x)
	}
}

/// Assert `x·y = xy mod f`, where each operand may be a lazy [`Sum`].
///
/// The left and right inputs must be sums of almost-reduced elements; the
/// required bound on the modulus grows with the number of summands.
pub fn assert_mul<F: NativeField>(
	b: &CircuitBuilder<F>,
	x: impl Into<Sum<F>>,
	y: impl Into<Sum<F>>,
	xy: impl Into<Sum<F>>,
	f: &BigUint,
	label: &str,
) -> Result<()> {
	let (x, y, xy) = (x.into(), y.into(), xy.into());

	// conservative bound ensuring |x|·|y| + q·f + |r| stays well below
	// 2^264 · (native modulus)
	let n = x.len() * y.len();
	let sqrt_n = (0u64..).find(|k| k * k >= n as u64).expect("bounded");
	if BigUint::from(sqrt_n) * f >= BigUint::one() << 258 {
		return Err(CircuitError::ModulusTooLarge(format!(
			"modulus too large for multiplication of sums of lengths {} and {}",
			x.len(),
			y.len()
		)));
	}

	let y0 = y.finish_for_mul_input(b, f, false)?;
	let xy0 = xy.finish(b, f, false)?;
	// x is chained into the ffmul gate
	let x0 = x.finish_for_mul_input(b, f, true)?;

	if let (Some(xc), Some(yc), Some(xyc)) = (
		limbs::as_constant(&x0),
		limbs::as_constant(&y0),
		limbs::as_constant(&xy0),
	) {
		if (xc * yc) % f != xyc {
			return Err(CircuitError::UnsoundUsage(format!(
				"constant assertion failed: {label}"
			)));
		}
		return Ok(());
	}

	assert_mul_internal(b, &x0, &y0, &xy0, f, label)
}

#[cfg(test)]
mod tests {
	use ferrite_frontend::Mode;
	use num_bigint::RandBigInt;
	use pasta_curves::Fp;
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;
	use crate::ec::Curve;

	fn secp_base() -> BigUint {
		Curve::secp256k1().modulus
	}

	fn secp_order() -> BigUint {
		Curve::secp256k1().order
	}

	fn witness(b: &CircuitBuilder<Fp>, x: &BigUint) -> Field3<Fp> {
		let x = limbs::exists(b, || x.clone());
		multi_range_check(b, &x).unwrap();
		x
	}

	#[test]
	fn test_add_sub_match_bigint() {
		let f = secp_base();
		let mut rng = StdRng::seed_from_u64(10);
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		for _ in 0..10 {
			let xv = rng.gen_biguint_below(&f);
			let yv = rng.gen_biguint_below(&f);
			let x = witness(&b, &xv);
			let y = witness(&b, &yv);

			let s = add(&b, &x, &y, &f).unwrap();
			assert_eq!(limbs::value_of(&b, &s), (&xv + &yv) % &f);

			let d = sub(&b, &x, &y, &f).unwrap();
			assert_eq!(limbs::value_of(&b, &d), (&xv + &f - &yv) % &f);

			let n = negate(&b, &x, &f).unwrap();
			assert_eq!(limbs::value_of(&b, &n), (&f - &xv) % &f);
		}
		b.build().verify().unwrap();
	}

	#[test]
	fn test_constant_operands_fold() {
		let f = secp_order();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = limbs::constant::<Fp>(&BigUint::from(100u32));
		let y = limbs::constant::<Fp>(&(&f - 1u32));
		let s = add(&b, &x, &y, &f).unwrap();
		assert_eq!(limbs::as_constant(&s), Some(BigUint::from(99u32)));
		assert_eq!(b.n_gates(), 0);

		let p = multiply(&b, &x, &y, &f).unwrap();
		assert_eq!(limbs::as_constant(&p), Some(&f - 100u32));
		assert_eq!(b.n_gates(), 0);
	}

	#[test]
	fn test_multiply_matches_bigint() {
		let mut rng = StdRng::seed_from_u64(11);
		for f in [secp_base(), secp_order(), BigUint::from(1009u32)] {
			let b = CircuitBuilder::<Fp>::new(Mode::Prover);
			for _ in 0..5 {
				let xv = rng.gen_biguint_below(&f);
				let yv = rng.gen_biguint_below(&f);
				let x = witness(&b, &xv);
				let y = witness(&b, &yv);
				let z = multiply(&b, &x, &y, &f).unwrap();
				assert_eq!(limbs::value_of(&b, &z), &xv * &yv % &f);
			}
			b.build().verify().unwrap();
		}
	}

	#[test]
	fn test_assert_mul_rejects_wrong_product() {
		let f = secp_order();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = witness(&b, &BigUint::from(3u32));
		let y = witness(&b, &BigUint::from(5u32));
		let wrong = witness(&b, &BigUint::from(16u32));
		assert_mul(&b, x, y, wrong, &f, "wrong product").unwrap();
		assert!(b.build().verify().is_err());
	}

	#[test]
	fn test_inverse_round_trip() {
		let mut rng = StdRng::seed_from_u64(12);
		let f = secp_base();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		for _ in 0..5 {
			let xv = rng.gen_biguint_range(&BigUint::one(), &f);
			let x = witness(&b, &xv);
			let inv = inverse(&b, &x, &f).unwrap();
			assert_eq!(limbs::value_of(&b, &inv) * &xv % &f, BigUint::one());
		}
		b.build().verify().unwrap();
	}

	#[test]
	fn test_inverse_of_zero_constant() {
		let f = secp_order();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let zero = limbs::constant::<Fp>(&BigUint::zero());
		assert!(matches!(
			inverse(&b, &zero, &f),
			Err(CircuitError::NotInvertible(_))
		));
	}

	#[test]
	fn test_divide_matches_bigint() {
		let mut rng = StdRng::seed_from_u64(13);
		let f = secp_order();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		for _ in 0..5 {
			let xv = rng.gen_biguint_below(&f);
			let yv = rng.gen_biguint_range(&BigUint::one(), &f);
			let x = witness(&b, &xv);
			let y = witness(&b, &yv);
			let z = divide(&b, &x, &y, &f).unwrap();
			assert_eq!(limbs::value_of(&b, &z) * &yv % &f, xv);
		}
		b.build().verify().unwrap();
	}

	#[test]
	fn test_divide_by_zero_is_unsatisfiable() {
		let f = secp_order();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = witness(&b, &BigUint::from(7u32));
		let y = witness(&b, &BigUint::zero());
		divide(&b, &x, &y, &f).unwrap();
		assert!(b.build().verify().is_err());
	}

	#[test]
	fn test_sum_chain_matches_bigint() {
		let mut rng = StdRng::seed_from_u64(14);
		let f = secp_base();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let vals: Vec<BigUint> = (0..4).map(|_| rng.gen_biguint_below(&f)).collect();
		let xs: Vec<Field3<Fp>> = vals.iter().map(|v| witness(&b, v)).collect();

		let result = sum(
			&b,
			&xs,
			&[Sign::Plus, Sign::Minus, Sign::Plus],
			&f,
		)
		.unwrap();
		let expected =
			(&vals[0] + &vals[1] + &f + &f - &vals[2] + &vals[3]) % &f;
		assert_eq!(limbs::value_of(&b, &result), expected);
		b.build().verify().unwrap();
	}

	#[test]
	fn test_assert_mul_with_sums() {
		let mut rng = StdRng::seed_from_u64(15);
		let f = secp_base();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x1v = rng.gen_biguint_below(&f);
		let x2v = rng.gen_biguint_below(&f);
		let yv = rng.gen_biguint_below(&f);
		let x1 = witness(&b, &x1v);
		let x2 = witness(&b, &x2v);
		let y = witness(&b, &yv);

		let product = (&x1v + &x2v) * &yv % &f;
		let xy = witness(&b, &product);
		assert_mul(&b, Sum::new(x1).add(x2), y, xy, &f, "sum times y").unwrap();
		b.build().verify().unwrap();
	}

	#[test]
	fn test_equals_large_modulus() {
		let f = secp_base();
		let c = BigUint::from(42u32);
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);

		let x = witness(&b, &c);
		let eq = equals(&b, &x, &c, &f).unwrap();
		b.assert_true("equal", &eq).unwrap();

		// the shifted representative c + f also compares equal
		let x_shifted = witness(&b, &(&c + &f));
		let eq = equals(&b, &x_shifted, &c, &f).unwrap();
		b.assert_true("shifted equal", &eq).unwrap();

		let y = witness(&b, &BigUint::from(43u32));
		let ne = equals(&b, &y, &c, &f).unwrap();
		b.assert_false("not equal", &ne).unwrap();

		b.build().verify().unwrap();
	}

	#[test]
	fn test_equals_small_modulus() {
		// small moduli take the comparison-based path
		let f = (BigUint::one() << 100) - 15u32;
		let c = BigUint::from(566u32);
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);

		let x = witness(&b, &c);
		let eq = equals(&b, &x, &c, &f).unwrap();
		b.assert_true("equal", &eq).unwrap();

		let y = witness(&b, &BigUint::from(567u32));
		let ne = equals(&b, &y, &c, &f).unwrap();
		b.assert_false("not equal", &ne).unwrap();

		b.build().verify().unwrap();
	}

	#[test]
	fn test_to_canonical() {
		let f = secp_order();
		let c = BigUint::from(77u32);
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = witness(&b, &(&c + &f));
		let canonical = to_canonical(&b, &x, &f).unwrap();
		assert_eq!(limbs::value_of(&b, &canonical), c);
		b.build().verify().unwrap();
	}

	#[test]
	fn test_assert_less_than() {
		let f = secp_order();
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = witness(&b, &(&f - 1u32));
		assert_less_than_constant(&b, &x, &f).unwrap();
		b.build().verify().unwrap();

		// x = f is out of range
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = witness(&b, &f);
		assert_less_than_constant(&b, &x, &f).unwrap();
		assert!(b.build().verify().is_err());

		// constant case fails synchronously
		let b = CircuitBuilder::<Fp>::new(Mode::Prover);
		let x = limbs::constant::<Fp>(&f);
		assert!(matches!(
			assert_less_than_constant(&b, &x, &f),
			Err(CircuitError::OutOfRange(_))
		));
	}
}
