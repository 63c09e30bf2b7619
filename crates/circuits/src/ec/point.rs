// Copyright 2025 Irreducible Inc.

use ferrite_frontend::{BoolVar, CircuitBuilder, NativeField, Result};

use crate::{
	ec::curve::{Affine, Curve},
	foreign_field, limbs,
	limbs::Field3,
	range_check::multi_range_check,
};

/// Non-zero curve point in affine coordinates, with foreign-field limbs.
#[derive(Clone, Copy, Debug)]
pub struct Point<F: NativeField> {
	pub x: Field3<F>,
	pub y: Field3<F>,
}

impl<F: NativeField> Point<F> {
	pub fn constant(p: &Affine) -> Self {
		assert!(!p.infinity, "cannot represent the point at infinity");
		Point { x: limbs::constant(&p.x), y: limbs::constant(&p.y) }
	}

	pub fn is_constant(&self) -> bool {
		limbs::is_constant(&self.x) && limbs::is_constant(&self.y)
	}

	pub fn as_constant(&self) -> Option<Affine> {
		Some(Affine {
			x: limbs::as_constant(&self.x)?,
			y: limbs::as_constant(&self.y)?,
			infinity: false,
		})
	}

	/// Current value. Only valid in prover mode.
	pub fn value_of(&self, b: &CircuitBuilder<F>) -> Affine {
		Affine {
			x: limbs::value_of(b, &self.x),
			y: limbs::value_of(b, &self.y),
			infinity: false,
		}
	}

	/// Witness a point and range check its coordinates.
	///
	/// Does not prove the point is on the curve; see
	/// [`arithmetic::assert_on_curve`](crate::ec::arithmetic::assert_on_curve).
	pub fn witness(
		b: &CircuitBuilder<F>,
		compute: impl FnOnce() -> Affine,
	) -> Result<Self> {
		let p = std::cell::RefCell::new(None::<Affine>);
		let x = limbs::exists(b, || {
			let affine = compute();
			let xv = affine.x.clone();
			*p.borrow_mut() = Some(affine);
			xv
		});
		let y = limbs::exists(b, || p.borrow_mut().take().expect("computed above").y);
		multi_range_check(b, &x)?;
		multi_range_check(b, &y)?;
		Ok(Point { x, y })
	}

	/// `if cond { p1 } else { p2 }`, limb-wise.
	pub fn select(
		b: &CircuitBuilder<F>,
		cond: &BoolVar<F>,
		p1: &Self,
		p2: &Self,
	) -> Self {
		Point {
			x: limbs::select(b, cond, &p1.x, &p2.x),
			y: limbs::select(b, cond, &p1.y, &p2.y),
		}
	}

	/// Whether this point equals a constant point, assuming both coordinates
	/// are almost reduced.
	pub fn equals_constant(
		&self,
		b: &CircuitBuilder<F>,
		p: &Affine,
		curve: &Curve,
	) -> Result<BoolVar<F>> {
		let x_eq = foreign_field::equals(b, &self.x, &(&p.x % &curve.modulus), &curve.modulus)?;
		let y_eq = foreign_field::equals(b, &self.y, &(&p.y % &curve.modulus), &curve.modulus)?;
		Ok(b.bool_and(&x_eq, &y_eq))
	}
}
