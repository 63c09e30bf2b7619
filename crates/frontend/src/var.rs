// Copyright 2025 Irreducible Inc.

use crate::field::NativeField;

/// Index of a witness cell in the circuit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Wire(u32);
cranelift_entity::entity_impl!(Wire);

/// A native field value inside the circuit: either a compile-time constant or
/// a reference to a witness cell.
///
/// Gadgets fold operations on constants eagerly and only emit gates when a
/// variable is involved, so the same gadget code serves both the constant and
/// the in-circuit path.
#[derive(Clone, Copy, Debug)]
pub enum FieldVar<F: NativeField> {
	Constant(F),
	Var(Wire),
}

impl<F: NativeField> FieldVar<F> {
	pub fn zero() -> Self {
		FieldVar::Constant(F::ZERO)
	}

	pub fn one() -> Self {
		FieldVar::Constant(F::ONE)
	}

	pub fn constant(value: u64) -> Self {
		FieldVar::Constant(F::from(value))
	}

	pub fn is_constant(&self) -> bool {
		matches!(self, FieldVar::Constant(_))
	}

	pub fn as_constant(&self) -> Option<F> {
		match self {
			FieldVar::Constant(c) => Some(*c),
			FieldVar::Var(_) => None,
		}
	}
}

impl<F: NativeField> From<Wire> for FieldVar<F> {
	fn from(wire: Wire) -> Self {
		FieldVar::Var(wire)
	}
}

/// A [`FieldVar`] known to hold 0 or 1.
///
/// Constructors in the gadget layer either emit the boolean constraint or
/// inherit it structurally, so holders of a `BoolVar` may rely on the value
/// being a bit.
#[derive(Clone, Copy, Debug)]
pub struct BoolVar<F: NativeField>(FieldVar<F>);

impl<F: NativeField> BoolVar<F> {
	/// Wrap a var that is already constrained (or constant-known) to be a bit.
	pub(crate) fn from_checked(var: FieldVar<F>) -> Self {
		BoolVar(var)
	}

	pub fn constant(b: bool) -> Self {
		BoolVar(FieldVar::Constant(if b { F::ONE } else { F::ZERO }))
	}

	pub fn var(&self) -> FieldVar<F> {
		self.0
	}

	pub fn as_constant(&self) -> Option<bool> {
		self.0.as_constant().map(|c| c == F::ONE)
	}
}
