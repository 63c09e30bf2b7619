// Copyright 2025 Irreducible Inc.

use std::{cell::RefCell, rc::Rc};

use cranelift_entity::PrimaryMap;
use num_bigint::{BigInt, BigUint};

use crate::{
	error::{CircuitError, Result},
	field::NativeField,
	gate::{Gate, GenericCoeffs},
	var::{FieldVar, Wire},
};

/// Whether the builder is tracing the circuit shape only or also computing a
/// witness.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
	/// Gates are recorded, witness callbacks are skipped and every cell holds
	/// zero.
	Compile,
	/// Witness callbacks run and every cell holds its computed value.
	Prover,
}

struct Shared<F: NativeField> {
	mode: Mode,
	gates: Vec<Gate<F>>,
	values: PrimaryMap<Wire, F>,
}

/// Records gates and witness values as gadget code runs.
///
/// The builder is cheaply cloneable and hands out shared access, so gadget
/// helpers take it by reference. [`CircuitBuilder::build`] consumes the shared
/// state; building twice panics.
pub struct CircuitBuilder<F: NativeField> {
	shared: Rc<RefCell<Option<Shared<F>>>>,
}

impl<F: NativeField> Clone for CircuitBuilder<F> {
	fn clone(&self) -> Self {
		CircuitBuilder { shared: Rc::clone(&self.shared) }
	}
}

impl<F: NativeField> CircuitBuilder<F> {
	pub fn new(mode: Mode) -> Self {
		CircuitBuilder {
			shared: Rc::new(RefCell::new(Some(Shared {
				mode,
				gates: Vec::new(),
				values: PrimaryMap::new(),
			}))),
		}
	}

	fn with<R>(&self, f: impl FnOnce(&mut Shared<F>) -> R) -> R {
		let mut guard = self.shared.borrow_mut();
		let shared = guard.as_mut().expect("builder already consumed by build()");
		f(shared)
	}

	pub fn mode(&self) -> Mode {
		self.with(|s| s.mode)
	}

	pub fn is_prover(&self) -> bool {
		self.mode() == Mode::Prover
	}

	pub fn n_gates(&self) -> usize {
		self.with(|s| s.gates.len())
	}

	/// Allocate a witness cell holding `value`.
	pub fn alloc(&self, value: F) -> Wire {
		self.with(|s| s.values.push(value))
	}

	/// Allocate `N` witness cells. In prover mode `compute` supplies their
	/// values (reduced into the native field); in compile mode it is not
	/// called and the cells hold zero.
	///
	/// The callback may read previously assigned cells through
	/// [`CircuitBuilder::value`] and friends.
	pub fn exists<const N: usize>(
		&self,
		compute: impl FnOnce() -> [BigInt; N],
	) -> [FieldVar<F>; N] {
		let values = match self.mode() {
			Mode::Prover => compute().map(|x| F::from_bigint(&x)),
			Mode::Compile => [F::ZERO; N],
		};
		values.map(|v| FieldVar::Var(self.alloc(v)))
	}

	pub fn exists_one(&self, compute: impl FnOnce() -> BigInt) -> FieldVar<F> {
		let [var] = self.exists(|| [compute()]);
		var
	}

	/// Current value of a var. Only valid in prover mode.
	pub fn value(&self, x: &FieldVar<F>) -> F {
		match x {
			FieldVar::Constant(c) => *c,
			FieldVar::Var(w) => {
				assert!(self.is_prover(), "witness values are only available in prover mode");
				self.with(|s| s.values[*w])
			}
		}
	}

	/// Canonical bigint value of a var. Only valid in prover mode.
	pub fn value_biguint(&self, x: &FieldVar<F>) -> BigUint {
		self.value(x).to_biguint()
	}

	/// Resolve a var to a wire, pinning constants with a generic gate.
	pub fn to_var(&self, x: &FieldVar<F>) -> Wire {
		match x {
			FieldVar::Var(w) => *w,
			FieldVar::Constant(c) => {
				let w = self.alloc(*c);
				self.push_gate(Gate::Generic {
					coeffs: GenericCoeffs {
						left: F::ONE,
						constant: -*c,
						..GenericCoeffs::zero()
					},
					wires: [w, w, w],
					label: "constant".to_string(),
				});
				w
			}
		}
	}

	pub fn push_gate(&self, gate: Gate<F>) {
		self.with(|s| s.gates.push(gate));
	}

	pub fn assert_generic(
		&self,
		label: impl Into<String>,
		coeffs: GenericCoeffs<F>,
		wires: [Wire; 3],
	) {
		self.push_gate(Gate::Generic { coeffs, wires, label: label.into() });
	}

	pub fn zero_row(&self, wires: [Wire; 3]) {
		self.push_gate(Gate::Zero { wires });
	}

	/// Finish recording and hand over the gates and witness.
	///
	/// # Panics
	/// Panics if called twice on clones of the same builder.
	pub fn build(&self) -> Circuit<F> {
		let shared = self
			.shared
			.borrow_mut()
			.take()
			.expect("builder already consumed by build()");
		Circuit { mode: shared.mode, gates: shared.gates, values: shared.values }
	}
}

/// A finished circuit: the recorded gates plus the witness assignment.
pub struct Circuit<F: NativeField> {
	mode: Mode,
	gates: Vec<Gate<F>>,
	values: PrimaryMap<Wire, F>,
}

impl<F: NativeField> Circuit<F> {
	pub fn n_gates(&self) -> usize {
		self.gates.len()
	}

	pub fn value(&self, x: &FieldVar<F>) -> F {
		match x {
			FieldVar::Constant(c) => *c,
			FieldVar::Var(w) => self.values[*w],
		}
	}

	pub fn value_biguint(&self, x: &FieldVar<F>) -> BigUint {
		self.value(x).to_biguint()
	}

	/// Check every gate against the witness.
	///
	/// This is the reference semantics of the gate catalogue: a circuit is
	/// satisfiable exactly when this returns `Ok`.
	pub fn verify(&self) -> Result<()> {
		if self.mode != Mode::Prover {
			return Err(CircuitError::UnsoundUsage(
				"verify requires a witness; build the circuit in prover mode".to_string(),
			));
		}
		for (row, gate) in self.gates.iter().enumerate() {
			gate.verify(row, &self.values)?;
		}
		tracing::debug!(gates = self.gates.len(), "circuit verified");
		Ok(())
	}
}
