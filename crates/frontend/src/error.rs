// Copyright 2025 Irreducible Inc.

/// Errors raised while building or verifying a circuit.
///
/// Gadget-level misuse on constant inputs surfaces synchronously from the
/// gadget call; violations involving witness variables surface from
/// [`Circuit::verify`](crate::Circuit::verify) as [`Unsatisfiable`].
///
/// [`Unsatisfiable`]: CircuitError::Unsatisfiable
#[derive(Debug, thiserror::Error)]
pub enum CircuitError {
	#[error("value out of range: {0}")]
	OutOfRange(String),

	#[error("not invertible: {0}")]
	NotInvertible(String),

	#[error("modulus too large: {0}")]
	ModulusTooLarge(String),

	#[error("unsound gadget usage: {0}")]
	UnsoundUsage(String),

	#[error("constraint unsatisfiable at row {row}: {label}")]
	Unsatisfiable { row: usize, label: String },
}

pub type Result<T, E = CircuitError> = core::result::Result<T, E>;
