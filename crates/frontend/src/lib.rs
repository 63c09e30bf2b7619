// Copyright 2025 Irreducible Inc.
//! Circuit frontend: a gate-recording builder with a reference checker.
//!
//! The builder records rows from a small catalogue (generic gates, 88-bit
//! range checks and the two foreign-field gates) together with a witness
//! assignment, and [`Circuit::verify`] replays every row against the witness.
//! Gadget crates sit on top and only ever talk to [`CircuitBuilder`].

mod builder;
mod error;
mod field;
mod gate;
mod native;
mod var;

pub use builder::{Circuit, CircuitBuilder, Mode};
pub use error::{CircuitError, Result};
pub use field::NativeField;
pub use gate::{Gate, GenericCoeffs, RangePack};
pub use var::{BoolVar, FieldVar, Wire};
