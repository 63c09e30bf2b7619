// Copyright 2025 Irreducible Inc.
//! Elliptic curve gadgets over foreign base fields.

pub mod arithmetic;
pub mod curve;
pub mod ecdsa;
pub mod glv;
pub mod point;
pub mod scalar_mul;

pub use curve::{Affine, Curve};
pub use point::Point;
pub use scalar_mul::{multi_scalar_mul, scale, MsmMode};

#[cfg(test)]
mod tests;
