// Copyright 2025 Irreducible Inc.
//! Gadgets for non-native ("foreign") field arithmetic and elliptic curve
//! operations, built on the [`ferrite_frontend`] circuit builder.
//!
//! Foreign elements are carried as three 88-bit limbs of the native field.
//! The [`foreign_field`] module provides modular arithmetic on them, backed
//! by the range check gates in [`range_check`]; [`element`] wraps the raw
//! limbs in types that track reduction levels. The [`ec`] module builds
//! affine curve operations, GLV scalar multiplication and ECDSA verification
//! on top.

pub mod ec;
pub mod element;
pub mod foreign_field;
pub mod limbs;
pub mod range_check;

pub use element::{AlmostReduced, AsLimbs, Canonical, Unreduced};
pub use limbs::Field3;
