//! Shared traits for the strided-matrix ecosystem.
//!
//! This crate holds the scalar bounds used by `strided-matrix` and by the
//! components layered on top of it (layers, activation functions, weight
//! stores), so those crates can implement or require them without depending
//! on the full matrix crate.

pub mod scalar;

pub use scalar::{BlasFloat, MatrixScalar};
