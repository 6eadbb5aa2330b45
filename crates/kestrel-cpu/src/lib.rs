//! # kestrel-cpu
//!
//! Reference CPU executor for Kestrel operator descriptors.
//!
//! Kernels compute in f64 on dense row-major buffers and convert results to
//! each output's dtype. They favour clarity over speed.

pub mod executor;
pub mod kernels;

pub use executor::CpuExecutor;
