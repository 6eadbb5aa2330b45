//! # kestrel-core
//!
//! Operator descriptors, datatype inference, and the minimal tensor and
//! graph types they are built over.
//!
//! This crate provides:
//! - [`OpKind`] — closed set of operators, each with arity, datatype and shape rules
//! - [`OpDescriptor`] — eager-mode value object consumed by an [`OpExecutor`]
//! - [`Softmax`] / [`SoftmaxBp`] — operator configurations with `eager()` and `graph()` submission
//! - [`SymGraph`] — symbolic graph for graph-mode construction and execution
//! - [`Differentiable`] — capability of operators that have a derivative
//! - [`Tensor`] / [`Shape`] / [`DType`] — dense host tensors
//! - [`Error`] / [`Result`] — the single error type used everywhere

pub mod dtype;
pub mod error;
pub mod executor;
pub mod graph;
pub mod op;
pub mod ops;
pub mod shape;
pub mod storage;
pub mod tensor;

pub use dtype::{DType, WithDType};
pub use error::{Error, Result};
pub use executor::OpExecutor;
pub use graph::{Node, NodeId, SymGraph, VarId, VarKind, Variable};
pub use op::{wrap_or_none, Differentiable, OpDef, OpDescriptor, OpKind, DEFAULT_AXIS};
pub use ops::{Softmax, SoftmaxBp};
pub use shape::Shape;
pub use storage::Storage;
pub use tensor::{Tensor, TensorId};
