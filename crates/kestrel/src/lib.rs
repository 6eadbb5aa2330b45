//! # Kestrel
//!
//! Operator descriptors with datatype inference, a symbolic graph, and a
//! reference CPU executor.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use kestrel::prelude::*;
//!
//! let session = Session::default();
//! let x = Tensor::from_f64_slice(&[1.0, 2.0, 3.0], (3,), DType::F32)?;
//! let y = session.softmax(&x, None)?;
//! let dy = Tensor::from_f64_slice(&[1.0, 0.0, 0.0], (3,), DType::F32)?;
//! let dx = session.softmax_bp(&x, &dy, &y, None)?;
//! assert_eq!(dx.dtype(), DType::F32);
//! # Ok::<(), kestrel::Error>(())
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `kestrel-core` | DType, Shape, Tensor, OpKind, OpDescriptor, SymGraph, operator configs |
//! | `kestrel-cpu` | Reference CPU executor and kernels |

/// Re-export core types.
pub use kestrel_core::{
    dtype::WithDType,
    graph::{Node, NodeId, SymGraph, VarId, VarKind, Variable},
    op::{wrap_or_none, Differentiable, OpDef, OpDescriptor, OpKind},
    ops::{Softmax, SoftmaxBp},
    DType, Error, OpExecutor, Result, Shape, Tensor, TensorId, DEFAULT_AXIS,
};

/// Re-export the CPU executor.
pub use kestrel_cpu::CpuExecutor;

/// Session configuration.
pub mod config;

/// Config-aware executor wrapper.
pub mod session;

pub use config::RuntimeConfig;
pub use session::Session;

/// Prelude: import this for the most common types.
pub mod prelude {
    pub use crate::{
        CpuExecutor, DType, Differentiable, OpDef, OpDescriptor, OpExecutor, OpKind,
        RuntimeConfig, Session, Shape, Softmax, SoftmaxBp, SymGraph, Tensor, VarId,
    };
}
