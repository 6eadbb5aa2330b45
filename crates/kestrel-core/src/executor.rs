use crate::error::Result;
use crate::op::OpDescriptor;
use crate::tensor::Tensor;

// OpExecutor — The seam between descriptors and whatever computes them
//
// Descriptors are plain data; an executor turns one into output tensors.
// The reference implementation lives in `kestrel-cpu`. Graph execution
// (`SymGraph::exec`) is written against this trait only, so any engine that
// can run an eager descriptor can run a whole graph.
//
// CONTRACT:
//
//   1. Run the kind's datatype and shape rules before touching data.
//   2. If the descriptor carries outputs, validate and fill them in place
//      and return those same handles; otherwise allocate fresh tensors for
//      the inferred {dtype, shape}.
//   3. Never modify the descriptor's inputs.

/// Executes eager operator descriptors.
pub trait OpExecutor {
    /// Run `desc` and return its outputs, in order.
    fn exec(&self, desc: &OpDescriptor) -> Result<Vec<Tensor>>;
}

impl<E: OpExecutor + ?Sized> OpExecutor for &E {
    fn exec(&self, desc: &OpDescriptor) -> Result<Vec<Tensor>> {
        (**self).exec(desc)
    }
}
