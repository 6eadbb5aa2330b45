// Softmax and its backward operator
//
// Configuration structs are generic over the operand handle:
//
//   Softmax<Tensor>   / SoftmaxBp<Tensor>  → `.eager()`  → OpDescriptor
//   Softmax<VarId>    / SoftmaxBp<VarId>   → `.graph(g)` → new node in g
//
// The optional axis is stored as the node's/descriptor's single integer
// argument. When absent, executors use the last axis.
//
// softmax_bp operands, in order:
//   0. input        — the tensor softmax was applied to
//   1. grad         — upstream gradient dL/dy
//   2. softmax_out  — the forward result y = softmax(input)
//
// Its datatype rule checks operands 0 and 1 only. Operand 2 is accepted with
// any dtype.

use crate::dtype::DType;
use crate::ensure;
use crate::error::{Error, Result};
use crate::graph::{NodeId, SymGraph, VarId};
use crate::op::{wrap_or_none, Differentiable, OpDef, OpDescriptor, OpKind};
use crate::tensor::Tensor;

pub(crate) fn softmax_output_dtypes(dtypes: &[DType]) -> Result<Vec<DType>> {
    ensure!(
        dtypes.len() == 1,
        "expected exactly 1 input datatype for softmax, got {:?}",
        dtypes
    );
    ensure!(
        dtypes[0].is_float(),
        "input 0 must be a floating point type, got {}",
        dtypes[0]
    );
    Ok(vec![dtypes[0]])
}

pub(crate) fn softmax_bp_output_dtypes(dtypes: &[DType]) -> Result<Vec<DType>> {
    ensure!(
        dtypes.len() == 3,
        "expected exactly 3 input datatypes for softmax_bp, got {:?}",
        dtypes
    );
    ensure!(
        dtypes[0].is_float(),
        "input 0 must be a floating point type, got {} in {:?}",
        dtypes[0],
        dtypes
    );
    ensure!(
        dtypes[1].is_float(),
        "input 1 must be a floating point type, got {} in {:?}",
        dtypes[1],
        dtypes
    );
    ensure!(
        dtypes[0] == dtypes[1],
        "input and gradient must be the same type, got {:?}",
        dtypes
    );
    Ok(vec![dtypes[0]])
}

fn iargs_for(axis: Option<i64>) -> Vec<i64> {
    axis.into_iter().collect()
}

/// Softmax along one axis.
#[derive(Debug, Clone)]
pub struct Softmax<T> {
    input: T,
    axis: Option<i64>,
    output: Option<T>,
}

impl<T> Softmax<T> {
    pub fn new(input: T) -> Self {
        Self {
            input,
            axis: None,
            output: None,
        }
    }

    /// Reduction axis; negative values count from the end.
    pub fn with_axis(mut self, axis: i64) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Write the result into `output` instead of a fresh tensor (eager only).
    pub fn with_output(mut self, output: T) -> Self {
        self.output = Some(output);
        self
    }

    pub fn axis(&self) -> Option<i64> {
        self.axis
    }
}

impl<T> OpDef for Softmax<T> {
    const KIND: OpKind = OpKind::Softmax;
}

impl Softmax<Tensor> {
    /// Build the eager descriptor. Nothing is computed here.
    pub fn eager(self) -> OpDescriptor {
        OpDescriptor::new(
            Self::KIND,
            vec![self.input],
            wrap_or_none(self.output),
            iargs_for(self.axis),
        )
    }
}

impl Softmax<VarId> {
    /// Register a softmax node in `graph` and return its output variable.
    pub fn graph(self, graph: &mut SymGraph) -> Result<VarId> {
        reject_graph_output(Self::KIND, self.output.is_some())?;
        let node = graph.add_op(Self::KIND, &[self.input], iargs_for(self.axis))?;
        graph.single_output(node)
    }
}

impl<T> Differentiable for Softmax<T> {
    fn diff(graph: &mut SymGraph, node: NodeId, grads: &[VarId]) -> Result<Vec<VarId>> {
        let n = graph.node(node)?;
        ensure!(
            n.kind() == OpKind::Softmax,
            "node {} is {}, not softmax",
            n.name(),
            n.kind()
        );
        ensure!(
            grads.len() == 1,
            "softmax has 1 output, got {} gradients",
            grads.len()
        );
        let input = n.inputs()[0];
        let output = n.outputs()[0];
        let axis = n.iargs().first().copied();

        let mut bp = SoftmaxBp::new(input, grads[0], output);
        if let Some(axis) = axis {
            bp = bp.with_axis(axis);
        }
        Ok(vec![bp.graph(graph)?])
    }
}

/// Backward pass of softmax: gradient w.r.t. the softmax input.
///
/// # Example
/// ```
/// use kestrel_core::{DType, SoftmaxBp, Tensor};
///
/// let x = Tensor::zeros((2, 3), DType::F32);
/// let g = Tensor::zeros((2, 3), DType::F32);
/// let y = Tensor::zeros((2, 3), DType::F32);
/// let desc = SoftmaxBp::new(x, g, y).with_axis(-1).eager();
/// assert_eq!(desc.name(), "softmax_bp");
/// assert_eq!(desc.iargs(), &[-1]);
/// ```
#[derive(Debug, Clone)]
pub struct SoftmaxBp<T> {
    input: T,
    grad: T,
    softmax_out: T,
    axis: Option<i64>,
    output: Option<T>,
}

impl<T> SoftmaxBp<T> {
    pub fn new(input: T, grad: T, softmax_out: T) -> Self {
        Self {
            input,
            grad,
            softmax_out,
            axis: None,
            output: None,
        }
    }

    /// Reduction axis; negative values count from the end.
    pub fn with_axis(mut self, axis: i64) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Write the result into `output` instead of a fresh tensor (eager only).
    pub fn with_output(mut self, output: T) -> Self {
        self.output = Some(output);
        self
    }

    pub fn axis(&self) -> Option<i64> {
        self.axis
    }
}

impl<T> OpDef for SoftmaxBp<T> {
    const KIND: OpKind = OpKind::SoftmaxBp;
}

impl SoftmaxBp<Tensor> {
    /// Build the eager descriptor. Nothing is computed here.
    pub fn eager(self) -> OpDescriptor {
        OpDescriptor::new(
            Self::KIND,
            vec![self.input, self.grad, self.softmax_out],
            wrap_or_none(self.output),
            iargs_for(self.axis),
        )
    }
}

impl SoftmaxBp<VarId> {
    /// Register a softmax_bp node in `graph` and return its output variable.
    pub fn graph(self, graph: &mut SymGraph) -> Result<VarId> {
        reject_graph_output(Self::KIND, self.output.is_some())?;
        let node = graph.add_op(
            Self::KIND,
            &[self.input, self.grad, self.softmax_out],
            iargs_for(self.axis),
        )?;
        graph.single_output(node)
    }
}

fn reject_graph_output(kind: OpKind, has_output: bool) -> Result<()> {
    if has_output {
        return Err(Error::invalid_argument(format!(
            "graph-mode {} allocates its own output; with_output is eager-only",
            kind
        )));
    }
    Ok(())
}
