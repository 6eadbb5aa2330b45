// Op — Operator kinds, descriptors, and the capability traits around them
//
// An operator descriptor names a computation and carries its operands:
//
//   OpDescriptor {
//       kind:    OpKind::SoftmaxBp,          // dispatch key ("softmax_bp")
//       inputs:  [input, grad, softmax_out], // order-significant
//       outputs: [] or [preallocated],       // empty → engine allocates
//       iargs:   [] or [axis],               // integer arguments
//   }
//
// DISPATCH:
//
//   The set of operators is closed: OpKind has one variant per operator, and
//   every per-operator rule (arity, datatype inference, shape inference,
//   differentiation) is an exhaustive match on it. Executors dispatch kernels
//   the same way. The string name only exists for logging and for engines
//   that key kernels by name.
//
// DIFFERENTIATION:
//
//   `Differentiable` is a capability an operator type either has or lacks.
//   Softmax has it (its gradient is a softmax_bp node); SoftmaxBp does not,
//   so generic code bounded on `Differentiable` cannot be instantiated with
//   it. Code that only holds an OpKind goes through
//   `OpKind::differentiate`, which reports `UnsupportedOperation` for kinds
//   without the capability.

use serde::{Deserialize, Serialize};

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::graph::{NodeId, SymGraph, VarId};
use crate::ops::softmax::{self, Softmax};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Reduction axis used when an operator carries no integer argument.
pub const DEFAULT_AXIS: i64 = -1;

/// Every operator Kestrel knows how to describe and execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Softmax along an axis: one floating-point operand.
    Softmax,
    /// Softmax backward: {input, upstream gradient, softmax forward output}.
    SoftmaxBp,
}

impl OpKind {
    pub const ALL: [OpKind; 2] = [OpKind::Softmax, OpKind::SoftmaxBp];

    /// Fixed identifier an engine uses to resolve the kernel.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Softmax => "softmax",
            OpKind::SoftmaxBp => "softmax_bp",
        }
    }

    /// Reverse of [`OpKind::name`].
    pub fn from_name(name: &str) -> Option<OpKind> {
        OpKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Number of positional operands the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            OpKind::Softmax => 1,
            OpKind::SoftmaxBp => 3,
        }
    }

    /// Infer output dtypes from input dtypes, before anything executes.
    pub fn calculate_output_dtypes(&self, dtypes: &[DType]) -> Result<Vec<DType>> {
        match self {
            OpKind::Softmax => softmax::softmax_output_dtypes(dtypes),
            OpKind::SoftmaxBp => softmax::softmax_bp_output_dtypes(dtypes),
        }
    }

    /// Infer output shapes from input shapes and integer arguments.
    ///
    /// Both softmax operators are shape-preserving: the single output takes
    /// operand 0's shape. The axis (`iargs[0]`, else [`DEFAULT_AXIS`]) must
    /// exist in that shape, and softmax_bp's three operands must share it.
    pub fn calculate_output_shapes(&self, shapes: &[Shape], iargs: &[i64]) -> Result<Vec<Shape>> {
        if shapes.len() != self.arity() {
            return Err(Error::invalid_argument(format!(
                "op {} expects {} input shapes, got {:?}",
                self.name(),
                self.arity(),
                shapes
            )));
        }
        let input = &shapes[0];
        input.normalize_axis(iargs.first().copied().unwrap_or(DEFAULT_AXIS))?;
        match self {
            OpKind::Softmax => {}
            OpKind::SoftmaxBp => {
                for other in &shapes[1..] {
                    if other != input {
                        return Err(Error::ShapeMismatch {
                            expected: input.clone(),
                            got: other.clone(),
                        });
                    }
                }
            }
        }
        Ok(vec![input.clone()])
    }

    /// Add gradient nodes for `node` to `graph`, given gradients of its outputs.
    ///
    /// Returns one gradient variable per node input that has a gradient.
    /// Fails with `UnsupportedOperation` for operators without a derivative.
    pub fn differentiate(
        &self,
        graph: &mut SymGraph,
        node: NodeId,
        grads: &[VarId],
    ) -> Result<Vec<VarId>> {
        match self {
            OpKind::Softmax => <Softmax<VarId> as Differentiable>::diff(graph, node, grads),
            OpKind::SoftmaxBp => Err(Error::unsupported(format!(
                "differentiating op {} not supported",
                self.name()
            ))),
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static metadata shared by every operator configuration type.
pub trait OpDef {
    /// The closed-enum kind this configuration builds.
    const KIND: OpKind;

    /// Dispatch name, e.g. `"softmax_bp"`.
    fn op_name(&self) -> &'static str {
        Self::KIND.name()
    }

    /// Datatype inference for this operator; see [`OpKind::calculate_output_dtypes`].
    fn calculate_output_dtypes(&self, dtypes: &[DType]) -> Result<Vec<DType>> {
        Self::KIND.calculate_output_dtypes(dtypes)
    }
}

/// Operators whose gradient can be expressed as more graph nodes.
///
/// `SoftmaxBp` deliberately has no implementation:
///
/// ```compile_fail
/// use kestrel_core::{Differentiable, SoftmaxBp, VarId};
///
/// fn needs_grad<D: Differentiable>() {}
/// needs_grad::<SoftmaxBp<VarId>>();
/// ```
pub trait Differentiable: OpDef {
    /// Emit nodes computing the gradients of `node`'s inputs from `grads`,
    /// the gradients of its outputs.
    fn diff(graph: &mut SymGraph, node: NodeId, grads: &[VarId]) -> Result<Vec<VarId>>;
}

// OpDescriptor — Eager-mode value object handed to an executor

/// One eager operator invocation: kind, concrete operands, optional outputs,
/// and integer arguments.
///
/// Built once (usually by a config's `eager()`), read by the executor, then
/// dropped. Operands are never mutated; a pre-allocated output is written by
/// the executor.
#[derive(Debug, Clone)]
pub struct OpDescriptor {
    kind: OpKind,
    inputs: Vec<Tensor>,
    outputs: Vec<Tensor>,
    iargs: Vec<i64>,
}

impl OpDescriptor {
    pub fn new(kind: OpKind, inputs: Vec<Tensor>, outputs: Vec<Tensor>, iargs: Vec<i64>) -> Self {
        Self {
            kind,
            inputs,
            outputs,
            iargs,
        }
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn inputs(&self) -> &[Tensor] {
        &self.inputs
    }

    /// Pre-allocated outputs; empty when the executor should allocate.
    pub fn outputs(&self) -> &[Tensor] {
        &self.outputs
    }

    pub fn iargs(&self) -> &[i64] {
        &self.iargs
    }

    /// The reduction axis, if one was given.
    pub fn axis(&self) -> Option<i64> {
        self.iargs.first().copied()
    }

    pub fn input_dtypes(&self) -> Vec<DType> {
        self.inputs.iter().map(|t| t.dtype()).collect()
    }

    /// Run the kind's datatype rule over this descriptor's operands.
    pub fn calculate_output_dtypes(&self) -> Result<Vec<DType>> {
        self.kind.calculate_output_dtypes(&self.input_dtypes())
    }

    /// Run the kind's shape rule over this descriptor's operands.
    pub fn calculate_output_shapes(&self) -> Result<Vec<Shape>> {
        let shapes: Vec<Shape> = self.inputs.iter().map(|t| t.shape().clone()).collect();
        self.kind.calculate_output_shapes(&shapes, &self.iargs)
    }
}

/// Turn an optional output into the descriptor's output list.
pub fn wrap_or_none(output: Option<Tensor>) -> Vec<Tensor> {
    output.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in OpKind::ALL {
            assert_eq!(OpKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(OpKind::from_name("softmax_bp_v2"), None);
        assert_eq!(OpKind::SoftmaxBp.to_string(), "softmax_bp");
    }

    #[test]
    fn test_serde_uses_dispatch_name() {
        let json = serde_json::to_string(&OpKind::SoftmaxBp).unwrap();
        assert_eq!(json, "\"softmax_bp\"");
    }

    #[test]
    fn test_shape_rule_checks_arity() {
        let s = Shape::from((2, 3));
        assert_eq!(
            OpKind::SoftmaxBp
                .calculate_output_shapes(&[s.clone(), s.clone(), s.clone()], &[])
                .unwrap(),
            vec![s.clone()]
        );
        assert!(matches!(
            OpKind::SoftmaxBp.calculate_output_shapes(&[s.clone()], &[]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_shape_rule_checks_axis_and_operands() {
        let s = Shape::from((2, 3));
        assert!(OpKind::Softmax.calculate_output_shapes(&[s.clone()], &[-2]).is_ok());
        assert!(matches!(
            OpKind::Softmax.calculate_output_shapes(&[s.clone()], &[9]),
            Err(Error::DimOutOfRange { dim: 9, rank: 2 })
        ));
        assert!(matches!(
            OpKind::Softmax.calculate_output_shapes(&[Shape::from(())], &[]),
            Err(Error::DimOutOfRange { .. })
        ));
        assert!(matches!(
            OpKind::SoftmaxBp.calculate_output_shapes(&[s.clone(), Shape::from(7), s.clone()], &[]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_descriptor_accessors() {
        let t = Tensor::zeros((2, 2), DType::F32);
        let desc = OpDescriptor::new(OpKind::Softmax, vec![t.clone()], wrap_or_none(None), vec![0]);
        assert_eq!(desc.name(), "softmax");
        assert_eq!(desc.axis(), Some(0));
        assert!(desc.outputs().is_empty());
        assert_eq!(desc.input_dtypes(), vec![DType::F32]);
        assert_eq!(desc.calculate_output_dtypes().unwrap(), vec![DType::F32]);
        assert_eq!(desc.calculate_output_shapes().unwrap(), vec![Shape::from((2, 2))]);
    }
}
