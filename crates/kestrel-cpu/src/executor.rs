use kestrel_core::{
    DType, Error, OpDescriptor, OpExecutor, OpKind, Result, Shape, Tensor, DEFAULT_AXIS,
};

use crate::kernels::{self, AxisView};

// CpuExecutor — Reference executor for operator descriptors
//
// Every exec() call follows the same pipeline:
//
//   1. datatype inference   (OpKind rule; InvalidArgument on failure)
//   2. shape inference      (OpKind rule: axis in range, operand shapes agree)
//   3. outputs              (validate the caller's, or allocate by {dtype, shape})
//   4. kernel               (exhaustive match on OpKind, computed in f64)
//   5. write back           (converted to each output's dtype)
//
// Nothing is written until the kernel has produced all of its results, so
// a failing call leaves a caller-supplied output untouched.

/// Single-threaded CPU executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuExecutor;

impl CpuExecutor {
    pub fn new() -> Self {
        CpuExecutor
    }
}

impl OpExecutor for CpuExecutor {
    fn exec(&self, desc: &OpDescriptor) -> Result<Vec<Tensor>> {
        let dtypes = desc.calculate_output_dtypes()?;
        let shapes = desc.calculate_output_shapes()?;
        let outputs = prepare_outputs(desc, &dtypes, &shapes)?;

        log::debug!(
            "cpu: exec {} inputs={:?} iargs={:?} preallocated={}",
            desc.name(),
            desc.inputs(),
            desc.iargs(),
            !desc.outputs().is_empty()
        );

        let results = match desc.kind() {
            OpKind::Softmax => vec![run_softmax(desc)?],
            OpKind::SoftmaxBp => vec![run_softmax_bp(desc)?],
        };
        for (out, data) in outputs.iter().zip(&results) {
            out.write_f64(data)?;
        }
        Ok(outputs)
    }
}

fn prepare_outputs(desc: &OpDescriptor, dtypes: &[DType], shapes: &[Shape]) -> Result<Vec<Tensor>> {
    if desc.outputs().is_empty() {
        return Ok(dtypes
            .iter()
            .zip(shapes)
            .map(|(&dtype, shape)| Tensor::zeros(shape, dtype))
            .collect());
    }
    if desc.outputs().len() != dtypes.len() {
        return Err(Error::invalid_argument(format!(
            "op {} produces {} outputs, descriptor carries {}",
            desc.name(),
            dtypes.len(),
            desc.outputs().len()
        )));
    }
    for ((out, &dtype), shape) in desc.outputs().iter().zip(dtypes).zip(shapes) {
        if out.dtype() != dtype {
            return Err(Error::DTypeMismatch {
                expected: dtype,
                got: out.dtype(),
            });
        }
        if out.shape() != shape {
            return Err(Error::ShapeMismatch {
                expected: shape.clone(),
                got: out.shape().clone(),
            });
        }
    }
    Ok(desc.outputs().to_vec())
}

fn axis_view(desc: &OpDescriptor, shape: &Shape) -> Result<AxisView> {
    let axis = shape.normalize_axis(desc.axis().unwrap_or(DEFAULT_AXIS))?;
    let (outer, axis_len, inner) = shape.split_at_axis(axis)?;
    Ok(AxisView {
        outer,
        axis_len,
        inner,
    })
}

fn run_softmax(desc: &OpDescriptor) -> Result<Vec<f64>> {
    let input = &desc.inputs()[0];
    let view = axis_view(desc, input.shape())?;
    Ok(kernels::softmax(&input.to_f64_vec(), view))
}

fn run_softmax_bp(desc: &OpDescriptor) -> Result<Vec<f64>> {
    let [input, grad, softmax_out] = desc.inputs() else {
        return Err(Error::invalid_argument(format!(
            "softmax_bp expects 3 inputs, got {}",
            desc.inputs().len()
        )));
    };
    let view = axis_view(desc, input.shape())?;
    Ok(kernels::softmax_bp(
        &grad.to_f64_vec(),
        &softmax_out.to_f64_vec(),
        view,
    ))
}
