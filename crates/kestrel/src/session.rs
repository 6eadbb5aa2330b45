use std::collections::HashMap;

use kestrel_core::{
    Error, OpDescriptor, OpExecutor, Result, Shape, Softmax, SoftmaxBp, SymGraph, Tensor, VarId,
};
use kestrel_cpu::CpuExecutor;

use crate::config::RuntimeConfig;

// Session — Executor wrapper that applies a RuntimeConfig
//
// A Session is itself an OpExecutor, so it can run eager descriptors
// directly and drive `SymGraph::exec`. Around the wrapped executor it adds:
//
//   verbose → one `info` log line per operator
//   debug   → every floating-point output is scanned for NaN/Inf
//
// It also offers one-call eager helpers for the softmax operators.

/// Runs operator descriptors and graphs under a [`RuntimeConfig`].
#[derive(Debug, Clone)]
pub struct Session<E = CpuExecutor> {
    executor: E,
    config: RuntimeConfig,
}

impl Session<CpuExecutor> {
    /// Create a session backed by the reference CPU executor.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_executor(CpuExecutor::new(), config)
    }
}

impl Default for Session<CpuExecutor> {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl<E: OpExecutor> Session<E> {
    pub fn with_executor(executor: E, config: RuntimeConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Declare a placeholder using the configured default dtype.
    pub fn placeholder(
        &self,
        graph: &mut SymGraph,
        name: &str,
        shape: impl Into<Shape>,
    ) -> Result<VarId> {
        graph.placeholder(name, self.config.default_dtype, shape)
    }

    /// Evaluate `graph` through this session.
    pub fn run_graph(
        &self,
        graph: &SymGraph,
        feeds: &HashMap<String, Tensor>,
        outputs: &[&str],
    ) -> Result<HashMap<String, Tensor>> {
        graph.exec(self, feeds, outputs)
    }

    /// Eager softmax; `axis` defaults to the last dimension.
    pub fn softmax(&self, input: &Tensor, axis: Option<i64>) -> Result<Tensor> {
        let mut op = Softmax::new(input.clone());
        if let Some(axis) = axis {
            op = op.with_axis(axis);
        }
        self.single(&op.eager())
    }

    /// Eager softmax backward; `axis` defaults to the last dimension.
    pub fn softmax_bp(
        &self,
        input: &Tensor,
        grad: &Tensor,
        softmax_out: &Tensor,
        axis: Option<i64>,
    ) -> Result<Tensor> {
        let mut op = SoftmaxBp::new(input.clone(), grad.clone(), softmax_out.clone());
        if let Some(axis) = axis {
            op = op.with_axis(axis);
        }
        self.single(&op.eager())
    }

    fn single(&self, desc: &OpDescriptor) -> Result<Tensor> {
        let mut outputs = self.exec(desc)?;
        match outputs.len() {
            1 => Ok(outputs.remove(0)),
            n => Err(Error::msg(format!(
                "op {} returned {} outputs, expected 1",
                desc.name(),
                n
            ))),
        }
    }
}

impl<E: OpExecutor> OpExecutor for Session<E> {
    fn exec(&self, desc: &OpDescriptor) -> Result<Vec<Tensor>> {
        if self.config.verbose {
            log::info!(
                "exec {} dtypes={:?} iargs={:?}",
                desc.name(),
                desc.input_dtypes(),
                desc.iargs()
            );
        }
        let outputs = self.executor.exec(desc)?;
        if self.config.debug {
            for (i, out) in outputs.iter().enumerate() {
                check_finite(desc, i, out)?;
            }
        }
        Ok(outputs)
    }
}

fn check_finite(desc: &OpDescriptor, index: usize, out: &Tensor) -> Result<()> {
    if !out.dtype().is_float() {
        return Ok(());
    }
    if let Some(pos) = out.to_f64_vec().iter().position(|v| !v.is_finite()) {
        return Err(Error::msg(format!(
            "op {} output {} has a non-finite value at flat index {}",
            desc.name(),
            index,
            pos
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::DType;

    #[test]
    fn test_debug_mode_catches_nan() {
        let x = Tensor::from_f64_slice(&[f64::NAN, 0.0], (2,), DType::F64).unwrap();
        let quiet = Session::default();
        assert!(quiet.softmax(&x, None).is_ok());

        let strict = Session::new(RuntimeConfig::default().with_debug(true));
        let err = strict.softmax(&x, None).unwrap_err();
        assert!(err.to_string().contains("non-finite"), "{err}");
    }

    #[test]
    fn test_placeholder_uses_default_dtype() {
        let session = Session::new(RuntimeConfig::default().with_dtype(DType::F64));
        let mut g = SymGraph::new();
        let x = session.placeholder(&mut g, "x", (3,)).unwrap();
        assert_eq!(g.var(x).unwrap().dtype(), DType::F64);
    }
}
