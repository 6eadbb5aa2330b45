use std::collections::{HashMap, HashSet};

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::executor::OpExecutor;
use crate::op::{OpDescriptor, OpKind};
use crate::shape::Shape;
use crate::tensor::Tensor;

// SymGraph — Symbolic computation graph for graph-mode operators
//
// Graph mode records operators as nodes instead of running them. A graph
// holds two kinds of entities:
//
//   Variables — placeholders (fed at exec time), constants (bound tensors),
//               and op outputs (produced by a node)
//   Nodes     — one operator invocation: kind, ordered input variables,
//               output variables, integer arguments
//
// Example: y = softmax(x); dx = softmax_bp(x, dy, y)
//
//   vars:  x (placeholder), dy (placeholder), softmax (out of node 0),
//          softmax_bp (out of node 1)
//   nodes: 0 softmax    [x]            iargs []
//          1 softmax_bp [x, dy, softmax] iargs []
//
// INVARIANTS:
//
//   - Nodes only reference variables that already exist, so insertion order
//     is a valid execution order.
//   - Output dtypes and shapes are inferred when a node is inserted; a node
//     whose operands fail the op's datatype or shape rule (axis out of range,
//     mismatched operand shapes) is never added.
//   - Node and variable names share one namespace and are unique. Auto-named
//     nodes take the op name, then `name_1`, `name_2`, ...

/// Handle to a variable in a [`SymGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

/// Handle to a node in a [`SymGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Where a variable's value comes from.
#[derive(Debug, Clone)]
pub enum VarKind {
    /// Supplied by the caller at execution time.
    Placeholder,
    /// Bound to a tensor when the graph is built.
    Constant(Tensor),
    /// Output `index` of `node`.
    OpOutput { node: NodeId, index: usize },
}

/// A symbolic value: name, dtype, shape, and origin.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    dtype: DType,
    shape: Shape,
    kind: VarKind,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> &VarKind {
        &self.kind
    }
}

/// One recorded operator invocation.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    kind: OpKind,
    inputs: Vec<VarId>,
    outputs: Vec<VarId>,
    iargs: Vec<i64>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn inputs(&self) -> &[VarId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[VarId] {
        &self.outputs
    }

    pub fn iargs(&self) -> &[i64] {
        &self.iargs
    }
}

/// A symbolic graph of operator nodes over named variables.
#[derive(Debug, Clone, Default)]
pub struct SymGraph {
    vars: Vec<Variable>,
    nodes: Vec<Node>,
    names: HashSet<String>,
}

impl SymGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // Variables

    /// Declare an input to be fed at execution time.
    pub fn placeholder(
        &mut self,
        name: impl Into<String>,
        dtype: DType,
        shape: impl Into<Shape>,
    ) -> Result<VarId> {
        let name = self.claim_name(name.into())?;
        Ok(self.push_var(name, dtype, shape.into(), VarKind::Placeholder))
    }

    /// Bind a tensor into the graph.
    pub fn constant(&mut self, name: impl Into<String>, value: Tensor) -> Result<VarId> {
        let name = self.claim_name(name.into())?;
        let dtype = value.dtype();
        let shape = value.shape().clone();
        Ok(self.push_var(name, dtype, shape, VarKind::Constant(value)))
    }

    pub fn var(&self, id: VarId) -> Result<&Variable> {
        self.vars
            .get(id.0)
            .ok_or_else(|| Error::invalid_argument(format!("unknown variable {:?}", id)))
    }

    pub fn var_by_name(&self, name: &str) -> Option<VarId> {
        self.vars.iter().position(|v| v.name == name).map(VarId)
    }

    pub fn vars(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.vars.iter().enumerate().map(|(i, v)| (VarId(i), v))
    }

    // Nodes

    /// Record an operator invocation and create its output variables.
    ///
    /// The op's datatype and shape rules run here, so invalid operand
    /// combinations are rejected before the graph is ever executed.
    pub fn add_op(&mut self, kind: OpKind, inputs: &[VarId], iargs: Vec<i64>) -> Result<NodeId> {
        let mut dtypes = Vec::with_capacity(inputs.len());
        let mut shapes = Vec::with_capacity(inputs.len());
        for &id in inputs {
            let v = self.var(id)?;
            dtypes.push(v.dtype);
            shapes.push(v.shape.clone());
        }
        let out_dtypes = kind.calculate_output_dtypes(&dtypes)?;
        let out_shapes = kind.calculate_output_shapes(&shapes, &iargs)?;

        let node_id = NodeId(self.nodes.len());
        let node_name = self.unique_name(kind.name());
        let mut outputs = Vec::with_capacity(out_dtypes.len());
        for (index, (dtype, shape)) in out_dtypes.into_iter().zip(out_shapes).enumerate() {
            let var_name = if index == 0 {
                node_name.clone()
            } else {
                self.unique_name(&format!("{node_name}:{index}"))
            };
            self.names.insert(var_name.clone());
            outputs.push(self.push_var(
                var_name,
                dtype,
                shape,
                VarKind::OpOutput {
                    node: node_id,
                    index,
                },
            ));
        }
        self.names.insert(node_name.clone());

        log::debug!(
            "graph: added node {} ({}) inputs={:?} iargs={:?}",
            node_name,
            kind,
            inputs,
            iargs
        );
        self.nodes.push(Node {
            name: node_name,
            kind,
            inputs: inputs.to_vec(),
            outputs,
            iargs,
        });
        Ok(node_id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::invalid_argument(format!("unknown node {:?}", id)))
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The node that produces `var`, if it is an op output.
    pub fn producer(&self, var: VarId) -> Result<Option<NodeId>> {
        Ok(match &self.var(var)?.kind {
            VarKind::OpOutput { node, .. } => Some(*node),
            _ => None,
        })
    }

    /// The only output of a single-output node.
    pub fn single_output(&self, node: NodeId) -> Result<VarId> {
        let n = self.node(node)?;
        match n.outputs.as_slice() {
            [out] => Ok(*out),
            outs => Err(Error::invalid_argument(format!(
                "node {} has {} outputs, expected 1",
                n.name,
                outs.len()
            ))),
        }
    }

    /// Add gradient nodes for `node`, given gradients of its outputs.
    ///
    /// Dispatches on the node's kind; kinds without a derivative fail with
    /// `UnsupportedOperation` and leave the graph unchanged.
    pub fn differentiate_node(&mut self, node: NodeId, grads: &[VarId]) -> Result<Vec<VarId>> {
        let kind = self.node(node)?.kind;
        kind.differentiate(self, node, grads)
    }

    // Execution

    /// Evaluate the graph and return the requested variables by name.
    ///
    /// Only the nodes the requested outputs depend on run, in insertion
    /// order, through `executor`, one eager descriptor per node. Every
    /// placeholder they read must be fed with a tensor of the declared dtype
    /// and shape; other placeholders may be left out.
    pub fn exec<E: OpExecutor + ?Sized>(
        &self,
        executor: &E,
        feeds: &HashMap<String, Tensor>,
        outputs: &[&str],
    ) -> Result<HashMap<String, Tensor>> {
        let mut wanted = Vec::with_capacity(outputs.len());
        for &name in outputs {
            let id = self.var_by_name(name).ok_or_else(|| {
                Error::invalid_argument(format!("unknown output variable {name:?}"))
            })?;
            wanted.push((name, id));
        }
        let needed = self.ancestors(wanted.iter().map(|&(_, id)| id));

        let mut values: Vec<Option<Tensor>> = vec![None; self.vars.len()];
        for (i, var) in self.vars.iter().enumerate() {
            if !needed.vars[i] {
                continue;
            }
            match &var.kind {
                VarKind::Placeholder => {
                    let fed = feeds.get(&var.name).ok_or_else(|| {
                        Error::invalid_argument(format!("placeholder {:?} was not fed", var.name))
                    })?;
                    check_fed(var, fed)?;
                    values[i] = Some(fed.clone());
                }
                VarKind::Constant(t) => values[i] = Some(t.clone()),
                VarKind::OpOutput { .. } => {}
            }
        }

        for (node, _) in self.nodes.iter().zip(&needed.nodes).filter(|(_, run)| **run) {
            let inputs = node
                .inputs
                .iter()
                .map(|id| {
                    values[id.0].clone().ok_or_else(|| {
                        Error::msg(format!("node {} read an unset variable", node.name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let desc = OpDescriptor::new(node.kind, inputs, Vec::new(), node.iargs.clone());
            let results = executor.exec(&desc)?;
            if results.len() != node.outputs.len() {
                return Err(Error::msg(format!(
                    "executor returned {} outputs for node {}, expected {}",
                    results.len(),
                    node.name,
                    node.outputs.len()
                )));
            }
            for (out, t) in node.outputs.iter().zip(results) {
                values[out.0] = Some(t);
            }
        }

        let mut result = HashMap::with_capacity(wanted.len());
        for (name, id) in wanted {
            if let Some(t) = values[id.0].clone() {
                result.insert(name.to_string(), t);
            }
        }
        Ok(result)
    }

    /// Mark every variable and node that `targets` transitively depend on.
    ///
    /// Nodes only read earlier variables, so one reverse sweep suffices.
    fn ancestors(&self, targets: impl IntoIterator<Item = VarId>) -> Needed {
        let mut needed = Needed {
            vars: vec![false; self.vars.len()],
            nodes: vec![false; self.nodes.len()],
        };
        for id in targets {
            needed.vars[id.0] = true;
        }
        for (i, node) in self.nodes.iter().enumerate().rev() {
            if node.outputs.iter().any(|out| needed.vars[out.0]) {
                needed.nodes[i] = true;
                for input in &node.inputs {
                    needed.vars[input.0] = true;
                }
            }
        }
        needed
    }

    // Internals

    fn push_var(&mut self, name: String, dtype: DType, shape: Shape, kind: VarKind) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(Variable {
            name,
            dtype,
            shape,
            kind,
        });
        id
    }

    fn claim_name(&mut self, name: String) -> Result<String> {
        if !self.names.insert(name.clone()) {
            return Err(Error::invalid_argument(format!(
                "name {name:?} is already used in this graph"
            )));
        }
        Ok(name)
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.names.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|n| !self.names.contains(n))
            .unwrap_or_else(|| base.to_string())
    }
}

struct Needed {
    vars: Vec<bool>,
    nodes: Vec<bool>,
}

fn check_fed(var: &Variable, fed: &Tensor) -> Result<()> {
    if fed.dtype() != var.dtype {
        return Err(Error::DTypeMismatch {
            expected: var.dtype,
            got: fed.dtype(),
        });
    }
    if fed.shape() != &var.shape {
        return Err(Error::ShapeMismatch {
            expected: var.shape.clone(),
            got: fed.shape().clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Softmax, SoftmaxBp};

    #[test]
    fn test_node_names_are_unique() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F32, (2, 3)).unwrap();
        let a = Softmax::new(x).graph(&mut g).unwrap();
        let b = Softmax::new(a).graph(&mut g).unwrap();
        assert_eq!(g.var(a).unwrap().name(), "softmax");
        assert_eq!(g.var(b).unwrap().name(), "softmax_1");
        assert_eq!(g.num_nodes(), 2);
    }

    #[test]
    fn test_duplicate_placeholder_rejected() {
        let mut g = SymGraph::new();
        g.placeholder("x", DType::F32, (2,)).unwrap();
        assert!(matches!(
            g.placeholder("x", DType::F64, (2,)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_auto_name_avoids_user_names() {
        let mut g = SymGraph::new();
        let x = g.placeholder("softmax", DType::F32, (3,)).unwrap();
        let y = Softmax::new(x).graph(&mut g).unwrap();
        assert_eq!(g.var(y).unwrap().name(), "softmax_1");
    }

    #[test]
    fn test_axis_attached_only_when_given() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F32, (2, 3)).unwrap();
        let dy = g.placeholder("dy", DType::F32, (2, 3)).unwrap();
        let y = g.placeholder("y", DType::F32, (2, 3)).unwrap();

        let plain = SoftmaxBp::new(x, dy, y).graph(&mut g).unwrap();
        let with_axis = SoftmaxBp::new(x, dy, y).with_axis(0).graph(&mut g).unwrap();

        let plain_node = g.producer(plain).unwrap().unwrap();
        let axis_node = g.producer(with_axis).unwrap().unwrap();
        assert!(g.node(plain_node).unwrap().iargs().is_empty());
        assert_eq!(g.node(axis_node).unwrap().iargs(), &[0]);
        assert_eq!(g.node(plain_node).unwrap().inputs(), &[x, dy, y]);
    }

    #[test]
    fn test_dtype_inferred_at_insertion() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F64, (4,)).unwrap();
        let dy = g.placeholder("dy", DType::F64, (4,)).unwrap();
        let y = g.placeholder("y", DType::F32, (4,)).unwrap();
        let dx = SoftmaxBp::new(x, dy, y).graph(&mut g).unwrap();
        assert_eq!(g.var(dx).unwrap().dtype(), DType::F64);

        let bad = g.placeholder("bad", DType::I32, (4,)).unwrap();
        let before = g.num_nodes();
        assert!(SoftmaxBp::new(bad, dy, y).graph(&mut g).is_err());
        assert_eq!(g.num_nodes(), before);
    }

    #[test]
    fn test_shape_rule_runs_at_insertion() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F32, (2, 3)).unwrap();
        let dy = g.placeholder("dy", DType::F32, (7,)).unwrap();
        let y = Softmax::new(x).graph(&mut g).unwrap();
        let before = g.num_nodes();

        let err = SoftmaxBp::new(x, dy, y).graph(&mut g).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        let err = Softmax::new(x).with_axis(9).graph(&mut g).unwrap_err();
        assert!(matches!(err, Error::DimOutOfRange { dim: 9, rank: 2 }));
        assert_eq!(g.num_nodes(), before);
        assert!(g.var_by_name("softmax_1").is_none());
    }

    #[test]
    fn test_ancestors_skip_unrelated_nodes() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F32, (3,)).unwrap();
        let dy = g.placeholder("dy", DType::F32, (3,)).unwrap();
        let y = Softmax::new(x).graph(&mut g).unwrap();
        let dx = SoftmaxBp::new(x, dy, y).graph(&mut g).unwrap();

        let forward = g.ancestors([y]);
        assert_eq!(forward.nodes, vec![true, false]);
        assert!(forward.vars[x.0] && forward.vars[y.0]);
        assert!(!forward.vars[dy.0] && !forward.vars[dx.0]);

        let backward = g.ancestors([dx]);
        assert_eq!(backward.nodes, vec![true, true]);
        assert!(backward.vars[dy.0]);
    }

    #[test]
    fn test_graph_mode_rejects_output() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F32, (4,)).unwrap();
        let err = SoftmaxBp::new(x, x, x).with_output(x).graph(&mut g).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(g.num_nodes(), 0);
    }

    #[test]
    fn test_softmax_gradient_is_softmax_bp() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F32, (2, 3)).unwrap();
        let y = Softmax::new(x).with_axis(1).graph(&mut g).unwrap();
        let dy = g.placeholder("dy", DType::F32, (2, 3)).unwrap();

        let sm_node = g.producer(y).unwrap().unwrap();
        let grads = g.differentiate_node(sm_node, &[dy]).unwrap();
        assert_eq!(grads.len(), 1);

        let bp_node = g.producer(grads[0]).unwrap().unwrap();
        let bp = g.node(bp_node).unwrap();
        assert_eq!(bp.kind(), OpKind::SoftmaxBp);
        assert_eq!(bp.inputs(), &[x, dy, y]);
        assert_eq!(bp.iargs(), &[1]);
    }

    #[test]
    fn test_softmax_bp_not_differentiable() {
        let mut g = SymGraph::new();
        let x = g.placeholder("x", DType::F32, (3,)).unwrap();
        let dx = SoftmaxBp::new(x, x, x).graph(&mut g).unwrap();
        let node = g.producer(dx).unwrap().unwrap();
        let before = g.num_nodes();

        let err = g.differentiate_node(node, &[x]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
        let err = g.differentiate_node(node, &[]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
        assert_eq!(g.num_nodes(), before);
    }
}
