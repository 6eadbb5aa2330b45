// Operator configurations
//
// One submodule per operator family. Each configuration type implements
// `OpDef` and offers an eager submission (`eager() -> OpDescriptor`) and a
// graph submission (`graph(&mut SymGraph) -> VarId`).

pub mod softmax;

pub use softmax::{Softmax, SoftmaxBp};
