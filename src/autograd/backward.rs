//! Backward operation trait

use super::Tensor;

/// A recorded node of the gradient tape.
///
/// `backward` reads the gradient accumulated on the node's output and
/// pushes the input gradients. It must not recurse: [`super::backward`]
/// runs every node once, after all of its consumers.
pub trait BackwardOp {
    /// Push the output gradient into the inputs
    fn backward(&self);

    /// Inputs this node feeds gradients to
    fn inputs(&self) -> Vec<Tensor>;
}
