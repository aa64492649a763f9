//! Tape-based autograd engine
//!
//! Provides automatic differentiation over `ndarray::ArrayD<f32>` tensors.
//! Custom gradient rules (such as the straight-through estimator in
//! [`crate::quant::pass_through`]) plug in by implementing [`BackwardOp`].

mod backward;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use ops::*;
pub use tensor::{GradCell, Tensor};

use std::collections::HashSet;
use std::rc::Rc;

/// Perform backward pass on a tensor
///
/// Seeds `tensor` with `grad_output` (ones by default) and runs every
/// recorded op reachable from it in reverse topological order, so a tensor
/// consumed several times is complete before it propagates further.
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::ArrayD<f32>>) {
    let seed = grad_output.unwrap_or_else(|| ndarray::ArrayD::ones(tensor.data().raw_dim()));
    tensor.set_grad(seed);

    for op in tape_order(tensor) {
        op.backward();
    }
}

/// Ops reachable from `root`, consumers before producers
fn tape_order(root: &Tensor) -> Vec<Rc<dyn BackwardOp>> {
    let mut visited = HashSet::new();
    let mut finished = Vec::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        let Some(op) = node.backward_op() else {
            continue;
        };
        if expanded {
            finished.push(op);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        stack.push((node, true));
        stack.extend(op.inputs().into_iter().map(|input| (input, false)));
    }

    finished.reverse();
    finished
}

/// Attach a tape node to a freshly computed op output
///
/// `node` receives the output's gradient cell; it is only built when the
/// output requires a gradient.
pub(crate) fn record<F>(data: ndarray::ArrayD<f32>, requires_grad: bool, node: F) -> Tensor
where
    F: FnOnce(GradCell) -> Rc<dyn BackwardOp>,
{
    let mut result = Tensor::new(data, requires_grad);
    if requires_grad {
        let op = node(result.grad_cell());
        result.set_backward_op(op);
    }
    result
}
