//! Straight-Through Estimator (STE)
//!
//! `pass_through(x, f)` evaluates `f(x)` on the forward pass but records an
//! identity backward rule, so a rounding step with zero (or undefined)
//! derivative still lets gradients reach `x`.

use crate::autograd::{record, BackwardOp, GradCell, Tensor};
use ndarray::ArrayD;
use std::rc::Rc;

/// Forward `f(x)`, backward `∂L/∂x = ∂L/∂y`
pub fn pass_through<F>(x: &Tensor, f: F) -> Tensor
where
    F: FnOnce(&ArrayD<f32>) -> ArrayD<f32>,
{
    let data = f(x.data());
    debug_assert_eq!(data.shape(), x.shape(), "pass_through must preserve shape");

    record(data, x.requires_grad(), |out| {
        Rc::new(PassThroughBackward {
            input: x.clone(),
            out,
        })
    })
}

struct PassThroughBackward {
    input: Tensor,
    out: GradCell,
}

impl BackwardOp for PassThroughBackward {
    fn backward(&self) {
        if let Some(grad) = self.out.borrow().as_ref() {
            self.input.push_grad(grad.clone());
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }
}

/// Detached copy: same values, no gradient, no tape
pub fn stop_gradient(x: &Tensor) -> Tensor {
    Tensor::new(x.data().clone(), false)
}
