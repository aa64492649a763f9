//! Autograd operations with backward passes

use super::{record, BackwardOp, GradCell, Tensor};
use crate::error::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use std::rc::Rc;

fn check_same_shape(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::shape(a.shape(), b.shape()));
    }
    Ok(())
}

/// Add two tensors of identical shape
///
/// Operands are never broadcast; a shape mismatch is an error.
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    check_same_shape(a, b)?;
    let requires_grad = a.requires_grad() || b.requires_grad();
    Ok(record(a.data() + b.data(), requires_grad, |out| {
        Rc::new(AddBackward {
            lhs: a.clone(),
            rhs: b.clone(),
            out,
        })
    }))
}

struct AddBackward {
    lhs: Tensor,
    rhs: Tensor,
    out: GradCell,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.out.borrow().as_ref() {
            self.lhs.push_grad(grad.clone());
            self.rhs.push_grad(grad.clone());
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.lhs.clone(), self.rhs.clone()]
    }
}

/// Multiply two tensors of identical shape element-wise
pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    check_same_shape(a, b)?;
    let requires_grad = a.requires_grad() || b.requires_grad();
    Ok(record(a.data() * b.data(), requires_grad, |out| {
        Rc::new(MulBackward {
            lhs: a.clone(),
            rhs: b.clone(),
            out,
        })
    }))
}

struct MulBackward {
    lhs: Tensor,
    rhs: Tensor,
    out: GradCell,
}

impl BackwardOp for MulBackward {
    fn backward(&self) {
        if let Some(grad) = self.out.borrow().as_ref() {
            // ∂L/∂lhs = ∂L/∂out * rhs, and symmetrically
            self.lhs.push_grad(grad * self.rhs.data());
            self.rhs.push_grad(grad * self.lhs.data());
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.lhs.clone(), self.rhs.clone()]
    }
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    record(a.data() * factor, a.requires_grad(), |out| {
        Rc::new(ScaleBackward {
            input: a.clone(),
            factor,
            out,
        })
    })
}

struct ScaleBackward {
    input: Tensor,
    factor: f32,
    out: GradCell,
}

impl BackwardOp for ScaleBackward {
    fn backward(&self) {
        if let Some(grad) = self.out.borrow().as_ref() {
            self.input.push_grad(grad * self.factor);
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }
}

/// Multiply by a constant array broadcast to the tensor's shape
///
/// The constant never receives a gradient; it behaves like a
/// stop-gradient operand. Fails when `constant` does not broadcast to `a`.
pub fn mul_const(a: &Tensor, constant: &ArrayD<f32>) -> Result<Tensor> {
    let factor = constant
        .broadcast(a.data().raw_dim())
        .ok_or_else(|| Error::shape(a.shape(), constant.shape()))?
        .to_owned();
    let data = a.data() * &factor;

    Ok(record(data, a.requires_grad(), |out| {
        Rc::new(MulConstBackward {
            input: a.clone(),
            factor,
            out,
        })
    }))
}

struct MulConstBackward {
    input: Tensor,
    factor: ArrayD<f32>,
    out: GradCell,
}

impl BackwardOp for MulConstBackward {
    fn backward(&self) {
        if let Some(grad) = self.out.borrow().as_ref() {
            self.input.push_grad(grad * &self.factor);
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }
}

/// Sum all elements into a one-element tensor
pub fn sum(a: &Tensor) -> Tensor {
    let data = ArrayD::from_elem(IxDyn(&[1]), a.data().sum());
    record(data, a.requires_grad(), |out| {
        Rc::new(SumBackward {
            input: a.clone(),
            out,
        })
    })
}

struct SumBackward {
    input: Tensor,
    out: GradCell,
}

impl BackwardOp for SumBackward {
    fn backward(&self) {
        if let Some(grad) = self.out.borrow().as_ref() {
            let upstream = grad.iter().next().copied().unwrap_or(0.0);
            self.input
                .push_grad(ArrayD::from_elem(self.input.data().raw_dim(), upstream));
        }
    }

    fn inputs(&self) -> Vec<Tensor> {
        vec![self.input.clone()]
    }
}
