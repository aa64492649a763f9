//! Tensor type with gradient tracking

use super::BackwardOp;
use crate::error::{Error, Result};
use ndarray::{Array1, ArrayD, IxDyn};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared gradient slot, written by backward ops of downstream tensors
pub type GradCell = Rc<RefCell<Option<ArrayD<f32>>>>;

/// N-dimensional tensor with automatic differentiation support
#[derive(Clone)]
pub struct Tensor {
    data: ArrayD<f32>,
    grad: GradCell,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a new tensor with data
    pub fn new(data: ArrayD<f32>, requires_grad: bool) -> Self {
        Self {
            data,
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a 1-D tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data).into_dyn(), requires_grad)
    }

    /// Create a tensor of the given shape from row-major data
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>, requires_grad: bool) -> Result<Self> {
        let len = data.len();
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| Error::ShapeMismatch {
            expected: shape.iter().copied().map(Some).collect(),
            got: vec![len],
        })?;
        Ok(Self::new(array, requires_grad))
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)), requires_grad)
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::ones(IxDyn(shape)), requires_grad)
    }

    /// Create a tensor filled with a constant
    pub fn full(shape: &[usize], value: f32, requires_grad: bool) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(shape), value), requires_grad)
    }

    /// Get reference to data
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Get mutable reference to data
    pub fn data_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.data
    }

    /// Shape of the underlying array
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Get gradient (if computed)
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.grad.borrow().clone()
    }

    /// Set gradient
    pub fn set_grad(&self, grad: ArrayD<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Accumulate gradient (for when tensor is used multiple times)
    pub fn accumulate_grad(&self, grad: ArrayD<f32>) {
        let mut grad_ref = self.grad.borrow_mut();
        if let Some(existing) = grad_ref.as_mut() {
            *existing += &grad;
        } else {
            *grad_ref = Some(grad);
        }
    }

    /// Zero out gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Check if requires gradient
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Add `grad` to this tensor's gradient if it tracks one
    pub fn push_grad(&self, grad: ArrayD<f32>) {
        if self.requires_grad {
            self.accumulate_grad(grad);
        }
    }

    /// Identity of the gradient slot, shared by clones of this tensor
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.grad) as usize
    }

    /// Get reference to gradient cell (for backward operations)
    pub fn grad_cell(&self) -> GradCell {
        self.grad.clone()
    }

    /// Set backward operation
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Get backward operation
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.data.shape())
            .field("data", &self.data)
            .field("grad", &self.grad.borrow())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}
