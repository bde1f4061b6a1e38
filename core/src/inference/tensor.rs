//! Tensor descriptors and the host buffers bound to them.

use ndarray::{ArrayViewD, ArrayViewMutD, IxDyn};

use crate::error::{DpuError, Result};

/// Shape and element width of a runner input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDesc {
    pub name: String,
    /// Dimensions, NHWC for image inputs.
    pub shape: Vec<usize>,
    /// Bits per element.
    pub bit_width: u32,
}

impl TensorDesc {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, bit_width: u32) -> Self {
        Self {
            name: name.into(),
            shape,
            bit_width,
        }
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Image height, the second dimension.
    pub fn height(&self) -> Result<usize> {
        self.dim(1, "height")
    }

    /// Image width, the third dimension.
    pub fn width(&self) -> Result<usize> {
        self.dim(2, "width")
    }

    fn dim(&self, axis: usize, what: &str) -> Result<usize> {
        self.shape.get(axis).copied().ok_or_else(|| {
            DpuError::tensor(format!(
                "tensor `{}` has shape {:?}, no {} at axis {}",
                self.name, self.shape, what, axis
            ))
        })
    }
}

/// Owned, fixed-size storage for one 8-bit tensor.
///
/// Allocated zeroed from a descriptor and released on drop. The heap block
/// never moves, so moving the buffer keeps pointers handed to a runner valid.
#[derive(Debug, Clone)]
pub struct TensorBuffer {
    desc: TensorDesc,
    data: Box<[i8]>,
}

impl TensorBuffer {
    /// Allocate a zeroed buffer for `desc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor is not 8 bits wide.
    pub fn for_tensor(desc: &TensorDesc) -> Result<Self> {
        if desc.bit_width != 8 {
            return Err(DpuError::tensor(format!(
                "tensor `{}` is {}-bit, only 8-bit tensors are supported",
                desc.name, desc.bit_width
            )));
        }
        Ok(Self {
            desc: desc.clone(),
            data: vec![0i8; desc.element_count()].into_boxed_slice(),
        })
    }

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the storage in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<i8>()
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [i8] {
        &mut self.data
    }

    /// View the storage in the descriptor's shape.
    pub fn view(&self) -> Result<ArrayViewD<'_, i8>> {
        ArrayViewD::from_shape(IxDyn(&self.desc.shape), &self.data)
            .map_err(|e| DpuError::tensor(format!("Array shape error: {}", e)))
    }

    /// Mutable view in the descriptor's shape.
    pub fn view_mut(&mut self) -> Result<ArrayViewMutD<'_, i8>> {
        ArrayViewMutD::from_shape(IxDyn(&self.desc.shape), &mut self.data)
            .map_err(|e| DpuError::tensor(format!("Array shape error: {}", e)))
    }
}
