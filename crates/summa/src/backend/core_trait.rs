use std::fmt::Debug;
use crate::error::Result;


/// Host-side copy of a tensor, the unit handed to persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTensor {
    pub shape: Vec<usize>,
    pub data: HostData,
}

/// Element storage of a [`HostTensor`]. Floating tensors are exported as `f32`,
/// integer tensors (token ids) as `i64`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostData {
    F32(Vec<f32>),
    I64(Vec<i64>),
}

impl HostTensor {
    /// Number of elements implied by the shape.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}


/// The backend trait that must be fulfilled by any tensor type the pipeline moves around
pub trait Backend: Debug + Clone + Send + Sync + 'static {
    /// Device handle tensors of this backend live on
    type Device: Debug + Clone;

    /// Return the shape of this tensor
    fn shape(&self) -> Vec<usize>;

    /// Return the device this tensor lives on
    fn device(&self) -> Self::Device;

    /// Concatenate several tensors to each other along dimension `dim`, in the order supplied
    fn cat(tensors: &[Self], dim: usize) -> Result<Self>;

    /// Copy the tensor to host memory
    fn to_host(&self) -> Result<HostTensor>;
}


/// The trait fulfilled by tensors that can gain a dimension of size `1`
pub trait Unsqueezable: Backend {
    /// the type we unsqueeze to
    type Unsqueezed: Backend<Device = Self::Device>;

    /// Unsqueeze the tensor along dimension `dim` with size 1
    fn unsqueeze(&self, dim: usize) -> Result<Self::Unsqueezed>;
}


/// Integer tensors of token ids, shape `(batch, seq)`
pub trait TokenIds: Backend {
    /// Build a `(rows, cols)` tensor from row-major ids
    fn from_ids(ids: &[u32], rows: usize, cols: usize, device: &Self::Device) -> Result<Self>;
}


/// Score tensors of shape `(batch, seq, vocab)`.
///
/// This is the rank the generation collaborator's per-step scores are stacked
/// into, the rank alignment operates on, and the rank the confidence extractor
/// reduces from.
pub trait ScoreTensor: Backend {
    /// A single generation step, shape `(batch, vocab)`
    type Step: Unsqueezable<Unsqueezed = Self, Device = Self::Device>;

    /// Per-position top-1 probabilities, shape `(batch, seq)`
    type Confidence: Backend<Device = Self::Device>;

    /// Per-position top-1 token ids, shape `(batch, seq)`
    type Indices: TokenIds<Device = Self::Device>;

    /// Build `len` rows per sequence in which every vocabulary position holds
    /// `-inf` except `token_id`, which holds `+inf`.
    ///
    /// Batch size, vocabulary size, dtype and device are taken from `self`.
    fn certain_rows_like(&self, len: usize, token_id: u32) -> Result<Self>;

    /// Softmax over the vocabulary dimension, reduced to the maximum
    /// probability and its index for every `(batch, seq)` position.
    ///
    /// Scores are promoted to `f32` and clamped to the finite range first, so
    /// a row holding a single `+inf` resolves to probability `1.0` at that
    /// position rather than `NaN`.
    fn top1(&self) -> Result<(Self::Confidence, Self::Indices)>;
}
