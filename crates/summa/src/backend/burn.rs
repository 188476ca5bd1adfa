//! The burn implementation for backend provision.
//! Since burn tensors are constrained with const generics, each tensor role maps to its own
//! rank: scores are `Tensor<B, 3>`, steps and confidences `Tensor<B, 2>`, token ids
//! `Tensor<B, 2, Int>`.
use super::{Backend, HostData, HostTensor, ScoreTensor, TokenIds, Unsqueezable};
use crate::error::{Error, Result};
use burn::tensor::activation::softmax;
use burn::tensor::backend::Backend as BurnBackend;
use burn::tensor::{BasicOps, Int, Tensor, TensorData};

const VOCAB_DIM: usize = 2;

macro_rules! impl_backend {
    ($d:literal) => {
        impl <B, K> Backend for Tensor<B, $d, K>
        where B: BurnBackend,
        K: BasicOps<B> + 'static {
            type Device = B::Device;

            fn shape(&self) -> Vec<usize> {
                self.dims().to_vec()
            }

            fn device(&self) -> Self::Device {
                Tensor::device(self)
            }

            fn cat(tensors: &[Self], dim: usize) -> Result<Self> {
                if tensors.is_empty() {
                    return Err(Error::Tensor("cannot concatenate an empty tensor list".to_string()));
                }
                let owned: Vec<_> = tensors.to_vec();
                Ok(Tensor::cat(owned, dim))
            }

            fn to_host(&self) -> Result<HostTensor> {
                let shape = self.dims().to_vec();
                let data = self.clone().into_data();
                let data = if data.dtype.is_float() {
                    HostData::F32(data.convert::<f32>().to_vec::<f32>().map_err(data_error)?)
                } else {
                    HostData::I64(data.convert::<i64>().to_vec::<i64>().map_err(data_error)?)
                };
                Ok(HostTensor { shape, data })
            }
        }
    }
}

impl_backend!(2);
impl_backend!(3);

fn data_error<E: std::fmt::Debug>(err: E) -> Error {
    Error::Tensor(format!("{err:?}"))
}

impl <B> Unsqueezable for Tensor<B, 2>
where B: BurnBackend {
    type Unsqueezed = Tensor<B, 3>;

    fn unsqueeze(&self, dim: usize) -> Result<Self::Unsqueezed> {
        Ok(self.clone().unsqueeze_dim::<3>(dim))
    }
}

impl <B> TokenIds for Tensor<B, 2, Int>
where B: BurnBackend {
    fn from_ids(ids: &[u32], rows: usize, cols: usize, device: &Self::Device) -> Result<Self> {
        if ids.len() != rows * cols {
            return Err(Error::InvariantViolation(format!(
                "{} ids cannot fill a ({rows}, {cols}) tensor", ids.len()
            )));
        }
        let ids: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        Ok(Tensor::<B, 2, Int>::from_data(TensorData::new(ids, [rows, cols]), device))
    }
}

impl <B> ScoreTensor for Tensor<B, 3>
where B: BurnBackend {
    type Step = Tensor<B, 2>;
    type Confidence = Tensor<B, 2>;
    type Indices = Tensor<B, 2, Int>;

    fn certain_rows_like(&self, len: usize, token_id: u32) -> Result<Self> {
        let [batch, _, vocab] = self.dims();
        let token = token_id as usize;
        if token >= vocab {
            return Err(Error::Configuration(format!(
                "token id {token_id} is outside the vocabulary of size {vocab}"
            )));
        }
        let device = Tensor::device(self);
        let rows = Tensor::<B, 3>::full([batch, len, vocab], f32::NEG_INFINITY, &device);
        let certain = Tensor::<B, 3>::full([batch, len, 1], f32::INFINITY, &device);
        Ok(rows.slice_assign([0..batch, 0..len, token..token + 1], certain))
    }

    fn top1(&self) -> Result<(Self::Confidence, Self::Indices)> {
        let logits = self.clone().clamp(f32::MIN, f32::MAX);
        let probs = softmax(logits, VOCAB_DIM);
        let (confidence, prediction) = probs.max_dim_with_indices(VOCAB_DIM);
        Ok((confidence.squeeze::<2>(VOCAB_DIM), prediction.squeeze::<2>(VOCAB_DIM)))
    }
}
