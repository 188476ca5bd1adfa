use super::{Backend, HostData, HostTensor, ScoreTensor, TokenIds, Unsqueezable};
use crate::error::{Error, Result};
use candle_core::{D, DType, Device, Tensor};

impl Backend for Tensor {
    type Device = Device;

    fn shape(&self) -> Vec<usize> {
        self.dims().to_vec()
    }

    fn device(&self) -> Self::Device {
        Tensor::device(self).clone()
    }

    fn cat(tensors: &[Self], dim: usize) -> Result<Self> {
        if tensors.is_empty() {
            return Err(Error::Tensor("cannot concatenate an empty tensor list".to_string()));
        }
        Ok(Tensor::cat(tensors, dim)?)
    }

    fn to_host(&self) -> Result<HostTensor> {
        let flat = self.flatten_all()?;
        let data = if self.dtype().is_float() {
            HostData::F32(flat.to_dtype(DType::F32)?.to_vec1::<f32>()?)
        } else {
            HostData::I64(flat.to_dtype(DType::I64)?.to_vec1::<i64>()?)
        };
        Ok(HostTensor { shape: self.dims().to_vec(), data })
    }
}

impl Unsqueezable for Tensor {
    type Unsqueezed = Tensor;

    fn unsqueeze(&self, dim: usize) -> Result<Self::Unsqueezed> {
        Ok(Tensor::unsqueeze(self, dim)?)
    }
}

impl TokenIds for Tensor {
    fn from_ids(ids: &[u32], rows: usize, cols: usize, device: &Self::Device) -> Result<Self> {
        Ok(Tensor::from_slice(ids, (rows, cols), device)?)
    }
}

impl ScoreTensor for Tensor {
    type Step = Tensor;
    type Confidence = Tensor;
    type Indices = Tensor;

    fn certain_rows_like(&self, len: usize, token_id: u32) -> Result<Self> {
        let (batch, _, vocab) = self.dims3()?;
        let token = token_id as usize;
        if token >= vocab {
            return Err(Error::Configuration(format!(
                "token id {token_id} is outside the vocabulary of size {vocab}"
            )));
        }
        let mut row = vec![f32::NEG_INFINITY; vocab];
        row[token] = f32::INFINITY;
        let rows = Tensor::from_vec(row, (1, 1, vocab), Tensor::device(self))?
            .to_dtype(self.dtype())?
            .repeat((batch, len, 1))?;
        Ok(rows)
    }

    fn top1(&self) -> Result<(Self::Confidence, Self::Indices)> {
        let logits = self
            .to_dtype(DType::F32)?
            .clamp(f32::MIN, f32::MAX)?;
        let max = logits.max_keepdim(D::Minus1)?;
        let exp = logits.broadcast_sub(&max)?.exp()?;
        let probs = exp.broadcast_div(&exp.sum_keepdim(D::Minus1)?)?;
        let confidence = probs.max(D::Minus1)?;
        let prediction = probs.argmax(D::Minus1)?;
        Ok((confidence, prediction))
    }
}
