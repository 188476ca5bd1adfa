use crate::backend::{Backend, HostData, HostTensor, ScoreTensor, TokenIds, Unsqueezable};
use crate::error::{Error, Result};

// A simple dense row-major tensor for testing
#[derive(Clone, Debug, PartialEq)]
pub struct MockTensor {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<f32>,
}

// Integer counterpart used for token ids
#[derive(Clone, Debug, PartialEq)]
pub struct MockIds {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MockDevice;

impl MockTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        assert_eq!(shape.iter().product::<usize>(), data.len(), "shape does not match data");
        Self { shape, data }
    }

    /// `(batch, seq, vocab)` scores where every row is built by `row(b, s)`
    pub fn scores(batch: usize, seq: usize, vocab: usize, row: impl Fn(usize, usize) -> Vec<f32>) -> Self {
        let mut data = Vec::with_capacity(batch * seq * vocab);
        for b in 0..batch {
            for s in 0..seq {
                let r = row(b, s);
                assert_eq!(r.len(), vocab);
                data.extend(r);
            }
        }
        Self::new(vec![batch, seq, vocab], data)
    }

    pub fn row(&self, b: usize, s: usize) -> &[f32] {
        let vocab = self.shape[2];
        let start = (b * self.shape[1] + s) * vocab;
        &self.data[start..start + vocab]
    }
}

impl MockIds {
    pub fn at(&self, r: usize, c: usize) -> i64 {
        self.data[r * self.shape[1] + c]
    }
}

// Concatenate row-major buffers along `dim`
fn cat_dense<T: Copy>(parts: &[(&[usize], &[T])], dim: usize) -> Result<(Vec<usize>, Vec<T>)> {
    let Some(&(first, _)) = parts.first() else {
        return Err(Error::Tensor("cannot concatenate an empty tensor list".to_string()));
    };
    for (shape, _) in parts {
        let same_rank = shape.len() == first.len();
        let same_other = same_rank && shape.iter().zip(first.iter()).enumerate()
            .all(|(i, (a, b))| i == dim || a == b);
        if !same_other {
            return Err(Error::Tensor(format!("shape mismatch in cat: {:?} vs {:?}", shape, first)));
        }
    }
    let outer: usize = first[..dim].iter().product();
    let inner: usize = first[dim + 1..].iter().product();
    let mut shape = first.to_vec();
    shape[dim] = parts.iter().map(|(s, _)| s[dim]).sum();

    let mut data = Vec::with_capacity(shape.iter().product());
    for o in 0..outer {
        for (s, d) in parts {
            let block = s[dim] * inner;
            data.extend_from_slice(&d[o * block..(o + 1) * block]);
        }
    }
    Ok((shape, data))
}

impl Backend for MockTensor {
    type Device = MockDevice;

    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn device(&self) -> Self::Device {
        MockDevice
    }

    fn cat(tensors: &[Self], dim: usize) -> Result<Self> {
        let parts: Vec<_> = tensors.iter().map(|t| (t.shape.as_slice(), t.data.as_slice())).collect();
        let (shape, data) = cat_dense(&parts, dim)?;
        Ok(MockTensor { shape, data })
    }

    fn to_host(&self) -> Result<HostTensor> {
        Ok(HostTensor { shape: self.shape.clone(), data: HostData::F32(self.data.clone()) })
    }
}

impl Backend for MockIds {
    type Device = MockDevice;

    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn device(&self) -> Self::Device {
        MockDevice
    }

    fn cat(tensors: &[Self], dim: usize) -> Result<Self> {
        let parts: Vec<_> = tensors.iter().map(|t| (t.shape.as_slice(), t.data.as_slice())).collect();
        let (shape, data) = cat_dense(&parts, dim)?;
        Ok(MockIds { shape, data })
    }

    fn to_host(&self) -> Result<HostTensor> {
        Ok(HostTensor { shape: self.shape.clone(), data: HostData::I64(self.data.clone()) })
    }
}

// Implement Unsqueezable for MockTensor
impl Unsqueezable for MockTensor {
    type Unsqueezed = MockTensor;

    fn unsqueeze(&self, dim: usize) -> Result<Self::Unsqueezed> {
        let mut shape = self.shape.clone();
        shape.insert(dim, 1);
        Ok(MockTensor { shape, data: self.data.clone() })
    }
}

impl TokenIds for MockIds {
    fn from_ids(ids: &[u32], rows: usize, cols: usize, _device: &Self::Device) -> Result<Self> {
        if ids.len() != rows * cols {
            return Err(Error::InvariantViolation(format!(
                "{} ids cannot fill a ({rows}, {cols}) tensor", ids.len()
            )));
        }
        Ok(MockIds { shape: vec![rows, cols], data: ids.iter().map(|&i| i as i64).collect() })
    }
}

impl ScoreTensor for MockTensor {
    type Step = MockTensor;
    type Confidence = MockTensor;
    type Indices = MockIds;

    fn certain_rows_like(&self, len: usize, token_id: u32) -> Result<Self> {
        let (batch, vocab) = (self.shape[0], self.shape[2]);
        let token = token_id as usize;
        if token >= vocab {
            return Err(Error::Configuration(format!(
                "token id {token_id} is outside the vocabulary of size {vocab}"
            )));
        }
        Ok(MockTensor::scores(batch, len, vocab, |_, _| {
            let mut row = vec![f32::NEG_INFINITY; vocab];
            row[token] = f32::INFINITY;
            row
        }))
    }

    fn top1(&self) -> Result<(Self::Confidence, Self::Indices)> {
        let (batch, seq) = (self.shape[0], self.shape[1]);
        let mut conf = Vec::with_capacity(batch * seq);
        let mut pred = Vec::with_capacity(batch * seq);
        for b in 0..batch {
            for s in 0..seq {
                let row: Vec<f32> = self.row(b, s).iter().map(|v| v.clamp(f32::MIN, f32::MAX)).collect();
                let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let exp: Vec<f32> = row.iter().map(|v| (v - max).exp()).collect();
                let sum: f32 = exp.iter().sum();
                // first maximum wins ties
                let (idx, p) = exp.iter().enumerate()
                    .fold((0, f32::NEG_INFINITY), |(bi, bp), (i, &e)| {
                        let p = e / sum;
                        if p > bp { (i, p) } else { (bi, bp) }
                    });
                conf.push(p);
                pred.push(idx as i64);
            }
        }
        Ok((
            MockTensor { shape: vec![batch, seq], data: conf },
            MockIds { shape: vec![batch, seq], data: pred },
        ))
    }
}
