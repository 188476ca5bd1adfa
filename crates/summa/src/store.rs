//! Persistence of host tensors as single-tensor safetensors files.

use std::fs;
use std::path::Path;

use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use tracing::debug;

use crate::backend::{HostData, HostTensor};
use crate::error::{Error, Result};

/// File holding the `(N, L)` top-1 probabilities.
pub const CONFIDENCES_FILE: &str = "confidences.pt";
/// File holding the `(N, L)` top-1 token ids.
pub const PREDICTIONS_FILE: &str = "predictions.pt";
/// File holding the `(N, L)` tokenized references.
pub const LABELS_FILE: &str = "labels.pt";

/// Write `tensor` to `path` under the key `name`.
pub fn save_tensor(path: &Path, name: &str, tensor: &HostTensor) -> Result<()> {
    if tensor.numel() != host_len(&tensor.data) {
        return Err(Error::InvariantViolation(format!(
            "tensor `{name}` has shape {:?} but {} elements", tensor.shape, host_len(&tensor.data)
        )));
    }
    let (dtype, bytes) = match &tensor.data {
        HostData::F32(values) => (Dtype::F32, values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>()),
        HostData::I64(values) => (Dtype::I64, values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>()),
    };
    let view = TensorView::new(dtype, tensor.shape.clone(), &bytes)?;
    safetensors::serialize_to_file([(name, view)], &None, path)?;
    debug!(path = %path.display(), shape = ?tensor.shape, "saved tensor");
    Ok(())
}

/// Read the tensor stored under `name` in the file at `path`.
pub fn load_tensor(path: &Path, name: &str) -> Result<HostTensor> {
    let bytes = fs::read(path)?;
    let file = SafeTensors::deserialize(&bytes)?;
    let view = file.tensor(name)?;
    let raw = view.data();
    let data = match view.dtype() {
        Dtype::F32 => HostData::F32(
            raw.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        Dtype::I64 => HostData::I64(
            raw.chunks_exact(8)
                .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
        ),
        other => {
            return Err(Error::InvalidInput(format!(
                "tensor `{name}` in {} has unsupported dtype {other:?}", path.display()
            )));
        }
    };
    Ok(HostTensor { shape: view.shape().to_vec(), data })
}

fn host_len(data: &HostData) -> usize {
    match data {
        HostData::F32(v) => v.len(),
        HostData::I64(v) => v.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_keeps_dtype_and_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREDICTIONS_FILE);
        let tensor = HostTensor { shape: vec![2, 3], data: HostData::I64(vec![0, 1, 2, 3, 4, 5]) };

        save_tensor(&path, "predictions", &tensor).unwrap();
        assert_eq!(load_tensor(&path, "predictions").unwrap(), tensor);
    }

    #[test]
    fn test_save_rejects_shape_data_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let tensor = HostTensor { shape: vec![2, 2], data: HostData::F32(vec![0.5]) };
        let err = save_tensor(&dir.path().join(CONFIDENCES_FILE), "confidences", &tensor).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_load_unknown_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LABELS_FILE);
        let tensor = HostTensor { shape: vec![1], data: HostData::F32(vec![1.0]) };
        save_tensor(&path, "labels", &tensor).unwrap();
        assert!(matches!(load_tensor(&path, "missing"), Err(Error::Persist(_))));
    }
}
