//! Tensor constants and the backend-agnostic operations the pipeline is built from.

pub mod constant;
pub(crate) mod operations;
