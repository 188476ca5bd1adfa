//! # Tensor Backend
//!
//! This module provides a unified interface for different tensor backends,
//! allowing the extraction pipeline to work in a backend-agnostic manner

//! ## Feature Flags
//!
//! The module uses feature flags to conditionally compile support for different backends:
//!
//! - `candle`: Enables support for the Candle tensor library
//! - `burn`: Enables support for the Burn tensor library
//!
//! ## Usage
//!
//! Collaborators and callers work with tensors in a backend-agnostic way by:
//!
//! 1. Importing the traits ([`Backend`], [`Unsqueezable`], [`ScoreTensor`], [`TokenIds`])
//! 2. Writing code against these trait interfaces
//! 3. Enabling the appropriate feature flag for their desired backend
//!
//! ## Ranks
//!
//! Score tensors are `(batch, seq, vocab)`. Their per-step slices, confidences
//! and token ids are all rank 2. Backends with a single dynamic-rank tensor type
//! (candle) use that type for every role; backends with const-generic ranks
//! (burn) map each role to its own type.

mod core_trait;

#[cfg_attr(docsrs, doc(cfg(feature = "candle")))]
#[cfg(feature = "candle")]
/// Candle tensor backend implementation.
///
/// This module is only available when the `candle` feature flag is enabled.
/// A single `candle_core::Tensor` fills every tensor role.
pub mod candle;

#[cfg_attr(docsrs, doc(cfg(feature = "burn")))]
#[cfg(feature = "burn")]
/// Burn tensor backend implementation.
///
/// This module is only available when the `burn` feature flag is enabled.
/// Scores are `Tensor<B, 3>`, steps and confidences `Tensor<B, 2>`, token ids
/// `Tensor<B, 2, Int>`.
pub mod burn;


// Re-export the core traits for convenient imports
pub use core_trait::*;


#[cfg(test)]
/// Mock tensor implementation.
///
/// Operates on simple dense vector tensors
pub(crate) mod mock_tensor;
