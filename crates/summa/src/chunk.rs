//! Fixed-size, order-preserving chunking of inputs.

use crate::error::{Error, Result};

/// Split `items` into consecutive chunks of `batch_size`.
///
/// Every chunk holds `batch_size` items except possibly the last, which holds
/// the remainder. The returned iterator is lazy and borrows `items`; calling
/// `chunks` again restarts from the beginning.
///
/// # Errors
///
/// [`Error::InvalidArgument`] when `batch_size` is `0`.
pub fn chunks<T>(items: &[T], batch_size: usize) -> Result<std::slice::Chunks<'_, T>> {
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch size must be greater than 0".to_string()));
    }
    Ok(items.chunks(batch_size))
}

/// Number of chunks [`chunks`] yields for `len` items.
pub fn chunk_count(len: usize, batch_size: usize) -> Result<usize> {
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch size must be greater than 0".to_string()));
    }
    Ok(len.div_ceil(batch_size))
}
