/// # Constants with reserved meanings in Summa

/// In a given tensor shape, Summa reserves the `0th` dimension for batching
pub const BATCH_DIM: usize = 0;

/// In a given tensor shape, Summa reserves the `1st` dimension for sequence
pub const SEQ_DIM: usize = 1;

/// In a score tensor, the `2nd` dimension holds the vocabulary
pub const VOCAB_DIM: usize = 2;

/// Number of generated positions every score tensor is aligned to
pub const DEFAULT_MAX_NEW_TOKENS: usize = 50;

/// Number of tokens every reference is truncated or padded to
pub const DEFAULT_TARGET_LENGTH: usize = 50;
