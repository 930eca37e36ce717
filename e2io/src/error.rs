// SPDX-License-Identifier: MIT

/// Result type for block I/O operations.
pub type BlockIOResult<T = ()> = core::result::Result<T, BlockIOError>;

/// Error type for block I/O operations.
#[derive(Debug, Clone)]
pub enum BlockIOError {
    /// Underlying device read/write/seek/flush failure.
    Device(&'static str),

    /// Attempted to read or write outside the backing store.
    OutOfBounds,
}

impl BlockIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockIOError::Device(msg) => msg,
            BlockIOError::OutOfBounds => "Out of bounds",
        }
    }
}

impl core::fmt::Display for BlockIOError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.msg())
    }
}

impl std::error::Error for BlockIOError {}

impl From<std::io::Error> for BlockIOError {
    #[cold]
    #[inline(never)]
    fn from(e: std::io::Error) -> Self {
        // Leak the string to produce a 'static str. Acceptable for error mapping.
        let leaked: &'static str = Box::leak(e.to_string().into_boxed_str());
        BlockIOError::Device(leaked)
    }
}
