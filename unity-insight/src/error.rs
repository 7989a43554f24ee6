//! Error types for the analysis pipeline

use thiserror::Error;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Errors that can occur while inspecting a build
#[derive(Error, Debug)]
pub enum InsightError {
    /// None of the supplied archive paths could be opened
    #[error("no openable archive among the supplied paths")]
    NoContainers,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP container errors
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The blob does not carry the expected bundle signature
    #[error("unexpected bundle signature: {0:?}")]
    BadSignature(String),

    /// Compression scheme recognized but declined
    #[error("unsupported compression type {0}")]
    UnsupportedCompression(u32),

    /// Decompression produced no usable output
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Structurally invalid serialized data
    #[error("malformed asset: {0}")]
    MalformedAsset(String),

    /// Ran out of bytes mid-read
    #[error("short read: expected {expected} bytes, {actual} available")]
    ShortRead { expected: usize, actual: usize },

    /// A buffer could not be reserved within memory limits
    #[error("allocation of {0} bytes refused")]
    Memory(u64),

    /// Non-UTF-8 bytes where a string was expected
    #[error("invalid string data: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),
}

impl InsightError {
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedAsset(msg.into())
    }

    pub fn decompression<S: Into<String>>(msg: S) -> Self {
        Self::Decompression(msg.into())
    }

    pub fn short_read(expected: usize, actual: usize) -> Self {
        Self::ShortRead { expected, actual }
    }

    /// Whether the error may be contained at its parse unit (node, asset)
    /// rather than ending the whole analysis.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NoContainers)
    }
}

impl From<lz4_flex::block::DecompressError> for InsightError {
    fn from(err: lz4_flex::block::DecompressError) -> Self {
        Self::decompression(format!("LZ4 block decode failed: {err}"))
    }
}
