use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated patch: need at least {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    #[error("unrecognized endianness flag byte: {0}")]
    BadEndianFlag(u8),

    #[error("i/o error reading patch: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CodecError> for pc_common::PcError {
    fn from(err: CodecError) -> Self {
        pc_common::PcError::Codec(err.to_string())
    }
}
