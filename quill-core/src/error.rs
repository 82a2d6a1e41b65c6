//! Error types for quill

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error at position {pos}: {msg}")]
    Parse { pos: usize, msg: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn parse(pos: usize, msg: impl Into<String>) -> Self {
        Error::Parse {
            pos,
            msg: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
