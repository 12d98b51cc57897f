/// Errors that can occur while decoding the token stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// An escape byte was followed by a tag no token uses. The stream is
    /// desynchronized and cannot be recovered.
    #[error("unrecognized token (tag 0x{0:02x})")]
    UnknownTag(u8),
}

pub type Result<T> = std::result::Result<T, TokenError>;
