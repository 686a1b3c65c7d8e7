//! Error types for payload-codec.

use thiserror::Error;

/// Main error type for all codec operations.
///
/// Decoding never returns this directly: decode failures are folded into an
/// [`ErrorPayload`](crate::codec::ErrorPayload) that carries one of these as
/// its cause. Encoding returns it as a plain `Err`.
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error while reading a source or writing a sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Decode source is neither a byte sequence nor a reader.
    #[error("unknown config")]
    UnknownSource,

    /// No factory registered for the envelope tag.
    #[error("configuration not defined for {0}")]
    UndefinedTag(String),

    /// Encode sink is neither a byte slot nor a writer.
    #[error("{0} not supported")]
    UnsupportedSink(String),

    /// Payload reported an empty tag.
    #[error("payload tag must not be empty")]
    EmptyTag,
}

/// Result type alias using CodecError.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(CodecError::UnknownSource.to_string(), "unknown config");
        assert_eq!(
            CodecError::UndefinedTag("sample-v2".into()).to_string(),
            "configuration not defined for sample-v2"
        );
        assert_eq!(
            CodecError::UnsupportedSink("&str".into()).to_string(),
            "&str not supported"
        );
    }

    #[test]
    fn test_json_is_transparent() {
        let inner = serde_json::from_str::<u32>("x").unwrap_err();
        let expected = inner.to_string();
        let err = CodecError::from(inner);
        assert_eq!(err.to_string(), expected);
    }
}
