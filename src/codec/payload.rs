//! Payload capability and the reserved error payload.
//!
//! A payload is any value that can name its own tag. The set of payload
//! types is open: new types join by being registered in a
//! [`Registry`](super::Registry), never by changing the codec.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Tag reserved for [`ErrorPayload`].
pub const ERROR_TAG: &str = "__codec.Error";

/// A value that reports the tag identifying its concrete type on the wire.
///
/// # Example
///
/// ```
/// use payload_codec::codec::Payload;
///
/// #[derive(Debug, Default)]
/// struct Sample {
///     value: String,
/// }
///
/// impl Payload for Sample {
///     fn tag(&self) -> &str {
///         "sample"
///     }
/// }
///
/// let boxed: Box<dyn Payload> = Box::new(Sample { value: "hi".into() });
/// assert_eq!(boxed.tag(), "sample");
/// assert_eq!(boxed.downcast_ref::<Sample>().unwrap().value, "hi");
/// ```
pub trait Payload: AsAny + fmt::Debug + Send + Sync {
    /// Tag of the concrete type. Must be non-empty and unique per type.
    fn tag(&self) -> &str;
}

/// Upcast helper so `dyn Payload` can be downcast to its concrete type.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Convert into `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn Payload {
    /// Whether the concrete type is `T`.
    #[inline]
    pub fn is<T: Payload>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow the concrete value if it is a `T`.
    #[inline]
    pub fn downcast_ref<T: Payload>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Take the concrete value if it is a `T`, otherwise give the box back.
    pub fn downcast<T: Payload>(self: Box<Self>) -> Result<Box<T>, Box<dyn Payload>> {
        if !self.is::<T>() {
            return Err(self);
        }
        self.into_any().downcast::<T>().map_err(|_| {
            let message = format!("payload is not a {}", std::any::type_name::<T>());
            Box::new(ErrorPayload::from_message(message)) as Box<dyn Payload>
        })
    }

    /// Whether this is the reserved error payload.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.is::<ErrorPayload>()
    }

    /// Borrow as an error payload.
    #[inline]
    pub fn as_error(&self) -> Option<&ErrorPayload> {
        self.downcast_ref::<ErrorPayload>()
    }
}

/// Payload standing for a failed decode (or a failure reported by a peer).
///
/// Only the message travels on the wire. A locally produced error payload
/// also keeps its cause for programmatic inspection through
/// [`unwrap`](Self::unwrap) or [`std::error::Error::source`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    message: String,
    #[serde(skip)]
    cause: Option<Arc<CodecError>>,
}

impl ErrorPayload {
    /// Wrap `cause`, prefixing its message with `"<label>: "` when `label` is non-empty.
    pub fn new(cause: CodecError, label: &str) -> Self {
        let message = if label.is_empty() {
            cause.to_string()
        } else {
            format!("{label}: {cause}")
        };
        Self {
            message,
            cause: Some(Arc::new(cause)),
        }
    }

    /// Error payload carrying only a message, as received from a peer.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped cause, if this payload was produced locally.
    pub fn unwrap(&self) -> Option<&CodecError> {
        self.cause.as_deref()
    }
}

impl Payload for ErrorPayload {
    fn tag(&self) -> &str {
        ERROR_TAG
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorPayload")
            .field("message", &self.message)
            .field("cause", &self.cause)
            .finish()
    }
}

impl std::error::Error for ErrorPayload {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for ErrorPayload {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[derive(Debug, PartialEq)]
    struct Other;

    impl Payload for Other {
        fn tag(&self) -> &str {
            "other"
        }
    }

    #[test]
    fn test_error_tag() {
        let err = ErrorPayload::new(CodecError::UnknownSource, "");
        assert_eq!(err.tag(), "__codec.Error");
    }

    #[test]
    fn test_error_message_without_label() {
        let err = ErrorPayload::new(CodecError::UndefinedTag("x".into()), "");
        assert_eq!(err.message(), "configuration not defined for x");
        assert_eq!(err.to_string(), err.message());
    }

    #[test]
    fn test_error_message_with_label() {
        let err = ErrorPayload::new(CodecError::UnknownSource, "wrap");
        assert_eq!(err.message(), "wrap: unknown config");
    }

    #[test]
    fn test_error_unwrap_exposes_cause() {
        let err = ErrorPayload::new(CodecError::UndefinedTag("x".into()), "ctx");
        assert!(matches!(err.unwrap(), Some(CodecError::UndefinedTag(t)) if t == "x"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_from_message_has_no_cause() {
        let err = ErrorPayload::from_message("remote failure");
        assert_eq!(err.message(), "remote failure");
        assert!(err.unwrap().is_none());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_error_serializes_message_only() {
        let err = ErrorPayload::new(CodecError::UnknownSource, "");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"message":"unknown config"}"#);

        let back: ErrorPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
        assert!(back.unwrap().is_none());
    }

    #[test]
    fn test_dyn_payload_downcast() {
        let boxed: Box<dyn Payload> = Box::new(Other);
        assert!(boxed.is::<Other>());
        assert!(!boxed.is_error());
        assert!(boxed.as_error().is_none());
        assert_eq!(boxed.downcast_ref::<Other>(), Some(&Other));

        let owned = boxed.downcast::<Other>().unwrap();
        assert_eq!(*owned, Other);
    }

    #[test]
    fn test_dyn_payload_downcast_mismatch_returns_box() {
        let boxed: Box<dyn Payload> = Box::new(ErrorPayload::from_message("boom"));
        assert!(boxed.is_error());

        let back = boxed.downcast::<Other>().unwrap_err();
        assert_eq!(back.as_error().unwrap().message(), "boom");
    }
}
