//! Decode sources and encode sinks.
//!
//! The codec reads from a byte sequence or a blocking reader and writes to a
//! byte slot or a blocking writer. Anything else is represented as
//! `Unsupported` so the failure surfaces through the normal decode/encode
//! paths instead of at the call site.

use std::any::{type_name, Any};
use std::fmt;
use std::io::{self, Read, Write};

use bytes::{Bytes, BytesMut};

/// Input accepted by [`Codec::decode_from`](super::Codec::decode_from).
pub enum Source<'a> {
    /// Complete envelope bytes.
    Bytes(&'a [u8]),
    /// Blocking reader; one JSON value is consumed per decode.
    Reader(&'a mut dyn Read),
    /// Input of an unrecognised kind (type name).
    Unsupported(&'static str),
}

impl<'a> Source<'a> {
    /// Classify a dynamically typed input.
    ///
    /// Recognises `Vec<u8>`, `Bytes`, `BytesMut` and `Box<dyn Read + Send>`.
    pub fn from_any<T: Any>(value: &'a mut T) -> Self {
        let any: &'a mut dyn Any = value;
        let unsupported = Source::Unsupported(type_name::<T>());

        if any.is::<Box<dyn Read + Send>>() {
            return any
                .downcast_mut::<Box<dyn Read + Send>>()
                .map_or(unsupported, |r| Source::Reader(&mut **r));
        }

        let any: &'a dyn Any = any;
        if let Some(v) = any.downcast_ref::<Vec<u8>>() {
            Source::Bytes(v)
        } else if let Some(b) = any.downcast_ref::<Bytes>() {
            Source::Bytes(b)
        } else if let Some(b) = any.downcast_ref::<BytesMut>() {
            Source::Bytes(b)
        } else {
            unsupported
        }
    }

    /// Kind name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Bytes(_) => "bytes",
            Source::Reader(_) => "reader",
            Source::Unsupported(name) => name,
        }
    }
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Source::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Source<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl<'a> From<&'a Bytes> for Source<'a> {
    fn from(bytes: &'a Bytes) -> Self {
        Source::Bytes(bytes)
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Source::Reader(_) => f.write_str("Reader"),
            Source::Unsupported(name) => f.debug_tuple("Unsupported").field(name).finish(),
        }
    }
}

/// Reader that copies every byte it hands out into `seen`.
pub(crate) struct Recording<'r, 's> {
    inner: &'r mut dyn Read,
    seen: &'s mut Vec<u8>,
}

impl<'r, 's> Recording<'r, 's> {
    pub fn new(inner: &'r mut dyn Read, seen: &'s mut Vec<u8>) -> Self {
        Self { inner, seen }
    }
}

impl Read for Recording<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.seen.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// Output accepted by [`Codec::encode_to`](super::Codec::encode_to).
pub enum Sink<'a> {
    /// Envelope bytes are appended to the vector.
    Vec(&'a mut Vec<u8>),
    /// Envelope bytes are appended to the buffer.
    Buffer(&'a mut BytesMut),
    /// Envelope is written in one `write_all`, followed by `\n`.
    Writer(&'a mut dyn Write),
    /// Output of an unrecognised kind (type name).
    Unsupported(&'static str),
}

impl<'a> Sink<'a> {
    /// Classify a dynamically typed output.
    ///
    /// Recognises `Vec<u8>`, `BytesMut` and `Box<dyn Write + Send>`.
    pub fn from_any<T: Any>(value: &'a mut T) -> Self {
        let any: &'a mut dyn Any = value;
        let unsupported = Sink::Unsupported(type_name::<T>());

        if any.is::<Vec<u8>>() {
            any.downcast_mut::<Vec<u8>>().map_or(unsupported, Sink::Vec)
        } else if any.is::<BytesMut>() {
            any.downcast_mut::<BytesMut>().map_or(unsupported, Sink::Buffer)
        } else if any.is::<Box<dyn Write + Send>>() {
            any.downcast_mut::<Box<dyn Write + Send>>()
                .map_or(unsupported, |w| Sink::Writer(&mut **w))
        } else {
            unsupported
        }
    }

    /// Kind name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Sink::Vec(_) => "vec",
            Sink::Buffer(_) => "buffer",
            Sink::Writer(_) => "writer",
            Sink::Unsupported(name) => name,
        }
    }
}

impl<'a> From<&'a mut Vec<u8>> for Sink<'a> {
    fn from(out: &'a mut Vec<u8>) -> Self {
        Sink::Vec(out)
    }
}

impl<'a> From<&'a mut BytesMut> for Sink<'a> {
    fn from(out: &'a mut BytesMut) -> Self {
        Sink::Buffer(out)
    }
}

impl fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Vec(v) => f.debug_tuple("Vec").field(&v.len()).finish(),
            Sink::Buffer(b) => f.debug_tuple("Buffer").field(&b.len()).finish(),
            Sink::Writer(_) => f.write_str("Writer"),
            Sink::Unsupported(name) => f.debug_tuple("Unsupported").field(name).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_source_from_any_vec() {
        let mut input = b"{}".to_vec();
        assert!(matches!(Source::from_any(&mut input), Source::Bytes(b) if b == b"{}"));
    }

    #[test]
    fn test_source_from_any_bytes() {
        let mut input = Bytes::from_static(b"[]");
        assert!(matches!(Source::from_any(&mut input), Source::Bytes(b) if b == b"[]"));

        let mut input = BytesMut::from(&b"[1]"[..]);
        assert!(matches!(Source::from_any(&mut input), Source::Bytes(b) if b == b"[1]"));
    }

    #[test]
    fn test_source_from_any_reader() {
        let mut input: Box<dyn Read + Send> = Box::new(Cursor::new(b"abc".to_vec()));
        let source = Source::from_any(&mut input);
        assert_eq!(source.kind(), "reader");

        if let Source::Reader(r) = source {
            let mut out = String::new();
            r.read_to_string(&mut out).unwrap();
            assert_eq!(out, "abc");
        }
    }

    #[test]
    fn test_source_from_any_unsupported() {
        let mut input = String::from("{}");
        let source = Source::from_any(&mut input);
        assert!(matches!(source, Source::Unsupported(name) if name.contains("String")));
    }

    #[test]
    fn test_sink_from_any() {
        let mut out: Vec<u8> = Vec::new();
        assert_eq!(Sink::from_any(&mut out).kind(), "vec");

        let mut out = BytesMut::new();
        assert_eq!(Sink::from_any(&mut out).kind(), "buffer");

        let mut out: Box<dyn Write + Send> = Box::new(Vec::new());
        assert_eq!(Sink::from_any(&mut out).kind(), "writer");

        let mut out = "";
        assert_eq!(Sink::from_any(&mut out).kind(), "&str");
    }

    #[test]
    fn test_recording_copies_what_was_read() {
        let mut input = Cursor::new(b"abcdef".to_vec());
        let mut seen = Vec::new();
        let mut out = [0u8; 4];

        let n = Recording::new(&mut input, &mut seen).read(&mut out).unwrap();
        assert_eq!(n, 4);
        assert_eq!(seen, b"abcd");
        assert_eq!(input.position(), 4);
    }

    #[test]
    fn test_from_impls() {
        let data = vec![1u8, 2, 3];
        assert!(matches!(Source::from(&data), Source::Bytes(b) if b.len() == 3));
        assert!(matches!(Source::from(&data[..1]), Source::Bytes(b) if b.len() == 1));

        let mut out = Vec::new();
        assert!(matches!(Sink::from(&mut out), Sink::Vec(_)));
    }
}
