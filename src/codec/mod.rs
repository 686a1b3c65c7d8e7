//! Codec module - tagged envelopes with registry-driven decoding.
//!
//! This module provides:
//!
//! - [`Payload`] - capability of reporting a tag; implemented by every payload type
//! - [`Registry`] - maps tags to factories so the decoder can allocate the right type
//! - [`Codec`] - encodes payloads into envelopes and decodes envelopes back into payloads
//! - [`ErrorPayload`] - reserved payload that every decode failure turns into
//!
//! # Design
//!
//! Decoding is two-pass: the envelope is parsed first with its `Data` field
//! held as raw JSON, the tag picks a factory, then `Data` is parsed into the
//! concrete type. Decoding never returns `Err`; every failure comes back as
//! an [`ErrorPayload`], so heterogeneous results flow through one channel.
//! Encoding does return `Err`, since the caller already knows the payload type.
//!
//! # Example
//!
//! ```
//! use payload_codec::codec::{Codec, Payload};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! struct Sample {
//!     #[serde(rename = "Value")]
//!     value: String,
//! }
//!
//! impl Payload for Sample {
//!     fn tag(&self) -> &str {
//!         "sample"
//!     }
//! }
//!
//! let codec = Codec::builder().register(Sample::default).build();
//!
//! let bytes = codec.encode_to_vec(&Sample { value: "hi".into() }).unwrap();
//! assert_eq!(bytes, br#"{"T":"sample","D":null,"Data":{"Value":"hi"}}"#);
//!
//! let decoded = codec.decode_slice(&bytes);
//! assert_eq!(decoded.downcast_ref::<Sample>().unwrap().value, "hi");
//!
//! let unknown = codec.decode_slice(br#"{"T":"sample-v2","D":null,"Data":{}}"#);
//! assert_eq!(
//!     unknown.as_error().unwrap().message(),
//!     "configuration not defined for sample-v2"
//! );
//! ```

mod envelope;
mod io;
mod payload;
mod registry;

pub use io::{Sink, Source};
pub use payload::{AsAny, ErrorPayload, Payload, ERROR_TAG};
pub use registry::{Factory, Registry, TypedFactory};

use std::any::Any;
use std::io::Read;
use std::sync::Arc;

use bytes::BufMut;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::batch::chunk_by_size;
use crate::error::{CodecError, Result};
use crate::pool::BufferPool;
use envelope::{InboundEnvelope, OutboundEnvelope};
use io::Recording;

/// Label for failures to parse the outer envelope.
const STREAM_LABEL: &str = "cannot read JSON stream";

/// Label for failures to parse the payload data into its resolved type.
const DATA_LABEL: &str = "cannot read JSON data";

/// Builder for configuring and creating a [`Codec`].
pub struct CodecBuilder {
    registry: Registry,
    pool: &'static BufferPool,
}

impl CodecBuilder {
    /// Create a builder with an empty registry and the global pool.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            pool: BufferPool::global(),
        }
    }

    /// Register a payload factory.
    pub fn register<F, T>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Payload + Serialize + DeserializeOwned,
    {
        self.registry.register(factory);
        self
    }

    /// Register `T::default` as a payload factory.
    pub fn register_default<T>(mut self) -> Self
    where
        T: Payload + Serialize + DeserializeOwned + Default,
    {
        self.registry.register_default::<T>();
        self
    }

    /// Use a specific buffer pool instead of [`BufferPool::global`].
    pub fn pool(mut self, pool: &'static BufferPool) -> Self {
        self.pool = pool;
        self
    }

    /// Build the codec. The registry is read-only from here on.
    pub fn build(self) -> Codec {
        Codec {
            registry: Arc::new(self.registry),
            pool: self.pool,
        }
    }
}

impl Default for CodecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Envelope codec bound to one registry.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone, Debug)]
pub struct Codec {
    registry: Arc<Registry>,
    pool: &'static BufferPool,
}

impl Codec {
    /// Create a codec from a built registry, using the global pool.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            pool: BufferPool::global(),
        }
    }

    /// Create a new codec builder.
    pub fn builder() -> CodecBuilder {
        CodecBuilder::new()
    }

    /// The registry used to resolve tags.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decode one envelope from `source`.
    ///
    /// The envelope is staged in a pooled scratch slice, which goes back to
    /// the pool on every exit path. A reader source is consumed up to the end
    /// of the first JSON value only, so consecutive envelopes on one stream
    /// decode one call at a time.
    ///
    /// Never fails loudly: any failure is returned as an [`ErrorPayload`]
    /// whose message is one of
    /// - `cannot read JSON stream: <cause>` when the envelope cannot be read
    /// - `unknown config` when the source kind is unsupported
    /// - `configuration not defined for <tag>` when no factory matches the tag
    /// - `cannot read JSON data: <cause>` when the data does not fit the resolved type
    pub fn decode_from(&self, source: Source<'_>) -> Box<dyn Payload> {
        let mut scratch = self.pool.bytes();
        match source {
            Source::Bytes(bytes) => scratch.extend_from_slice(bytes),
            Source::Reader(reader) => {
                if let Err(e) = read_value(reader, &mut scratch) {
                    tracing::debug!(error = %e, "failed to read envelope stream");
                    return failure(e, STREAM_LABEL);
                }
            }
            Source::Unsupported(kind) => {
                tracing::debug!(kind, "unsupported decode source");
                return failure(CodecError::UnknownSource, "");
            }
        }
        self.decode_envelope(&scratch)
    }

    /// Decode one envelope from a byte slice.
    #[inline]
    pub fn decode_slice(&self, bytes: &[u8]) -> Box<dyn Payload> {
        self.decode_from(Source::Bytes(bytes))
    }

    /// Decode the next envelope from a blocking reader.
    ///
    /// Bytes after the envelope are left unread. Wrap unbuffered transports
    /// in a [`std::io::BufReader`] that outlives the calls.
    #[inline]
    pub fn decode_reader<R: Read>(&self, reader: &mut R) -> Box<dyn Payload> {
        self.decode_from(Source::Reader(reader))
    }

    /// Decode from a dynamically typed input (see [`Source::from_any`]).
    pub fn decode_any<T: Any>(&self, input: &mut T) -> Box<dyn Payload> {
        self.decode_from(Source::from_any(input))
    }

    /// Decode the next newline-delimited envelope from an async reader.
    ///
    /// Reads up to and including the next `\n` (or EOF), skipping blank
    /// lines, which matches what [`encode_to_async`](Self::encode_to_async)
    /// writes. The line is read into a slice taken from the pool and handed
    /// back once decoded; no guard is held across the read.
    pub async fn decode_from_async<R>(&self, reader: &mut R) -> Box<dyn Payload>
    where
        R: AsyncBufRead + Unpin + ?Sized,
    {
        let mut scratch = self.pool.acquire_bytes();
        let decoded = match read_line(reader, &mut scratch).await {
            Ok(()) => self.decode_envelope(&scratch),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read envelope stream");
                failure(CodecError::Io(e), STREAM_LABEL)
            }
        };
        self.pool.release_bytes(scratch);
        decoded
    }

    fn decode_envelope(&self, bytes: &[u8]) -> Box<dyn Payload> {
        let envelope: InboundEnvelope<'_> = match serde_json::from_slice(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "malformed envelope");
                return failure(CodecError::Json(e), STREAM_LABEL);
            }
        };

        let Some(factory) = self.registry.lookup(&envelope.tag) else {
            tracing::debug!(tag = %envelope.tag, "no factory registered for tag");
            return failure(CodecError::UndefinedTag(envelope.tag.into_owned()), "");
        };

        match factory.decode(envelope.raw_data()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(tag = %envelope.tag, error = %e, "malformed payload data");
                failure(CodecError::Json(e), DATA_LABEL)
            }
        }
    }

    /// Encode `payload` as an envelope into `sink`.
    ///
    /// # Errors
    ///
    /// Returns error if the payload tag is empty, the payload cannot be
    /// serialized, the sink kind is unsupported, or writing fails.
    pub fn encode_to<P>(&self, sink: Sink<'_>, payload: &P) -> Result<()>
    where
        P: Payload + Serialize,
    {
        encode_with(self.pool, sink, payload)
    }

    /// Encode `payload` as an envelope into a new vector.
    pub fn encode_to_vec<P>(&self, payload: &P) -> Result<Vec<u8>>
    where
        P: Payload + Serialize,
    {
        let mut out = Vec::new();
        self.encode_to(Sink::Vec(&mut out), payload)?;
        Ok(out)
    }

    /// Encode into a dynamically typed output (see [`Sink::from_any`]).
    pub fn encode_any<T, P>(&self, output: &mut T, payload: &P) -> Result<()>
    where
        T: Any,
        P: Payload + Serialize,
    {
        self.encode_to(Sink::from_any(output), payload)
    }

    /// Encode `payload` and write it to an async writer, followed by `\n`.
    ///
    /// The envelope is encoded before the first await, so no pooled storage
    /// is held across the write.
    pub async fn encode_to_async<W, P>(&self, writer: &mut W, payload: &P) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
        P: Payload + Serialize,
    {
        let mut bytes = self.encode_to_vec(payload)?;
        bytes.push(b'\n');
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Encode each payload separately and group the envelopes into frames of
    /// at most `budget` bytes (an envelope larger than `budget` gets a frame
    /// of its own).
    pub fn encode_frames<P>(&self, payloads: &[P], budget: usize) -> Result<Vec<Vec<Vec<u8>>>>
    where
        P: Payload + Serialize,
    {
        let encoded = payloads
            .iter()
            .map(|p| self.encode_to_vec(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(chunk_by_size(encoded, budget))
    }
}

/// Encode `payload` into `sink` using the global buffer pool.
///
/// Encoding needs no registry, so this is usable without a [`Codec`].
pub fn encode_to<P>(sink: Sink<'_>, payload: &P) -> Result<()>
where
    P: Payload + Serialize,
{
    encode_with(BufferPool::global(), sink, payload)
}

fn encode_with<P>(pool: &BufferPool, sink: Sink<'_>, payload: &P) -> Result<()>
where
    P: Payload + Serialize,
{
    let tag = payload.tag();
    if tag.is_empty() {
        return Err(CodecError::EmptyTag);
    }

    let mut data = pool.bytes();
    serde_json::to_writer(&mut *data, payload)?;
    let raw: &RawValue = serde_json::from_slice(&data)?;
    let envelope = OutboundEnvelope::new(tag, raw);

    match sink {
        Sink::Vec(out) => serde_json::to_writer(out, &envelope)?,
        Sink::Buffer(out) => serde_json::to_writer(out.writer(), &envelope)?,
        Sink::Writer(writer) => {
            let mut buf = pool.buffer();
            serde_json::to_writer((&mut *buf).writer(), &envelope)?;
            buf.put_u8(b'\n');
            writer.write_all(&buf)?;
        }
        Sink::Unsupported(kind) => {
            tracing::debug!(kind, tag, "unsupported encode sink");
            return Err(CodecError::UnsupportedSink(kind.to_string()));
        }
    }
    Ok(())
}

/// Read exactly one JSON value from `reader`, copying its bytes into `scratch`.
fn read_value(reader: &mut dyn Read, scratch: &mut Vec<u8>) -> Result<()> {
    let mut de = serde_json::Deserializer::from_reader(Recording::new(reader, scratch));
    IgnoredAny::deserialize(&mut de).map_err(|e| {
        if e.is_io() {
            CodecError::Io(e.into())
        } else {
            CodecError::Json(e)
        }
    })?;
    Ok(())
}

/// Read the next non-blank line into `line`.
async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    loop {
        let n = reader.read_until(b'\n', line).await?;
        if n == 0 || !line.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        line.clear();
    }
}

fn failure(cause: CodecError, label: &str) -> Box<dyn Payload> {
    Box::new(ErrorPayload::new(cause, label))
}
