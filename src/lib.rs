//! # payload-codec
//!
//! Self-describing payload codec for Rust.
//!
//! Payloads are serialized into a JSON envelope that carries a type tag next
//! to the payload's own data. The decoder reads the tag first, looks up a
//! factory registered for it, and only then parses the data into the
//! concrete type, so the set of payload types stays open.
//!
//! ## Architecture
//!
//! - **Buffer pool** ([`pool`]): process-wide reusable scratch buffers
//! - **Type registry** ([`codec::Registry`]): tag to factory map, built once per codec
//! - **Envelope codec** ([`codec::Codec`]): two-pass encode/decode
//! - **Error payload** ([`codec::ErrorPayload`]): decode failures as ordinary payloads
//!
//! ## Example
//!
//! ```
//! use payload_codec::{Codec, Payload};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! struct Ping {
//!     seq: u64,
//! }
//!
//! impl Payload for Ping {
//!     fn tag(&self) -> &str {
//!         "ping"
//!     }
//! }
//!
//! let codec = Codec::builder().register_default::<Ping>().build();
//! let bytes = codec.encode_to_vec(&Ping { seq: 7 }).unwrap();
//!
//! match codec.decode_slice(&bytes).downcast::<Ping>() {
//!     Ok(ping) => assert_eq!(ping.seq, 7),
//!     Err(other) => panic!("unexpected payload {other:?}"),
//! }
//! ```

pub mod batch;
pub mod codec;
pub mod error;
pub mod pool;

pub use codec::{Codec, CodecBuilder, ErrorPayload, Payload, Registry, Sink, Source};
pub use error::CodecError;
pub use pool::BufferPool;
