//! Wire envelope: a tag plus the payload's still-serialized data.
//!
//! ```text
//! {"T":"<tag>","D":null,"Data":{ ...payload fields... }}
//! ```
//!
//! `Data` is captured as a [`RawValue`], so the outer parse only checks that
//! it is well-formed JSON. The payload type is chosen from `T` afterwards and
//! parses `Data` in a second pass. `D` is always written as `null` and ignored
//! on read.

use std::borrow::Cow;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// Envelope as written by the encoder.
#[derive(Debug, Serialize)]
pub(crate) struct OutboundEnvelope<'a> {
    #[serde(rename = "T")]
    pub tag: &'a str,
    #[serde(rename = "D")]
    pub vestigial: (),
    #[serde(rename = "Data")]
    pub data: &'a RawValue,
}

impl<'a> OutboundEnvelope<'a> {
    pub fn new(tag: &'a str, data: &'a RawValue) -> Self {
        Self {
            tag,
            vestigial: (),
            data,
        }
    }
}

/// Envelope as read by the decoder, borrowing from the input.
///
/// A missing `T` reads as the empty tag, which no factory is registered for.
/// A missing `Data` reads as `None` and fails the second pass; a `null`
/// `Data` is kept as the raw text `null`.
#[derive(Debug, Deserialize)]
pub(crate) struct InboundEnvelope<'a> {
    #[serde(rename = "T", default, borrow)]
    pub tag: Cow<'a, str>,
    #[serde(rename = "D", default)]
    #[allow(dead_code)]
    pub vestigial: Option<IgnoredAny>,
    #[serde(rename = "Data", default, borrow, deserialize_with = "present")]
    pub data: Option<&'a RawValue>,
}

/// Capture any value, `null` included, as present.
fn present<'de: 'a, 'a, D>(deserializer: D) -> Result<Option<&'a RawValue>, D::Error>
where
    D: Deserializer<'de>,
{
    <&'a RawValue>::deserialize(deserializer).map(Some)
}

impl InboundEnvelope<'_> {
    /// Raw bytes of the `Data` region, empty when absent.
    pub fn raw_data(&self) -> &[u8] {
        self.data.map(|raw| raw.get().as_bytes()).unwrap_or_default()
    }
}
