//! Type registry mapping tags to payload factories.
//!
//! The registry is what lets the decoder allocate the right concrete type
//! from a tag it reads off the wire, without knowing the payload types at
//! compile time. Every registry starts with [`ErrorPayload`] registered.
//!
//! # Example
//!
//! ```
//! use payload_codec::codec::{Payload, Registry};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Sample {
//!     value: String,
//! }
//!
//! impl Payload for Sample {
//!     fn tag(&self) -> &str {
//!         "sample"
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.register(Sample::default);
//!
//! assert!(registry.lookup("sample").is_some());
//! assert!(registry.lookup("__codec.Error").is_some());
//! assert!(registry.lookup("sample-v2").is_none());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::payload::{ErrorPayload, Payload};

/// Type-erased constructor for one payload type.
pub trait Factory: Send + Sync + 'static {
    /// A fresh zero value.
    fn zero(&self) -> Box<dyn Payload>;

    /// Parse raw JSON data into a fresh zero value of the concrete type.
    ///
    /// Fields absent from `raw` keep the zero value's contents, and a
    /// `null` document yields the zero value unchanged.
    fn decode(&self, raw: &[u8]) -> serde_json::Result<Box<dyn Payload>>;
}

/// Wrapper that turns a `Fn() -> T` into a [`Factory`].
pub struct TypedFactory<F, T>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Payload + Serialize + DeserializeOwned,
{
    make: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<F, T> TypedFactory<F, T>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Payload + Serialize + DeserializeOwned,
{
    /// Create a new typed factory.
    pub fn new(make: F) -> Self {
        Self {
            make,
            _phantom: PhantomData,
        }
    }
}

impl<F, T> Factory for TypedFactory<F, T>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Payload + Serialize + DeserializeOwned,
{
    fn zero(&self) -> Box<dyn Payload> {
        Box::new((self.make)())
    }

    fn decode(&self, raw: &[u8]) -> serde_json::Result<Box<dyn Payload>> {
        let zero = (self.make)();
        let data: Value = serde_json::from_slice(raw)?;
        if data.is_null() {
            return Ok(Box::new(zero));
        }

        let mut seeded = serde_json::to_value(&zero)?;
        overlay(&mut seeded, data);
        let value: T = match serde_json::from_value(seeded) {
            Ok(value) => value,
            // Merging two variants of one enum leaves an object the type rejects.
            Err(merged) => serde_json::from_slice(raw).map_err(|_| merged)?,
        };
        Ok(Box::new(value))
    }
}

/// Merge `data` into `base`. Objects merge key by key, recursively; any
/// other value replaces what was there.
fn overlay(base: &mut Value, data: Value) {
    match (base, data) {
        (Value::Object(base), Value::Object(data)) => {
            for (key, value) in data {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, data) => *base = data,
    }
}

/// Registry mapping tags to factories.
///
/// Mutated only while it is being built; once handed to a
/// [`Codec`](super::Codec) it is shared read-only.
pub struct Registry {
    factories: HashMap<String, Box<dyn Factory>>,
}

impl Registry {
    /// Create a registry holding only the error payload factory.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(ErrorPayload::default);
        registry
    }

    /// Register a factory under the tag its zero value reports.
    ///
    /// The factory is called once here to learn the tag. Registering a tag
    /// that is already present replaces the earlier factory.
    pub fn register<F, T>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Payload + Serialize + DeserializeOwned,
    {
        let tag = factory().tag().to_string();
        self.insert(tag, Box::new(TypedFactory::new(factory)));
        self
    }

    /// Register `T::default` as the factory for `T`.
    pub fn register_default<T>(&mut self) -> &mut Self
    where
        T: Payload + Serialize + DeserializeOwned + Default,
    {
        self.register(T::default)
    }

    /// Register an already type-erased factory.
    pub fn register_factory(&mut self, factory: Box<dyn Factory>) -> &mut Self {
        let tag = factory.zero().tag().to_string();
        self.insert(tag, factory);
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F, T>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Payload + Serialize + DeserializeOwned,
    {
        self.register(factory);
        self
    }

    fn insert(&mut self, tag: String, factory: Box<dyn Factory>) {
        if tag.is_empty() {
            tracing::warn!("registering payload factory with an empty tag");
        }
        if self.factories.insert(tag.clone(), factory).is_some() {
            // Last registration wins; nothing guards against accidental reuse.
            tracing::warn!(tag = %tag, "payload tag registered twice, replacing factory");
        }
    }

    /// Factory for `tag`, if one is registered.
    pub fn lookup(&self, tag: &str) -> Option<&dyn Factory> {
        self.factories.get(tag).map(|f| f.as_ref())
    }

    /// Whether `tag` has a factory.
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|t| t.as_str())
    }

    /// Number of registered tags, the error payload included.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Always false: the error payload is registered from the start.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("Registry").field("tags", &tags).finish()
    }
}
