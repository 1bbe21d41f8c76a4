//! Payload serialization
//!
//! Adapters only talk to the [`Serializer`] trait, so a different wire format can be
//! plugged in without touching handler code. [`JsonSerializer`] is the default.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::HandlerError;

/// Generic string-keyed JSON object, the payload type of untyped handlers
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Encodes and decodes invocation payloads
pub trait Serializer: Clone + Send + Sync + 'static {
    /// Encode a typed value to bytes
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, HandlerError>;

    /// Decode bytes into a typed value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, HandlerError>;

    /// Encode a generic object to bytes
    fn encode_map(&self, map: &JsonObject) -> Result<Bytes, HandlerError> {
        self.encode(map)
    }

    /// Decode bytes into a generic object. Fails unless the payload is an object.
    fn decode_map(&self, bytes: &[u8]) -> Result<JsonObject, HandlerError>;
}

/// serde_json backed [`Serializer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, HandlerError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| HandlerError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, HandlerError> {
        serde_json::from_slice(bytes).map_err(|e| HandlerError::Decode(e.to_string()))
    }

    fn decode_map(&self, bytes: &[u8]) -> Result<JsonObject, HandlerError> {
        match self.decode::<JsonValue>(bytes)? {
            JsonValue::Object(map) => Ok(map),
            other => Err(HandlerError::Decode(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
