//! Payload codecs.
//!
//! A serializer turns a typed payload into the byte string stored as a
//! sorted-set member, and back. Two members are the same entry exactly when
//! their encoded bytes are equal, so a codec must be deterministic.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Codec between payloads and stored members.
pub trait Serializer: Send + Sync {
    /// Encode a payload.
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, QueueError>;

    /// Decode a payload.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, QueueError>;

    /// Decode into an existing slot. The slot is untouched on failure.
    fn deserialize_into<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
        out: &mut T,
    ) -> Result<(), QueueError> {
        *out = self.deserialize(bytes)?;
        Ok(())
    }
}

/// Structured-text codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, QueueError> {
        serde_json::to_vec(value).map_err(|e| QueueError::Encoding(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, QueueError> {
        serde_json::from_slice(bytes).map_err(|e| QueueError::Decoding(e.to_string()))
    }
}

/// Binary-schema codec. Declared, not implemented yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufSerializer;

impl Serializer for ProtobufSerializer {
    fn serialize<T: Serialize>(&self, _value: &T) -> Result<Vec<u8>, QueueError> {
        Err(QueueError::NotImplemented("protobuf serializer".to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, _bytes: &[u8]) -> Result<T, QueueError> {
        Err(QueueError::NotImplemented("protobuf serializer".to_string()))
    }
}

/// Serializer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    #[default]
    Json,
    Protobuf,
}

impl SerializerKind {
    /// Build the codec for this kind.
    pub fn build(self) -> Codec {
        match self {
            SerializerKind::Json => Codec::Json(JsonSerializer),
            SerializerKind::Protobuf => Codec::Protobuf(ProtobufSerializer),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SerializerKind::Json => "json",
            SerializerKind::Protobuf => "protobuf",
        }
    }
}

impl FromStr for SerializerKind {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SerializerKind::Json),
            "protobuf" => Ok(SerializerKind::Protobuf),
            _ => Err(QueueError::UnknownSerializer(s.to_string())),
        }
    }
}

impl fmt::Display for SerializerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the built-in codecs, chosen at construction time.
#[derive(Debug, Clone, Copy)]
pub enum Codec {
    Json(JsonSerializer),
    Protobuf(ProtobufSerializer),
}

impl Codec {
    pub fn kind(&self) -> SerializerKind {
        match self {
            Codec::Json(_) => SerializerKind::Json,
            Codec::Protobuf(_) => SerializerKind::Protobuf,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        SerializerKind::default().build()
    }
}

impl Serializer for Codec {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, QueueError> {
        match self {
            Codec::Json(s) => s.serialize(value),
            Codec::Protobuf(s) => s.serialize(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, QueueError> {
        match self {
            Codec::Json(s) => s.deserialize(bytes),
            Codec::Protobuf(s) => s.deserialize(bytes),
        }
    }
}

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;
