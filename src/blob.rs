//! Opaque-blob codec.
//!
//! Values such as provider `extra_data` and partial-pipeline `data` are kept
//! in plain TEXT columns as serialized JSON. The storage layer never looks
//! inside them.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::StorageResult;

/// Serializes `value` into the text stored in a blob column.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Inverse of [`encode`]. A NULL column decodes to `None`.
pub fn decode<T: DeserializeOwned>(stored: Option<&str>) -> StorageResult<Option<T>> {
    match stored {
        Some(text) => Ok(Some(serde_json::from_str(text)?)),
        None => Ok(None),
    }
}

/// Encodes an optional blob; `None` stays NULL instead of becoming `"null"`.
pub fn encode_optional<T: Serialize>(value: Option<&T>) -> StorageResult<Option<String>> {
    value.map(|v| encode(v)).transpose()
}
