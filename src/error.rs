//! Error types for annotated text
//!
//! All errors are data-validity errors: they abort the operation in progress
//! and are handed back to the caller, never retried.

use thiserror::Error;

/// Top-level error type for tag indexing, byte translation and serialization
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    /// Offsets violate monotonicity, bounds or parity
    #[error("invalid offsets {offsets:?}: {reason}")]
    InvalidOffset { offsets: Vec<i64>, reason: String },

    /// A byte offset lands inside a multi-unit sequence
    #[error("byte offset {offset} is not on a {encoding} character boundary")]
    EncodingBoundary { offset: usize, encoding: String },

    /// Declared digest does not match the recomputed one
    #[error("checksum mismatch: declared {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Two tags partially overlap, so they cannot nest as elements
    #[error("tags {outer} and {inner} overlap without nesting")]
    NonHierarchicalTag { outer: String, inner: String },

    /// A JSON text or annotation object is missing members or is ill-formed
    #[error("malformed wire object: {0}")]
    MalformedWireObject(String),

    /// Charset label not supported
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Bytes are not valid for the declared encoding
    #[error("cannot decode {encoding} bytes: {reason}")]
    Decode { encoding: String, reason: String },

    /// Two texts with different content were merged
    #[error("text digests differ ({0} vs {1})")]
    TextMismatch(String, String),

    /// Markup could not be parsed or an element name is not a valid XML name
    #[error("invalid markup: {0}")]
    InvalidMarkup(String),

    /// Options could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The WASM API was called before a document was loaded
    #[error("no document loaded")]
    NoDocument,
}

pub type Result<T> = std::result::Result<T, TextError>;

impl TextError {
    /// Build an `InvalidOffset` error from unsigned offsets
    pub fn invalid_offsets(offsets: &[usize], reason: impl Into<String>) -> Self {
        TextError::InvalidOffset {
            offsets: offsets.iter().map(|&o| o as i64).collect(),
            reason: reason.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        TextError::MalformedWireObject(msg.into())
    }
}

impl From<serde_json::Error> for TextError {
    fn from(e: serde_json::Error) -> Self {
        TextError::MalformedWireObject(e.to_string())
    }
}

impl From<quick_xml::Error> for TextError {
    fn from(e: quick_xml::Error) -> Self {
        TextError::InvalidMarkup(e.to_string())
    }
}

impl From<serde_yaml::Error> for TextError {
    fn from(e: serde_yaml::Error) -> Self {
        TextError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_offsets_message() {
        let err = TextError::invalid_offsets(&[10, 8], "offsets not increasing");
        assert!(err.to_string().contains("[10, 8]"));
        assert!(err.to_string().contains("not increasing"));
    }

    #[test]
    fn test_json_error_is_malformed_object() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TextError = json_err.into();
        assert!(matches!(err, TextError::MalformedWireObject(_)));
    }
}
