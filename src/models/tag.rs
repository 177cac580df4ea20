//! Tags: immutable `(namespace, id, offsets)` annotation identities
//!
//! Offsets are code-point positions into the annotated text. A single value
//! marks a point, two values a span `[start, end)`, and 2m values a chain of
//! m non-overlapping sub-spans.

use crate::error::{Result, TextError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Validated offset sequence of a tag
///
/// Always non-empty, strictly increasing, and of length 1 or an even number.
/// The upper bound (text length) is checked by the owning text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Offsets(Vec<usize>);

impl Offsets {
    /// Validate and wrap an offset sequence
    pub fn new(values: Vec<usize>) -> Result<Self> {
        if values.is_empty() {
            return Err(TextError::invalid_offsets(&values, "offsets missing"));
        }

        if values.len() > 1 && values.len() % 2 != 0 {
            return Err(TextError::invalid_offsets(&values, "odd number of offsets"));
        }

        if values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TextError::invalid_offsets(&values, "offsets not strictly increasing"));
        }

        Ok(Self(values))
    }

    /// Validate signed offsets, as found on the wire
    pub fn from_signed(values: &[i64]) -> Result<Self> {
        let mut unsigned = Vec::with_capacity(values.len());

        for &v in values {
            if v < 0 {
                return Err(TextError::InvalidOffset {
                    offsets: values.to_vec(),
                    reason: "negative offset".to_string(),
                });
            }
            unsigned.push(v as usize);
        }

        Self::new(unsigned)
    }

    /// A point annotation at `offset`
    pub fn point(offset: usize) -> Self {
        Self(vec![offset])
    }

    /// A simple span `[start, end)`
    pub fn span(start: usize, end: usize) -> Result<Self> {
        Self::new(vec![start, end])
    }

    /// Parse the dot-joined key form (`"1.3.4.6"`)
    pub fn parse_key(key: &str) -> Result<Self> {
        let values = key
            .split('.')
            .map(|part| part.trim().parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| TextError::malformed(format!("offset key '{}' is not a dot-joined integer list", key)))?;

        Self::from_signed(&values)
    }

    /// Dot-joined key form used by annotation objects
    pub fn to_key(&self) -> String {
        self.0
            .iter()
            .map(|o| o.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Smallest possible offsets in Key order among those starting at `start`
    ///
    /// Only used as a range bound; never stored.
    pub(crate) fn lower_probe(start: usize) -> Self {
        Self(vec![start, usize::MAX])
    }

    pub fn start(&self) -> usize {
        self.0[0]
    }

    pub fn end(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for validated offsets
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_point(&self) -> bool {
        self.0.len() == 1
    }

    pub fn is_multi_span(&self) -> bool {
        self.0.len() > 2
    }

    /// Sub-spans as `(start, end)` pairs; empty for point annotations
    pub fn spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Offsets relative to the first one (first value is always 0)
    pub fn relative(&self) -> Vec<usize> {
        let start = self.start();
        self.0.iter().map(|o| o - start).collect()
    }

    /// Check the upper bound against a text of `char_len` code points
    pub fn check_bounds(&self, char_len: usize) -> Result<()> {
        if self.end() > char_len {
            return Err(TextError::invalid_offsets(
                &self.0,
                format!("offset beyond text length {}", char_len),
            ));
        }
        Ok(())
    }
}

impl TryFrom<Vec<usize>> for Offsets {
    type Error = TextError;

    fn try_from(values: Vec<usize>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<Offsets> for Vec<usize> {
    fn from(offsets: Offsets) -> Self {
        offsets.0
    }
}

impl fmt::Display for Offsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, o) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", o)?;
        }
        write!(f, ")")
    }
}

/// An immutable annotation identity
///
/// Equality and hashing are structural over all three fields. The natural
/// order (`Ord`) is the forward Key order: start ascending, end descending
/// (enclosing spans first), full offsets, namespace, id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    namespace: String,
    id: String,
    offsets: Offsets,
}

impl Tag {
    /// Create a tag, validating the offset structure
    pub fn new(namespace: impl Into<String>, id: impl Into<String>, offsets: &[usize]) -> Result<Self> {
        Ok(Self::from_offsets(namespace, id, Offsets::new(offsets.to_vec())?))
    }

    /// Create a tag from already validated offsets
    pub fn from_offsets(namespace: impl Into<String>, id: impl Into<String>, offsets: Offsets) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
            offsets,
        }
    }

    /// A span tag `[start, end)`
    pub fn span(namespace: impl Into<String>, id: impl Into<String>, start: usize, end: usize) -> Result<Self> {
        Ok(Self::from_offsets(namespace, id, Offsets::span(start, end)?))
    }

    /// A point tag
    pub fn point(namespace: impl Into<String>, id: impl Into<String>, offset: usize) -> Self {
        Self::from_offsets(namespace, id, Offsets::point(offset))
    }

    /// Range bound for ordered scans: sorts before every real tag starting at `start`
    pub(crate) fn probe(start: usize) -> Self {
        Self::from_offsets(String::new(), String::new(), Offsets::lower_probe(start))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn offsets(&self) -> &Offsets {
        &self.offsets
    }

    pub fn start(&self) -> usize {
        self.offsets.start()
    }

    pub fn end(&self) -> usize {
        self.offsets.end()
    }

    /// ReverseKey order: end descending, start ascending, then as Key
    ///
    /// Not the reverse of `Ord`: tags sharing an end keep ascending starts.
    pub fn reverse_key_cmp(&self, other: &Self) -> Ordering {
        other
            .end()
            .cmp(&self.end())
            .then_with(|| self.start().cmp(&other.start()))
            .then_with(|| self.offsets.as_slice().cmp(other.offsets.as_slice()))
            .then_with(|| self.namespace.cmp(&other.namespace))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start()
            .cmp(&other.start())
            .then_with(|| other.end().cmp(&self.end()))
            .then_with(|| self.offsets.as_slice().cmp(other.offsets.as_slice()))
            .then_with(|| self.namespace.cmp(&other.namespace))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.namespace, self.id, self.offsets)
    }
}
