//! Code-point to byte offset translation
//!
//! Tag offsets always count code points. This module is the only place that
//! knows about code units: it maps code-point positions to byte positions of
//! the text encoded as UTF-8, UTF-16 or UTF-32 and back, rejecting byte
//! positions that fall inside a multi-unit sequence. No byte order mark is
//! ever counted.

use crate::error::{Result, TextError};
use crate::models::Offsets;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Supported target encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl Encoding {
    /// Parse an IANA charset label, ignoring case and dashes/underscores
    ///
    /// Plain `UTF-16`/`UTF-32` mean big endian.
    pub fn from_label(label: &str) -> Result<Self> {
        let normal: String = label
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normal.as_str() {
            "utf8" => Ok(Encoding::Utf8),
            "utf16le" => Ok(Encoding::Utf16Le),
            "utf16" | "utf16be" => Ok(Encoding::Utf16Be),
            "utf32le" => Ok(Encoding::Utf32Le),
            "utf32" | "utf32be" => Ok(Encoding::Utf32Be),
            _ => Err(TextError::UnknownEncoding(label.to_string())),
        }
    }

    /// Canonical IANA label
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16Le => "utf-16le",
            Encoding::Utf16Be => "utf-16be",
            Encoding::Utf32Le => "utf-32le",
            Encoding::Utf32Be => "utf-32be",
        }
    }

    /// Code unit size in bytes
    pub fn unit_size(&self) -> usize {
        match self {
            Encoding::Utf8 => 1,
            Encoding::Utf16Le | Encoding::Utf16Be => 2,
            Encoding::Utf32Le | Encoding::Utf32Be => 4,
        }
    }

    /// Length of the byte order mark
    pub fn bom_len(&self) -> usize {
        match self {
            Encoding::Utf8 => 3,
            Encoding::Utf16Le | Encoding::Utf16Be => 2,
            Encoding::Utf32Le | Encoding::Utf32Be => 4,
        }
    }

    /// Encoded byte length of one character
    pub fn char_width(&self, c: char) -> usize {
        match self {
            Encoding::Utf8 => c.len_utf8(),
            Encoding::Utf16Le | Encoding::Utf16Be => c.len_utf16() * 2,
            Encoding::Utf32Le | Encoding::Utf32Be => 4,
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Encoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Encoding::Utf32Le => text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
            Encoding::Utf32Be => text.chars().flat_map(|c| (c as u32).to_be_bytes()).collect(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let decode_error = |reason: String| TextError::Decode {
            encoding: self.label().to_string(),
            reason,
        };

        if bytes.len() % self.unit_size() != 0 {
            return Err(decode_error(format!(
                "{} bytes is not a multiple of the {}-byte code unit",
                bytes.len(),
                self.unit_size()
            )));
        }

        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| decode_error(e.to_string())),
            Encoding::Utf16Le | Encoding::Utf16Be => {
                let little = *self == Encoding::Utf16Le;
                let units = bytes.chunks_exact(2).map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if little {
                        u16::from_le_bytes(pair)
                    } else {
                        u16::from_be_bytes(pair)
                    }
                });
                char::decode_utf16(units)
                    .collect::<std::result::Result<String, _>>()
                    .map_err(|e| decode_error(e.to_string()))
            }
            Encoding::Utf32Le | Encoding::Utf32Be => {
                let little = *self == Encoding::Utf32Le;
                bytes
                    .chunks_exact(4)
                    .map(|quad| {
                        let quad = [quad[0], quad[1], quad[2], quad[3]];
                        let value = if little {
                            u32::from_le_bytes(quad)
                        } else {
                            u32::from_be_bytes(quad)
                        };
                        char::from_u32(value).ok_or_else(|| decode_error(format!("invalid code point {:#x}", value)))
                    })
                    .collect()
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self> {
        Encoding::from_label(s)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Byte position of every code point plus the total encoded length
///
/// The result has `chars + 1` entries and starts at 0.
pub fn offset_map(text: &str, encoding: Encoding) -> Vec<usize> {
    let mut map = Vec::with_capacity(text.len() + 1);
    let mut offset = 0;

    for c in text.chars() {
        map.push(offset);
        offset += encoding.char_width(c);
    }

    map.push(offset);
    map
}

/// Check a precomputed offset map for a text of `char_len` code points
///
/// The map may start at 0 or after a byte order mark; the returned map
/// always starts at 0. Only the shape is checked: `char_len + 1` strictly
/// increasing entries whose total lies between one code unit and four bytes
/// per character.
pub fn check_map(map: &[usize], char_len: usize, encoding: Encoding) -> Result<Vec<usize>> {
    if map.len() != char_len + 1 {
        return Err(TextError::invalid_offsets(
            map,
            format!("{} map has {} entries, expected {}", encoding, map.len(), char_len + 1),
        ));
    }

    let first = map[0];
    if first != 0 && first != encoding.bom_len() {
        return Err(TextError::invalid_offsets(map, format!("{} map starts at {}", encoding, first)));
    }

    if map.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(TextError::invalid_offsets(map, format!("{} map is not increasing", encoding)));
    }

    let total = map[char_len] - first;
    if total < char_len * encoding.unit_size() || total > char_len * 4 {
        return Err(TextError::invalid_offsets(
            map,
            format!("{} map total {} impossible for {} characters", encoding, total, char_len),
        ));
    }

    Ok(map.iter().map(|o| o - first).collect())
}

/// Offset translator for one text in one encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCodec {
    encoding: Encoding,
    map: Vec<usize>,
}

impl OffsetCodec {
    pub fn new(text: &str, encoding: Encoding) -> Self {
        Self {
            encoding,
            map: offset_map(text, encoding),
        }
    }

    /// Build the codec from already encoded bytes
    pub fn from_encoded(bytes: &[u8], encoding: Encoding) -> Result<Self> {
        let text = encoding.decode(bytes)?;
        Ok(Self::new(&text, encoding))
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn char_len(&self) -> usize {
        self.map.len() - 1
    }

    pub fn byte_len(&self) -> usize {
        self.map[self.map.len() - 1]
    }

    /// The underlying map (see [`offset_map`])
    pub fn map(&self) -> &[usize] {
        &self.map
    }

    /// Byte position of code point `offset`
    pub fn byte_offset(&self, offset: usize) -> Result<usize> {
        self.map.get(offset).copied().ok_or_else(|| {
            TextError::invalid_offsets(&[offset], format!("offset beyond text length {}", self.char_len()))
        })
    }

    /// Code-point position of byte `offset`
    pub fn char_offset(&self, offset: usize) -> Result<usize> {
        if offset > self.byte_len() {
            return Err(TextError::invalid_offsets(
                &[offset],
                format!("byte offset beyond encoded length {}", self.byte_len()),
            ));
        }

        self.map.binary_search(&offset).map_err(|_| TextError::EncodingBoundary {
            offset,
            encoding: self.encoding.label().to_string(),
        })
    }

    /// Translate a code-point range into a byte range
    pub fn to_bytes(&self, range: Range<usize>) -> Result<Range<usize>> {
        check_range(&range)?;
        Ok(self.byte_offset(range.start)?..self.byte_offset(range.end)?)
    }

    /// Translate a byte range into a code-point range
    pub fn from_bytes(&self, range: Range<usize>) -> Result<Range<usize>> {
        check_range(&range)?;
        Ok(self.char_offset(range.start)?..self.char_offset(range.end)?)
    }

    /// Translate all offsets of a tag into byte offsets
    pub fn encode_offsets(&self, offsets: &Offsets) -> Result<Vec<usize>> {
        offsets.as_slice().iter().map(|&o| self.byte_offset(o)).collect()
    }

    /// Translate byte offsets back into validated tag offsets
    pub fn decode_offsets(&self, byte_offsets: &[usize]) -> Result<Offsets> {
        let chars = byte_offsets
            .iter()
            .map(|&b| self.char_offset(b))
            .collect::<Result<Vec<_>>>()?;
        Offsets::new(chars)
    }
}

fn check_range(range: &Range<usize>) -> Result<()> {
    if range.start > range.end {
        return Err(TextError::invalid_offsets(&[range.start, range.end], "range start after end"));
    }
    Ok(())
}

/// Translate a code-point range of `text` into a byte range for `encoding`
pub fn to_bytes(text: &str, range: Range<usize>, encoding: Encoding) -> Result<Range<usize>> {
    OffsetCodec::new(text, encoding).to_bytes(range)
}

/// Translate a byte range of encoded `bytes` back into a code-point range
pub fn from_bytes(bytes: &[u8], range: Range<usize>, encoding: Encoding) -> Result<Range<usize>> {
    OffsetCodec::from_encoded(bytes, encoding)?.from_bytes(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "a\u{e4}\u{10ABCD}!";

    const ALL: [Encoding; 5] = [
        Encoding::Utf8,
        Encoding::Utf16Le,
        Encoding::Utf16Be,
        Encoding::Utf32Le,
        Encoding::Utf32Be,
    ];

    #[test]
    fn test_offset_maps() {
        assert_eq!(offset_map(SAMPLE, Encoding::Utf8), vec![0, 1, 3, 7, 8]);
        assert_eq!(offset_map(SAMPLE, Encoding::Utf16Le), vec![0, 2, 4, 8, 10]);
        assert_eq!(offset_map(SAMPLE, Encoding::Utf32Be), vec![0, 4, 8, 12, 16]);
        assert_eq!(offset_map("", Encoding::Utf8), vec![0]);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Encoding::from_label("UTF-8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_label("utf8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_label("UTF-16LE").unwrap(), Encoding::Utf16Le);
        assert_eq!(Encoding::from_label("utf_16").unwrap(), Encoding::Utf16Be);
        assert_eq!("utf-32".parse::<Encoding>().unwrap(), Encoding::Utf32Be);
        assert!(matches!(Encoding::from_label("latin-1"), Err(TextError::UnknownEncoding(_))));
    }

    #[test]
    fn test_encode_decode() {
        for encoding in ALL {
            let bytes = encoding.encode(SAMPLE);
            assert_eq!(bytes.len(), offset_map(SAMPLE, encoding)[4]);
            assert_eq!(encoding.decode(&bytes).unwrap(), SAMPLE);
        }
    }

    #[test]
    fn test_round_trip_every_range() {
        let n = SAMPLE.chars().count();
        for encoding in ALL {
            let bytes = encoding.encode(SAMPLE);
            for start in 0..=n {
                for end in start..=n {
                    let byte_range = to_bytes(SAMPLE, start..end, encoding).unwrap();
                    let back = from_bytes(&bytes, byte_range, encoding).unwrap();
                    assert_eq!(back, start..end, "{} round trip of {}..{}", encoding, start, end);
                }
            }
        }
    }

    #[test]
    fn test_utf8_continuation_byte_rejected() {
        let bytes = Encoding::Utf8.encode(SAMPLE);
        // byte 2 is the continuation byte of the two-byte a-umlaut
        let err = from_bytes(&bytes, 0..2, Encoding::Utf8).unwrap_err();
        assert_eq!(
            err,
            TextError::EncodingBoundary {
                offset: 2,
                encoding: "utf-8".to_string()
            }
        );
    }

    #[test]
    fn test_utf16_low_surrogate_rejected() {
        let bytes = Encoding::Utf16Le.encode(SAMPLE);
        // bytes 4..8 hold the surrogate pair; 6 is its second half
        let err = from_bytes(&bytes, 6..8, Encoding::Utf16Le).unwrap_err();
        assert!(matches!(err, TextError::EncodingBoundary { offset: 6, .. }));
        // odd offsets split a code unit
        assert!(matches!(
            from_bytes(&bytes, 1..2, Encoding::Utf16Le),
            Err(TextError::EncodingBoundary { offset: 1, .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            to_bytes(SAMPLE, 0..5, Encoding::Utf8),
            Err(TextError::InvalidOffset { .. })
        ));
        assert!(matches!(
            to_bytes(SAMPLE, 3..2, Encoding::Utf8),
            Err(TextError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_invalid_bytes() {
        assert!(matches!(
            from_bytes(&[0xff, 0xfe], 0..1, Encoding::Utf8),
            Err(TextError::Decode { .. })
        ));
        assert!(matches!(
            from_bytes(&[0x00, 0x61, 0x00], 0..2, Encoding::Utf16Be),
            Err(TextError::Decode { .. })
        ));
    }

    #[test]
    fn test_tag_offsets() {
        let codec = OffsetCodec::new(SAMPLE, Encoding::Utf8);
        let offsets = Offsets::new(vec![0, 1, 2, 4]).unwrap();
        let bytes = codec.encode_offsets(&offsets).unwrap();
        assert_eq!(bytes, vec![0, 1, 3, 8]);
        assert_eq!(codec.decode_offsets(&bytes).unwrap(), offsets);
        assert_eq!(codec.char_len(), 4);
        assert_eq!(codec.byte_len(), 8);
    }

    #[test]
    fn test_check_map() {
        let utf16 = offset_map(SAMPLE, Encoding::Utf16Le);
        assert_eq!(check_map(&utf16, 4, Encoding::Utf16Le).unwrap(), utf16);

        let with_bom: Vec<usize> = utf16.iter().map(|o| o + 2).collect();
        assert_eq!(check_map(&with_bom, 4, Encoding::Utf16Be).unwrap(), utf16);

        assert!(check_map(&utf16[..4], 4, Encoding::Utf16Le).is_err());
        assert!(check_map(&[1, 2, 3, 7, 8], 4, Encoding::Utf8).is_err());
        assert!(check_map(&[0, 1, 1, 7, 8], 4, Encoding::Utf8).is_err());
        assert!(check_map(&[0, 1, 2, 3, 17], 4, Encoding::Utf8).is_err());
        assert!(check_map(&[0, 1, 2, 3, 4], 4, Encoding::Utf16Le).is_err());
        assert_eq!(check_map(&[0], 0, Encoding::Utf8).unwrap(), vec![0]);
    }
}
