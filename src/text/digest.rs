//! Checksums of the encoded text
//!
//! A checksum identifies a text independently of its annotations and guards
//! wire objects against text corruption.

use crate::error::{Result, TextError};
use crate::text::codec::Encoding;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use md5::Md5;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256, Sha512};

/// Supported hash functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Md5,
    Sha256,
    Sha512,
}

impl HashType {
    /// Preference order when a checksum object declares several hashes
    pub const ALL: [HashType; 3] = [HashType::Md5, HashType::Sha256, HashType::Sha512];

    /// Parse a hash name, ignoring case and dashes (`SHA-256` == `sha256`)
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_key(label).as_str() {
            "md5" => Some(HashType::Md5),
            "sha256" => Some(HashType::Sha256),
            "sha512" => Some(HashType::Sha512),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HashType::Md5 => "md5",
            HashType::Sha256 => "sha256",
            HashType::Sha512 => "sha512",
        }
    }

    /// Digest size in bytes
    pub fn output_len(&self) -> usize {
        match self {
            HashType::Md5 => 16,
            HashType::Sha256 => 32,
            HashType::Sha512 => 64,
        }
    }

    pub fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            HashType::Md5 => Md5::digest(bytes).to_vec(),
            HashType::Sha256 => Sha256::digest(bytes).to_vec(),
            HashType::Sha512 => Sha512::digest(bytes).to_vec(),
        }
    }
}

/// Lowercase and strip dashes, as checksum member names are matched
pub(crate) fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('-', "")
}

/// Base64 digest without padding, using `-` and `.` instead of `+` and `/`
///
/// The result is safe to use in document-store URLs.
pub fn base64_digest(digest: &[u8]) -> String {
    STANDARD_NO_PAD
        .encode(digest)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '.',
            other => other,
        })
        .collect()
}

/// A declared checksum: hash function, text encoding and hex digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub encoding: Encoding,
    pub hash: HashType,
    /// Lowercase hex digest
    pub hex: String,
}

impl Checksum {
    /// Compute the checksum of `text`
    pub fn compute(text: &str, hash: HashType, encoding: Encoding) -> Self {
        Self {
            encoding,
            hash,
            hex: hex::encode(hash.digest(&encoding.encode(text))),
        }
    }

    /// Verify that `text` hashes to this checksum
    pub fn verify(&self, text: &str) -> Result<()> {
        let actual = Checksum::compute(text, self.hash, self.encoding);

        if actual.hex != self.hex {
            log::debug!("checksum mismatch for {} text of {} bytes", self.encoding, text.len());
            return Err(TextError::ChecksumMismatch {
                expected: self.hex.clone(),
                actual: actual.hex,
            });
        }

        Ok(())
    }

    /// Parse a checksum object such as `{"encoding": "UTF-8", "MD5": "<hex>"}`
    ///
    /// Member names are case and dash insensitive. If several known hashes are
    /// declared, all of them are validated for shape; the first in
    /// [`HashType::ALL`] order is kept.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TextError::malformed("checksum is not an object"))?;

        let members: Map<String, Value> = object
            .iter()
            .map(|(k, v)| (normalize_key(k), v.clone()))
            .collect();

        let encoding = members
            .get("encoding")
            .and_then(Value::as_str)
            .ok_or_else(|| TextError::malformed("checksum encoding missing"))?;
        let encoding = Encoding::from_label(encoding)?;

        let mut found = None;

        for hash in HashType::ALL {
            let Some(value) = members.get(hash.label()) else {
                continue;
            };

            let hex = value
                .as_str()
                .ok_or_else(|| TextError::malformed(format!("{} digest is not a string", hash.label())))?;

            if hex.len() != 2 * hash.output_len() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(TextError::malformed(format!(
                    "{} digest must be {} hex characters",
                    hash.label(),
                    2 * hash.output_len()
                )));
            }

            if found.is_none() {
                found = Some((hash, hex.to_lowercase()));
            }
        }

        let (hash, hex) = found.ok_or_else(|| {
            let declared: Vec<_> = members.keys().filter(|k| k.as_str() != "encoding").cloned().collect();
            TextError::malformed(format!("no known hash type in checksum ({})", declared.join(", ")))
        })?;

        Ok(Self { encoding, hash, hex })
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("encoding".to_string(), Value::String(self.encoding.label().to_string()));
        object.insert(self.hash.label().to_string(), Value::String(self.hex.clone()));
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // md5("abcd")
    const ABCD_MD5: &str = "e2fc714c4727ee9395f324cd2e7f331f";

    #[test]
    fn test_md5_hex() {
        let checksum = Checksum::compute("abcd", HashType::Md5, Encoding::Utf8);
        assert_eq!(checksum.hex, ABCD_MD5);
        assert!(checksum.verify("abcd").is_ok());
        assert!(matches!(checksum.verify("abce"), Err(TextError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_digest_lengths() {
        for hash in HashType::ALL {
            assert_eq!(hash.digest(b"x").len(), hash.output_len());
        }
    }

    #[test]
    fn test_parse_is_case_and_dash_insensitive() {
        let checksum = Checksum::from_json(&json!({"Encoding": "UTF-8", "MD-5": ABCD_MD5.to_uppercase()})).unwrap();
        assert_eq!(checksum.hash, HashType::Md5);
        assert_eq!(checksum.hex, ABCD_MD5);
        assert!(checksum.verify("abcd").is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            Checksum::from_json(&json!({"md5": ABCD_MD5})),
            Err(TextError::MalformedWireObject(_))
        ));
        assert!(matches!(
            Checksum::from_json(&json!({"encoding": "utf8", "md5": "abc"})),
            Err(TextError::MalformedWireObject(_))
        ));
        assert!(matches!(
            Checksum::from_json(&json!({"encoding": "utf8", "crc32": "abcd1234"})),
            Err(TextError::MalformedWireObject(_))
        ));
        assert!(matches!(
            Checksum::from_json(&json!(["md5", ABCD_MD5])),
            Err(TextError::MalformedWireObject(_))
        ));
    }

    #[test]
    fn test_sha256_in_utf16() {
        let checksum = Checksum::compute("abcd", HashType::Sha256, Encoding::Utf16Be);
        let parsed = Checksum::from_json(&checksum.to_json()).unwrap();
        assert_eq!(parsed, checksum);
        assert!(parsed.verify("abcd").is_ok());
        assert_ne!(checksum.hex, Checksum::compute("abcd", HashType::Sha256, Encoding::Utf8).hex);
    }

    #[test]
    fn test_base64_digest_alphabet() {
        // 0xfb 0xff encodes to "+/8" in standard base64
        assert_eq!(base64_digest(&[0xfb, 0xff]), "-.8");
        assert_eq!(base64_digest(&[0u8; 16]).len(), 22);
    }
}
