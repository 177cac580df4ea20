//! Text core: offsets, indices and the annotated text container
//!
//! ## Modules
//!
//! - `codec`: code-point offsets to byte offsets for UTF-8/16/32 and back
//! - `index`: per-namespace ordered tag index (Key and ReverseKey orders)
//! - `annotated`: the annotated text container
//! - `digest`: checksums of the encoded text

pub mod annotated;
pub mod codec;
pub mod digest;
pub mod index;

// Re-exports for convenience
pub use annotated::{AnnotatedText, CharQuery, TagOrder, Token};
pub use codec::{check_map, offset_map, Encoding, OffsetCodec};
pub use digest::{Checksum, HashType};
pub use index::{Containment, OrderedTagIndex};
