//! Offset-indexed text annotation store
//!
//! Tags (`namespace`, `id`, code-point offsets) are attached to an immutable
//! text, kept in Key order per namespace, and round-tripped through JSON,
//! wire documents and nested markup. Offsets translate to UTF-8, UTF-16 and
//! UTF-32 byte positions. The `api` module exposes a WASM surface.

pub mod api;
pub mod config;
pub mod converters;
pub mod error;
pub mod models;
pub mod renderers;
pub mod text;

// Re-export commonly used types
pub use config::MarkupOptions;
pub use error::{Result, TextError};
pub use models::{Attributes, Offsets, Tag};
pub use text::{AnnotatedText, Containment, Encoding, HashType, OffsetCodec, TagOrder};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Debug) {
            log::warn!("logger already initialized: {}", e);
        }
    }

    log::info!("Annotated text WASM module initialized");
}
