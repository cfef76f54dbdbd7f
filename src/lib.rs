//! Dominant color extraction.
//!
//! An encoded image is decoded, reduced to RGB, shrunk so its longest side is
//! at most 150 pixels, clustered with k-means, and returned as `#rrggbb`
//! strings in clustering order.
//!
//! ```rust,no_run
//! let bytes = std::fs::read("photo.jpg")?;
//! let colors = dominant_colors::extract_dominant_colors(&bytes, 5)?;
//! println!("{colors:?}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use js_sys::Array;
use wasm_bindgen::prelude::*;

pub mod cluster;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod events;
pub mod extractor;
#[cfg(not(target_arch = "wasm32"))]
pub mod stream;

pub use cluster::{ColorCluster, MAX_COLORS};
pub use config::{ClusterParams, ConfigError, ExtractorConfig};
pub use decode::PixelMatrix;
pub use encode::{encode_hex, is_hex_color};
pub use error::{ClusterError, ExtractError, ImageProcessingError, Result};
pub use events::{EventSink, ExtractionEvent, MemorySink, NullSink, TracingSink};
pub use extractor::{
    BATCH_NUM_COLORS, ColorExtractor, STREAM_NUM_COLORS, extract_dominant_colors,
};

/// Extract `n_colors` dominant colors from an encoded image.
///
/// Returns an array of `#rrggbb` strings. Rejected input throws a string
/// describing the problem; internal failures throw a generic message.
#[wasm_bindgen(js_name = extractColors)]
pub fn extract_colors(input: Vec<u8>, n_colors: usize) -> std::result::Result<Array, JsValue> {
    let extractor = ColorExtractor::new(ExtractorConfig::default(), std::sync::Arc::new(NullSink));
    let colors = extractor
        .extract(&input, n_colors)
        .map_err(|e| JsValue::from_str(&e.client_message()))?;

    let result = Array::new();
    for hex in colors {
        result.push(&JsValue::from_str(&hex));
    }
    Ok(result)
}
