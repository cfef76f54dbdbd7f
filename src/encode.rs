//! Hex encoding of cluster centroids.

use crate::cluster::ColorCluster;
use palette::Srgb;

/// Encode a `[0, 1]` RGB color as `#rrggbb`.
///
/// Channels are rounded to the nearest integer and clamped, so small
/// overshoots from clustering never wrap.
pub fn encode_hex(color: &Srgb<f32>) -> String {
    let [r, g, b] = [color.red, color.green, color.blue].map(to_channel);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Encode every centroid, preserving order.
pub fn encode_all(clusters: &[ColorCluster]) -> Vec<String> {
    clusters.iter().map(|c| encode_hex(&c.centroid)).collect()
}

// `as u8` maps NaN to 0.
fn to_channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Whether `s` is exactly `#` followed by six lowercase hex digits.
pub fn is_hex_color(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 7
        && bytes[0] == b'#'
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
}
