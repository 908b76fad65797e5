//! Number and color formatting shared by the text formats.
//!
//! Numbers are quantized to thousandths before they are printed, and the
//! same quantized value serves as the hash key when vertices and normals are
//! deduplicated. Two values that print the same therefore always share an
//! index.

use crate::types::Color;
use glam::Vec3;

/// Steps per unit used for printing and for deduplication keys.
pub const DEDUP_SCALE: f64 = 1000.0;

/// Round half up to the nearest thousandth, as an integer count of thousandths.
pub fn quantize(value: f32) -> i64 {
    (value as f64 * DEDUP_SCALE + 0.5).floor() as i64
}

/// Quantized form of a vector; equal keys print identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quantized(pub [i64; 3]);

impl Quantized {
    pub fn of(v: Vec3) -> Self {
        Self([quantize(v.x), quantize(v.y), quantize(v.z)])
    }
}

/// Print a quantized value: `0` and `1` exactly, no leading `0.` (`.5`,
/// `-.25`), no trailing `.0`.
pub fn format_quantized(q: i64) -> String {
    match q {
        0 => "0".to_string(),
        1000 => "1".to_string(),
        _ => {
            let s = (q as f64 / DEDUP_SCALE).to_string();
            let s = s.strip_suffix(".0").map(str::to_string).unwrap_or(s);
            if let Some(rest) = s.strip_prefix("0.") {
                format!(".{}", rest)
            } else if let Some(rest) = s.strip_prefix("-0.") {
                format!("-.{}", rest)
            } else {
                s
            }
        }
    }
}

/// A number rounded to three decimals in canonical form.
pub fn round(value: f32) -> String {
    if value.is_nan() {
        return "0".to_string();
    }
    format_quantized(quantize(value))
}

/// Three rounded numbers separated by spaces.
pub fn triad(v: Vec3) -> String {
    format!("{} {} {}", round(v.x), round(v.y), round(v.z))
}

/// Same text as [`triad`] of the vector the key was taken from.
pub fn triad_quantized(q: Quantized) -> String {
    let [x, y, z] = q.0;
    format!("{} {} {}", format_quantized(x), format_quantized(y), format_quantized(z))
}

/// A color channel as a fraction: `0` stays `0`, anything else is `(c+1)/256`.
pub fn channel_fraction(c: u8) -> f32 {
    if c == 0 {
        0.0
    } else {
        (c as f32 + 1.0) / 256.0
    }
}

/// `r g b` fractions of a color, each via [`channel_fraction`].
pub fn rgb_fractional(color: Color) -> String {
    let [r, g, b] = color.channels();
    triad(Vec3::new(channel_fraction(r), channel_fraction(g), channel_fraction(b)))
}

/// Opacity from the alpha channel, with the same bias as the color channels.
pub fn opacity_fraction(color: Color) -> f32 {
    channel_fraction(color.a)
}

/// Complement of [`opacity_fraction`].
pub fn translucency_fraction(color: Color) -> f32 {
    1.0 - opacity_fraction(color)
}

/// Hex `AARRGGBB` of a color, for cache keys and node names.
pub fn color_key(color: Color) -> String {
    format!("{:08X}", color.argb())
}

/// RGB fractions followed by opacity, e.g. `1 .5 0 1`.
pub fn rgba_fractional(color: Color) -> String {
    format!("{} {}", rgb_fractional(color), round(opacity_fraction(color)))
}
