//! Resolved colors.
//!
//! The host resolves its palette indices before handing commands over, so a
//! `Color` is always a concrete RGB triple plus an 8-bit alpha.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An RGB color with alpha (255 = opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack a 0xAARRGGBB value.
    pub const fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    pub const fn argb(&self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// `RRGGBB` in upper-case hex, used for material names.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Per-channel average of several colors; alpha is taken from the first.
    pub fn average(colors: &[Color]) -> Option<Color> {
        let first = colors.first()?;
        let n = colors.len() as u32;
        let mut sum = [0u32; 3];
        for c in colors {
            sum[0] += c.r as u32;
            sum[1] += c.g as u32;
            sum[2] += c.b as u32;
        }
        Some(Color::rgba(
            (sum[0] / n) as u8,
            (sum[1] / n) as u8,
            (sum[2] / n) as u8,
            first.a,
        ))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "#{}", self.hex())
        } else {
            write!(f, "#{:02X}{}", self.a, self.hex())
        }
    }
}

impl FromStr for Color {
    type Err = String;

    /// Accepts `#RRGGBB` or `#AARRGGBB` (the `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let value = u32::from_str_radix(hex, 16)
            .map_err(|_| format!("Invalid color: '{}'", s))?;
        match hex.len() {
            6 => Ok(Color::from_argb(0xFF00_0000 | value)),
            8 => Ok(Color::from_argb(value)),
            _ => Err(format!("Invalid color: '{}'. Use #RRGGBB or #AARRGGBB", s)),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb_is_opaque() {
        let c: Color = "#FF0000".parse().unwrap();
        assert_eq!(c, Color::rgb(255, 0, 0));
        assert!(c.is_opaque());
    }

    #[test]
    fn test_parse_argb() {
        let c: Color = "80102030".parse().unwrap();
        assert_eq!(c, Color::rgba(0x10, 0x20, 0x30, 0x80));
        assert_eq!(c.to_string(), "#80102030");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("red".parse::<Color>().is_err());
    }

    #[test]
    fn test_argb_round_trip() {
        let c = Color::from_argb(0x7F_12_34_56);
        assert_eq!(c.argb(), 0x7F_12_34_56);
    }

    #[test]
    fn test_average() {
        let avg = Color::average(&[Color::rgb(0, 0, 0), Color::rgb(200, 100, 50)]).unwrap();
        assert_eq!(avg, Color::rgb(100, 50, 25));
        assert!(Color::average(&[]).is_none());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(0, 128, 255)).unwrap();
        assert_eq!(json, "\"#0080FF\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(0, 128, 255));
    }
}
