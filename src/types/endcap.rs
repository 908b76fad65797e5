//! Cylinder end-cap styles.

use serde::{Deserialize, Serialize};

/// How the ends of a cylinder are closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endcap {
    /// No caps; the tube is seen from outside only.
    #[default]
    None,
    /// No caps, and the interior wall is drawn as well.
    Open,
    /// Flat disks at both ends.
    Flat,
    /// Hemispherical ends, realised as slightly larger spheres.
    Spherical,
}

impl Endcap {
    /// Stable numeric code used in definition keys.
    pub fn code(&self) -> u8 {
        match self {
            Endcap::None => 0,
            Endcap::Open => 1,
            Endcap::Flat => 2,
            Endcap::Spherical => 3,
        }
    }

    /// The style the cylinder body keeps once spherical ends have been
    /// split off into separate spheres.
    pub fn body(&self) -> Endcap {
        match self {
            Endcap::Spherical => Endcap::None,
            other => *other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [Endcap::None, Endcap::Open, Endcap::Flat, Endcap::Spherical].map(|e| e.code());
        for i in 0..codes.len() {
            for j in i + 1..codes.len() {
                assert_ne!(codes[i], codes[j]);
            }
        }
    }

    #[test]
    fn test_body_drops_spherical() {
        assert_eq!(Endcap::Spherical.body(), Endcap::None);
        assert_eq!(Endcap::Flat.body(), Endcap::Flat);
    }

    #[test]
    fn test_serde_lowercase() {
        let e: Endcap = serde_json::from_str("\"spherical\"").unwrap();
        assert_eq!(e, Endcap::Spherical);
    }
}
