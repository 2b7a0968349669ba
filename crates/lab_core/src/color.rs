//! Six-digit hex colors and volumetric color blending.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Substituted for a missing or unparsable side of a blend.
pub const BLEND_FALLBACK: Rgb = Rgb::new(0x88, 0x88, 0x88);

/// Color given to contents whose chemical record carries none.
pub const DEFAULT_CONTENTS_COLOR: Rgb = Rgb::new(0x4f, 0x46, 0xe5);

/// One byte per channel. Serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl std::fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not a 6-digit hex color: {:?}", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Rgb {
    type Err = ColorParseError;

    /// Accepts `#rrggbb` or `rrggbb`, either case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError(raw.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| ColorParseError(raw.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// Per-channel integer average (rounding down). A missing side counts as
/// [`BLEND_FALLBACK`].
pub fn blend(a: Option<Rgb>, b: Option<Rgb>) -> Rgb {
    let a = a.unwrap_or(BLEND_FALLBACK);
    let b = b.unwrap_or(BLEND_FALLBACK);
    Rgb::new(
        average(a.r, b.r),
        average(a.g, b.g),
        average(a.b, b.b),
    )
}

/// String form of [`blend`]; unparsable input is treated as missing.
pub fn blend_hex(a: Option<&str>, b: Option<&str>) -> String {
    let parse = |raw: Option<&str>| raw.and_then(|hex| hex.parse::<Rgb>().ok());
    blend(parse(a), parse(b)).to_string()
}

fn average(x: u8, y: u8) -> u8 {
    // (x + y) / 2 without widening.
    (x >> 1) + (y >> 1) + (x & y & 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn parses_with_and_without_hash() {
        assert_eq!("#2563eb".parse::<Rgb>(), Ok(Rgb::new(0x25, 0x63, 0xeb)));
        assert_eq!("B45309".parse::<Rgb>(), Ok(Rgb::new(0xb4, 0x53, 0x09)));
    }

    #[test]
    fn rejects_short_and_non_hex() {
        assert!("#abc".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
        assert!("".parse::<Rgb>().is_err());
        assert!("#1234567".parse::<Rgb>().is_err());
    }

    #[test]
    fn displays_lowercase_two_digit_channels() {
        assert_eq!(Rgb::new(1, 0xab, 0).to_string(), "#01ab00");
    }

    #[test]
    fn serde_uses_hex_string() {
        let json = serde_json::to_string(&Rgb::new(0x7c, 0x3a, 0xed)).unwrap();
        assert_eq!(json, "\"#7c3aed\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(0x7c, 0x3a, 0xed));
        assert!(serde_json::from_str::<Rgb>("\"purple\"").is_err());
    }

    #[test]
    fn blend_averages_each_channel_rounding_down() {
        let mixed = blend(Some(Rgb::new(0, 0, 255)), Some(Rgb::new(255, 0, 0)));
        assert_eq!(mixed, Rgb::new(127, 0, 127));
    }

    #[test]
    fn blend_treats_missing_side_as_mid_gray() {
        assert_eq!(blend_hex(None, Some("#112233")), "#4c555d");
        assert_eq!(
            blend(None, Some(Rgb::new(0x11, 0x22, 0x33))),
            blend(Some(BLEND_FALLBACK), Some(Rgb::new(0x11, 0x22, 0x33)))
        );
    }

    #[test]
    fn blend_treats_invalid_hex_as_mid_gray() {
        assert_eq!(blend_hex(Some("not-a-color"), Some("#888888")), "#888888");
    }

    #[test]
    fn blend_is_symmetric_within_one_per_channel() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..2_000 {
            let x = Rgb::new(rng.gen(), rng.gen(), rng.gen());
            let y = Rgb::new(rng.gen(), rng.gen(), rng.gen());
            let xy = blend(Some(x), Some(y));
            let yx = blend(Some(y), Some(x));
            assert!(xy.r.abs_diff(yx.r) <= 1, "{x} {y}");
            assert!(xy.g.abs_diff(yx.g) <= 1, "{x} {y}");
            assert!(xy.b.abs_diff(yx.b) <= 1, "{x} {y}");
        }
    }

    #[test]
    fn average_matches_widened_division() {
        for x in 0..=255u8 {
            for y in 0..=255u8 {
                let expected = u8::try_from((u16::from(x) + u16::from(y)) / 2).unwrap();
                assert_eq!(average(x, y), expected);
            }
        }
    }
}
