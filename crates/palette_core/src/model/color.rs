//! Hex color codes: generation, validation and parsing.
//!
//! # Invariants
//! - Generated codes are `#` followed by six uppercase hex digits.
//! - Parsing never panics; malformed input yields `HexParseError`.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
const HEX_CODE_DIGITS: usize = 6;

static HEX_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex code regex"));

/// Returns a uniformly random `#RRGGBB` code using uppercase digits.
pub fn random_hex() -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(1 + HEX_CODE_DIGITS);
    code.push('#');
    for _ in 0..HEX_CODE_DIGITS {
        code.push(char::from(HEX_DIGITS[rng.random_range(0..HEX_DIGITS.len())]));
    }
    code
}

/// Returns whether `value` is a storable hex code (`#` + 6 hex digits).
pub fn is_valid_hex(value: &str) -> bool {
    HEX_CODE_RE.is_match(value)
}

/// Failure to interpret a string as a 24-bit color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexParseError {
    /// Digit count after stripping `#` was not six.
    InvalidLength(usize),
    /// A non-hex character was found.
    InvalidDigit(char),
}

impl Display for HexParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLength(len) => {
                write!(f, "expected {HEX_CODE_DIGITS} hex digits, found {len}")
            }
            Self::InvalidDigit(ch) => write!(f, "invalid hex digit `{ch}`"),
        }
    }
}

impl Error for HexParseError {}

/// 24-bit RGB color decoded from a hex code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// Parses `#RRGGBB` or `RRGGBB`, digits in either case.
    pub fn from_hex(value: &str) -> Result<Self, HexParseError> {
        let digits = value.strip_prefix('#').unwrap_or(value);
        let count = digits.chars().count();
        if count != HEX_CODE_DIGITS {
            return Err(HexParseError::InvalidLength(count));
        }
        if let Some(bad) = digits.chars().find(|ch| !ch.is_ascii_hexdigit()) {
            return Err(HexParseError::InvalidDigit(bad));
        }

        let packed = u32::from_str_radix(digits, 16)
            .map_err(|_| HexParseError::InvalidLength(count))?;
        Ok(Self {
            red: ((packed >> 16) & 0xff) as u8,
            green: ((packed >> 8) & 0xff) as u8,
            blue: (packed & 0xff) as u8,
        })
    }

    /// Components scaled to `0.0..=1.0`, in red/green/blue order.
    pub fn as_unit_floats(&self) -> [f64; 3] {
        [
            f64::from(self.red) / 255.0,
            f64::from(self.green) / 255.0,
            f64::from(self.blue) / 255.0,
        ]
    }

    /// Formats as uppercase `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_hex, random_hex, HexParseError, Rgb};

    #[test]
    fn random_hex_is_hash_plus_six_uppercase_digits() {
        for _ in 0..200 {
            let code = random_hex();
            assert_eq!(code.len(), 7);
            assert!(code.starts_with('#'));
            assert!(code[1..]
                .chars()
                .all(|ch| ch.is_ascii_digit() || ('A'..='F').contains(&ch)));
        }
    }

    #[test]
    fn random_hex_varies_between_calls() {
        let codes: std::collections::HashSet<String> = (0..50).map(|_| random_hex()).collect();
        assert!(codes.len() > 1);
    }

    #[test]
    fn is_valid_hex_requires_hash_prefix_and_six_digits() {
        assert!(is_valid_hex("#A1B2C3"));
        assert!(is_valid_hex("#a1b2c3"));
        assert!(!is_valid_hex("A1B2C3"));
        assert!(!is_valid_hex("#A1B2C"));
        assert!(!is_valid_hex("#A1B2C3D"));
        assert!(!is_valid_hex("#G1B2C3"));
    }

    #[test]
    fn from_hex_decodes_components() {
        let rgb = Rgb::from_hex("#FF8000").unwrap();
        assert_eq!(
            rgb,
            Rgb {
                red: 255,
                green: 128,
                blue: 0
            }
        );
        assert_eq!(Rgb::from_hex("ff8000").unwrap(), rgb);
        assert_eq!(rgb.to_hex(), "#FF8000");

        let [red, green, blue] = rgb.as_unit_floats();
        assert_eq!(red, 1.0);
        assert!((green - 128.0 / 255.0).abs() < f64::EPSILON);
        assert_eq!(blue, 0.0);
    }

    #[test]
    fn from_hex_rejects_malformed_input() {
        assert_eq!(Rgb::from_hex("#FFF"), Err(HexParseError::InvalidLength(3)));
        assert_eq!(Rgb::from_hex(""), Err(HexParseError::InvalidLength(0)));
        assert_eq!(
            Rgb::from_hex("#12345Z"),
            Err(HexParseError::InvalidDigit('Z'))
        );
        assert_eq!(Rgb::from_hex("#+12345"), Err(HexParseError::InvalidDigit('+')));
    }
}
