//! Packed RGB color keys
//!
//! Every palette operation in this crate keys colors by exact RGB equality.
//! [`Rgb`] packs the three 8-bit channels into a single `u32` laid out as
//! `0x00RRGGBB`: red in bits 16..24, green in bits 8..16, blue in bits 0..8.
//! Alpha is never part of the key.
//!
//! Hex strings are accepted in `#RGB` and `#RRGGBB` form.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Input string doesn't start with '#'
    #[error("color must start with '#'")]
    MissingHash,
    /// Invalid length (must be 3 or 6 hex chars after #)
    #[error("invalid color length {0}, expected 3 or 6")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

/// An RGB color packed as `0x00RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb(u32);

impl Rgb {
    /// Pure black, the conventional colorkey.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Build from a packed `0x00RRGGBB` value. The top byte is discarded.
    pub const fn from_packed(packed: u32) -> Self {
        Self(packed & 0x00FF_FFFF)
    }

    pub const fn packed(self) -> u32 {
        self.0
    }

    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    /// Color key of a pixel, ignoring alpha.
    pub fn of(pixel: &Rgba<u8>) -> Self {
        Self::new(pixel[0], pixel[1], pixel[2])
    }

    /// Expand to an RGBA pixel with the given alpha.
    pub fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r(), self.g(), self.b(), alpha])
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r(), self.g(), self.b())
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_color(&s)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

/// Parse a hex color string into a packed [`Rgb`].
///
/// # Examples
///
/// ```
/// use tileforge::color::{parse_color, Rgb};
///
/// assert_eq!(parse_color("#F00").unwrap(), Rgb::new(255, 0, 0));
/// assert_eq!(parse_color("#0a0b0c").unwrap(), Rgb::new(10, 11, 12));
/// ```
///
/// # Errors
///
/// Returns `ColorError` if the input is empty, lacks the leading `#`, has the
/// wrong length, or contains non-hex characters.
pub fn parse_color(s: &str) -> Result<Rgb, ColorError> {
    if s.is_empty() {
        return Err(ColorError::Empty);
    }
    let hex = s.strip_prefix('#').ok_or(ColorError::MissingHash)?;

    let mut digits = Vec::with_capacity(hex.len());
    for c in hex.chars() {
        digits.push(c.to_digit(16).ok_or(ColorError::InvalidHex(c))? as u8);
    }

    match digits.as_slice() {
        // #RGB -> #RRGGBB (doubled digits)
        [r, g, b] => Ok(Rgb::new(r * 17, g * 17, b * 17)),
        [r1, r0, g1, g0, b1, b0] => Ok(Rgb::new(r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0)),
        _ => Err(ColorError::InvalidLength(digits.len())),
    }
}
