//! Error types for palette operations

use crate::color::Rgb;
use thiserror::Error;

/// Contract errors raised by palette indexing and conversion.
///
/// These are fatal to the individual call and propagate to the caller; they
/// never indicate a problem with template assets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    /// Two images that must share a size do not
    #[error("dimension mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    /// Two index sequences that must share a length do not
    #[error("index sequence length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    /// A pixel color has no entry in the target palette
    #[error("color {0} is not in the palette")]
    ColorNotInPalette(Rgb),
    /// A palette cell has no coordinate color (column or row above 255)
    #[error("palette cell ({col}, {row}) cannot be encoded as a color")]
    CoordinateOutOfRange { col: u32, row: u32 },
}
