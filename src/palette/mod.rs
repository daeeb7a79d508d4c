//! Palette indexing and color conversion
//!
//! Extracts palettes from pixel buffers, builds frequency-ordered canonical
//! indices, compares index patterns and remaps colors between palettes.

pub mod combat;
pub mod convert;
pub mod data;
pub mod error;
pub mod extract;

pub use combat::{CombatPalette, PaletteCoord, PaletteEntry, PALETTE_WIDTH};
pub use convert::{
    convert_colorkey_to_alpha, convert_colorkey_to_alpha_with, convert_colors,
    convert_colors_with, invert_map, ColorMap, ConversionPath, FAST_PATH_MAX_COLORS,
};
pub use data::{exact_similarity, palette_similarity, PaletteData, SimilarityMode};
pub use error::PaletteError;
pub use extract::{color_frequencies, extract_full_palette, extract_unique_palette, frequency_sorted};
