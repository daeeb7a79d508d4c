//! Canonical palette snapshots and index-pattern similarity.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::PaletteError;
use super::extract::{extract_full_palette, frequency_sorted};
use crate::color::Rgb;

/// How two index patterns are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMode {
    /// Number of positions where the index sequences disagree
    #[default]
    Positional,
    /// 0 for identical sequences, otherwise the sequence length
    Exact,
}

/// Indexed snapshot of one image.
///
/// Holds the source pixels, the per-pixel color list, the frequency-sorted
/// unique colors and the per-pixel index into that list. Read-only once
/// built.
#[derive(Debug, Clone)]
pub struct PaletteData {
    image: RgbaImage,
    full: Vec<Rgb>,
    unique: Vec<Rgb>,
    palette: Vec<u32>,
    positions: HashMap<Rgb, u32>,
}

impl PaletteData {
    /// Build the canonical index for `image`.
    pub fn new(image: RgbaImage) -> Self {
        let full = extract_full_palette(&image);
        let unique = frequency_sorted(&full);
        let positions: HashMap<Rgb, u32> =
            unique.iter().enumerate().map(|(i, color)| (*color, i as u32)).collect();
        let palette = full.iter().map(|color| positions[color]).collect();

        Self { image, full, unique, palette, positions }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel_count(&self) -> usize {
        self.palette.len()
    }

    /// Per-pixel colors in raster order.
    pub fn full_palette(&self) -> &[Rgb] {
        &self.full
    }

    /// Distinct colors, most frequent first.
    pub fn unique_colors(&self) -> &[Rgb] {
        &self.unique
    }

    /// Per-pixel positions into [`unique_colors`](Self::unique_colors).
    pub fn palette(&self) -> &[u32] {
        &self.palette
    }

    pub fn color_count(&self) -> usize {
        self.unique.len()
    }

    /// Solid or empty images carry no shape and are never matched.
    pub fn is_degenerate(&self) -> bool {
        self.unique.len() < 2
    }

    /// Canonical index of `color`, if present.
    pub fn position_of(&self, color: Rgb) -> Option<usize> {
        self.positions.get(&color).map(|&i| i as usize)
    }

    /// Similarity against another snapshot of the same size.
    pub fn distance(&self, other: &PaletteData, mode: SimilarityMode) -> Result<u32, PaletteError> {
        if self.image.dimensions() != other.image.dimensions() {
            return Err(PaletteError::DimensionMismatch {
                expected_width: self.width(),
                expected_height: self.height(),
                actual_width: other.width(),
                actual_height: other.height(),
            });
        }
        match mode {
            SimilarityMode::Positional => palette_similarity(&self.palette, &other.palette),
            SimilarityMode::Exact => Ok(exact_similarity(&self.palette, &other.palette)),
        }
    }
}

/// Count of positions where two index sequences differ.
///
/// 0 means identical patterns. Sequences of different length are rejected.
pub fn palette_similarity(a: &[u32], b: &[u32]) -> Result<u32, PaletteError> {
    if a.len() != b.len() {
        return Err(PaletteError::LengthMismatch { left: a.len(), right: b.len() });
    }
    Ok(a.iter().zip(b).filter(|(x, y)| x != y).count() as u32)
}

/// Fast variant: 0 when the sequences are identical, otherwise the maximal
/// distance (the longer sequence's length).
pub fn exact_similarity(a: &[u32], b: &[u32]) -> u32 {
    if a == b {
        0
    } else {
        a.len().max(b.len()) as u32
    }
}
