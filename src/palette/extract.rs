//! Raw palette extraction from pixel buffers.
//!
//! All scans are row-major (the order of [`RgbaImage::pixels`]).

use image::RgbaImage;
use std::collections::{HashMap, HashSet};

use crate::color::Rgb;

/// Distinct colors of `image` in first-encounter order.
pub fn extract_unique_palette(image: &RgbaImage) -> Vec<Rgb> {
    let mut seen = HashSet::new();
    image.pixels().map(Rgb::of).filter(|color| seen.insert(*color)).collect()
}

/// One color per pixel, no deduplication. Length is `width * height`.
pub fn extract_full_palette(image: &RgbaImage) -> Vec<Rgb> {
    image.pixels().map(Rgb::of).collect()
}

/// Count occurrences of each color, keeping first-encounter order.
pub fn color_frequencies(colors: &[Rgb]) -> Vec<(Rgb, usize)> {
    let mut slots: HashMap<Rgb, usize> = HashMap::new();
    let mut counts: Vec<(Rgb, usize)> = Vec::new();

    for &color in colors {
        match slots.get(&color) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(color, counts.len());
                counts.push((color, 1));
            }
        }
    }

    counts
}

/// Distinct colors sorted by descending frequency.
///
/// The sort is stable, so colors with equal counts stay in first-encounter
/// order.
pub fn frequency_sorted(colors: &[Rgb]) -> Vec<Rgb> {
    let mut counts = color_frequencies(colors);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(color, _)| color).collect()
}
