//! Color conversion over pixel buffers.
//!
//! Two code paths produce bit-identical results:
//! - **Index table**: when an image has at most [`FAST_PATH_MAX_COLORS`]
//!   distinct colors, the pixels are indexed once, only the color table is
//!   rewritten, and the output is expanded from the table.
//! - **Per pixel**: every pixel is looked up individually.
//!
//! The choice is purely a performance concern. Inputs are never mutated; a
//! recolored copy is returned.

use image::{Rgba, RgbaImage};
use std::collections::HashMap;

use crate::color::Rgb;

/// Largest number of distinct colors handled by the index-table path.
pub const FAST_PATH_MAX_COLORS: usize = 192;

/// Old color to new color.
pub type ColorMap = HashMap<Rgb, Rgb>;

/// Which conversion path to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionPath {
    /// Index table when the image is small enough, otherwise per pixel
    #[default]
    Auto,
    /// Force the index table; falls back to per pixel above the color limit
    IndexTable,
    /// Force the per-pixel scan
    PerPixel,
}

/// Replacement for one source color.
#[derive(Debug, Clone, Copy)]
struct Remap {
    color: Rgb,
    /// `None` keeps the source pixel's alpha
    alpha: Option<u8>,
}

impl Remap {
    fn apply(self, pixel: &Rgba<u8>) -> Rgba<u8> {
        self.color.with_alpha(self.alpha.unwrap_or(pixel[3]))
    }
}

/// Replace every pixel whose color is a key of `map`.
///
/// Colors absent from the map pass through unchanged. Alpha is preserved.
pub fn convert_colors(image: &RgbaImage, map: &ColorMap) -> RgbaImage {
    convert_colors_with(image, map, ConversionPath::Auto)
}

/// [`convert_colors`] with an explicit path choice.
pub fn convert_colors_with(image: &RgbaImage, map: &ColorMap, path: ConversionPath) -> RgbaImage {
    if map.is_empty() {
        return image.clone();
    }
    remap_image(image, path, |color| Remap {
        color: map.get(&color).copied().unwrap_or(color),
        alpha: None,
    })
}

/// Make every pixel of `colorkey` fully transparent and everything else
/// fully opaque. RGB values are kept.
pub fn convert_colorkey_to_alpha(image: &RgbaImage, colorkey: Rgb) -> RgbaImage {
    convert_colorkey_to_alpha_with(image, colorkey, ConversionPath::Auto)
}

/// [`convert_colorkey_to_alpha`] with an explicit path choice.
pub fn convert_colorkey_to_alpha_with(
    image: &RgbaImage,
    colorkey: Rgb,
    path: ConversionPath,
) -> RgbaImage {
    remap_image(image, path, |color| Remap {
        color,
        alpha: Some(if color == colorkey { 0 } else { 255 }),
    })
}

/// Inverse of a color map, or `None` if two keys map to the same color.
pub fn invert_map(map: &ColorMap) -> Option<ColorMap> {
    let mut inverse = ColorMap::with_capacity(map.len());
    for (&from, &to) in map {
        if inverse.insert(to, from).is_some() {
            return None;
        }
    }
    Some(inverse)
}

fn remap_image<F>(image: &RgbaImage, path: ConversionPath, remap: F) -> RgbaImage
where
    F: Fn(Rgb) -> Remap,
{
    if path == ConversionPath::PerPixel {
        return remap_per_pixel(image, &remap);
    }
    match index_table(image) {
        Some((table, indices)) => remap_via_table(image, &table, &indices, &remap),
        None => {
            log::trace!(
                "{}x{} image exceeds {} colors, converting per pixel",
                image.width(),
                image.height(),
                FAST_PATH_MAX_COLORS
            );
            remap_per_pixel(image, &remap)
        }
    }
}

/// Index the image's colors, giving up past the fast-path limit.
fn index_table(image: &RgbaImage) -> Option<(Vec<Rgb>, Vec<u8>)> {
    let mut slots: HashMap<Rgb, u8> = HashMap::new();
    let mut table: Vec<Rgb> = Vec::new();
    let mut indices = Vec::with_capacity((image.width() * image.height()) as usize);

    for pixel in image.pixels() {
        let color = Rgb::of(pixel);
        let slot = match slots.get(&color) {
            Some(&slot) => slot,
            None => {
                if table.len() == FAST_PATH_MAX_COLORS {
                    return None;
                }
                let slot = table.len() as u8;
                slots.insert(color, slot);
                table.push(color);
                slot
            }
        };
        indices.push(slot);
    }

    Some((table, indices))
}

fn remap_via_table<F>(image: &RgbaImage, table: &[Rgb], indices: &[u8], remap: &F) -> RgbaImage
where
    F: Fn(Rgb) -> Remap,
{
    let rewritten: Vec<Remap> = table.iter().map(|&color| remap(color)).collect();
    let mut out = image.clone();
    for (pixel, &slot) in out.pixels_mut().zip(indices) {
        *pixel = rewritten[slot as usize].apply(pixel);
    }
    out
}

fn remap_per_pixel<F>(image: &RgbaImage, remap: &F) -> RgbaImage
where
    F: Fn(Rgb) -> Remap,
{
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = remap(Rgb::of(pixel)).apply(pixel);
    }
    out
}
