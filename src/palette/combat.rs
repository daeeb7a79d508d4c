//! Sparse coordinate palettes for combat animations.
//!
//! A combat palette places colors on a grid [`PALETTE_WIDTH`] columns wide.
//! Animation frames are stored as "coordinate images" where each pixel is
//! `(0, col, row)`, so one set of frames can be shown with any palette that
//! fills the same coordinates.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::convert::{convert_colors, ColorMap};
use super::error::PaletteError;
use super::extract::extract_unique_palette;
use crate::color::Rgb;

/// Number of columns in a combat palette grid.
pub const PALETTE_WIDTH: u32 = 8;

/// A cell on the palette grid.
///
/// Ordered row first so iteration walks the grid in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaletteCoord {
    pub row: u32,
    pub col: u32,
}

impl PaletteCoord {
    pub fn new(col: u32, row: u32) -> Self {
        Self { row, col }
    }

    /// Grid cell of the `index`-th palette entry.
    pub fn from_index(index: usize) -> Self {
        let index = index as u32;
        Self::new(index % PALETTE_WIDTH, index / PALETTE_WIDTH)
    }

    /// The color that stands for this cell in a coordinate image.
    ///
    /// `None` when the column or row does not fit in a color channel.
    pub fn as_color(self) -> Option<Rgb> {
        let col = u8::try_from(self.col).ok()?;
        let row = u8::try_from(self.row).ok()?;
        Some(Rgb::new(0, col, row))
    }
}

/// One persisted palette entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub col: u32,
    pub row: u32,
    pub color: Rgb,
}

/// Explicit `(col, row) -> color` palette.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PaletteEntry>", into = "Vec<PaletteEntry>")]
pub struct CombatPalette {
    colors: BTreeMap<PaletteCoord, Rgb>,
}

impl CombatPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay `colors` out across the grid in order.
    pub fn from_colors(colors: &[Rgb]) -> Self {
        let colors = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| (PaletteCoord::from_index(i), color))
            .collect();
        Self { colors }
    }

    /// Palette of an image's colors in first-encounter order.
    pub fn from_image(image: &RgbaImage) -> Self {
        Self::from_colors(&extract_unique_palette(image))
    }

    pub fn get(&self, coord: PaletteCoord) -> Option<Rgb> {
        self.colors.get(&coord).copied()
    }

    pub fn insert(&mut self, coord: PaletteCoord, color: Rgb) -> Option<Rgb> {
        self.colors.insert(coord, color)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PaletteCoord, Rgb)> + '_ {
        self.colors.iter().map(|(&coord, &color)| (coord, color))
    }

    /// First cell (in reading order) holding `color`.
    pub fn coord_of(&self, color: Rgb) -> Option<PaletteCoord> {
        self.iter().find(|(_, c)| *c == color).map(|(coord, _)| coord)
    }

    /// Replace real colors with coordinate colors.
    ///
    /// Fails if a color is missing from the palette or its cell lies beyond
    /// row or column 255, which a coordinate image cannot express.
    pub fn encode_image(&self, image: &RgbaImage) -> Result<RgbaImage, PaletteError> {
        let mut coords: HashMap<Rgb, PaletteCoord> = HashMap::with_capacity(self.len());
        for (coord, color) in self.iter() {
            coords.entry(color).or_insert(coord);
        }

        let mut map = ColorMap::new();
        for color in extract_unique_palette(image) {
            let coord = *coords.get(&color).ok_or(PaletteError::ColorNotInPalette(color))?;
            let encoded = coord
                .as_color()
                .ok_or(PaletteError::CoordinateOutOfRange { col: coord.col, row: coord.row })?;
            map.insert(color, encoded);
        }
        Ok(convert_colors(image, &map))
    }

    /// Replace coordinate colors with this palette's colors.
    ///
    /// Pixels that do not name a filled cell pass through. Cells beyond row
    /// or column 255 have no coordinate color and are never decoded.
    pub fn decode_image(&self, image: &RgbaImage) -> RgbaImage {
        let map: ColorMap = self
            .iter()
            .filter_map(|(coord, color)| coord.as_color().map(|encoded| (encoded, color)))
            .collect();
        convert_colors(image, &map)
    }

    /// Map each of this palette's colors to the target's color at the same
    /// cell.
    ///
    /// When a color occupies several cells the first one wins.
    pub fn remap_to(&self, target: &CombatPalette) -> ColorMap {
        let mut map = ColorMap::new();
        for (coord, color) in self.iter() {
            if let Some(replacement) = target.get(coord) {
                map.entry(color).or_insert(replacement);
            }
        }
        map
    }
}

impl From<Vec<PaletteEntry>> for CombatPalette {
    fn from(entries: Vec<PaletteEntry>) -> Self {
        let colors = entries
            .into_iter()
            .map(|e| (PaletteCoord::new(e.col, e.row), e.color))
            .collect();
        Self { colors }
    }
}

impl From<CombatPalette> for Vec<PaletteEntry> {
    fn from(palette: CombatPalette) -> Self {
        palette
            .iter()
            .map(|(coord, color)| PaletteEntry { col: coord.col, row: coord.row, color })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(10, 1, |x, _| Rgba([x as u8 * 20, 5, 5, 255]))
    }

    #[test]
    fn test_from_colors_wraps_at_width() {
        let colors: Vec<Rgb> = (0..10).map(|i| Rgb::new(i, 0, 0)).collect();
        let palette = CombatPalette::from_colors(&colors);
        assert_eq!(palette.len(), 10);
        assert_eq!(palette.get(PaletteCoord::new(7, 0)), Some(Rgb::new(7, 0, 0)));
        assert_eq!(palette.get(PaletteCoord::new(0, 1)), Some(Rgb::new(8, 0, 0)));
        assert_eq!(palette.get(PaletteCoord::new(2, 1)), None);
    }

    #[test]
    fn test_encode_decode_restores_image() {
        let image = sample();
        let palette = CombatPalette::from_image(&image);
        let encoded = palette.encode_image(&image).unwrap();

        assert_eq!(*encoded.get_pixel(9, 0), Rgba([0, 1, 1, 255]));
        assert_eq!(palette.decode_image(&encoded), image);
    }

    #[test]
    fn test_encode_rejects_unknown_color() {
        let palette = CombatPalette::from_colors(&[Rgb::new(1, 1, 1)]);
        let image = RgbaImage::from_pixel(1, 1, Rgba([2, 2, 2, 255]));
        assert_eq!(
            palette.encode_image(&image),
            Err(PaletteError::ColorNotInPalette(Rgb::new(2, 2, 2)))
        );
    }

    #[test]
    fn test_encode_rejects_rows_past_255() {
        let colors: Vec<Rgb> = (0..2049u32).map(|i| Rgb::from_packed(i + 1)).collect();
        let palette = CombatPalette::from_colors(&colors);
        let last = PaletteCoord::from_index(2048);
        assert_eq!(last, PaletteCoord::new(0, 256));
        assert_eq!(last.as_color(), None);
        assert_eq!(PaletteCoord::from_index(2047).as_color(), Some(Rgb::new(0, 7, 255)));

        let image = RgbaImage::from_pixel(1, 1, Rgb::from_packed(2049).with_alpha(255));
        assert_eq!(
            palette.encode_image(&image),
            Err(PaletteError::CoordinateOutOfRange { col: 0, row: 256 })
        );

        // Row 0 must not pick up the wrapped row 256 entry.
        let coded = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let decoded = palette.decode_image(&coded);
        assert_eq!(*decoded.get_pixel(0, 0), Rgb::from_packed(1).with_alpha(255));
    }

    #[test]
    fn test_encode_large_palette_uses_first_cell() {
        let mut colors: Vec<Rgb> = (0..1500u32).map(|i| Rgb::from_packed(i * 7 + 3)).collect();
        colors.push(Rgb::from_packed(3));
        let palette = CombatPalette::from_colors(&colors);
        let image =
            RgbaImage::from_fn(50, 30, |x, y| colors[(y * 50 + x) as usize].with_alpha(255));

        let encoded = palette.encode_image(&image).unwrap();
        assert_eq!(*encoded.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*encoded.get_pixel(9, 0), Rgba([0, 1, 1, 255]));
        assert_eq!(palette.decode_image(&encoded), image);
    }

    #[test]
    fn test_remap_between_palettes() {
        let image = sample();
        let source = CombatPalette::from_image(&image);
        let colors: Vec<Rgb> = (0..10).map(|i| Rgb::new(0, 0, 100 + i)).collect();
        let target = CombatPalette::from_colors(&colors);

        let swapped = convert_colors(&image, &source.remap_to(&target));
        assert_eq!(*swapped.get_pixel(3, 0), Rgba([0, 0, 103, 255]));
    }

    #[test]
    fn test_serialized_as_entries() {
        let palette = CombatPalette::from_colors(&[Rgb::new(255, 0, 0)]);
        let json = serde_json::to_string(&palette).unwrap();
        assert_eq!(json, r##"[{"col":0,"row":0,"color":"#FF0000"}]"##);
        let back: CombatPalette = serde_json::from_str(&json).unwrap();
        assert_eq!(back, palette);
    }
}
