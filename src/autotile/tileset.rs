//! Slicing a tileset into indexed map tiles.

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use super::TileGeometry;
use crate::palette::PaletteData;

/// Tile position in a tileset, in tile units.
///
/// Ordering is column-major (x, then y), the order tiles are matched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Indexed snapshot of one tileset cell.
#[derive(Debug, Clone)]
pub struct MapTile {
    pub coord: TileCoord,
    pub data: PaletteData,
}

/// Copy a `width` x `height` region starting at pixel (`x`, `y`).
pub fn crop_tile(image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
    imageops::crop_imm(image, x, y, width, height).to_image()
}

/// Cut `image` into tiles, column by column.
///
/// Partial tiles at the right and bottom edges are ignored. A geometry with a
/// zero tile dimension yields no tiles.
pub fn slice_tileset(image: &RgbaImage, geometry: &TileGeometry) -> Vec<MapTile> {
    if geometry.tile_width == 0 || geometry.tile_height == 0 {
        return Vec::new();
    }
    let columns = image.width() / geometry.tile_width;
    let rows = image.height() / geometry.tile_height;

    let mut tiles = Vec::with_capacity((columns * rows) as usize);
    for x in 0..columns {
        for y in 0..rows {
            let tile = crop_tile(
                image,
                x * geometry.tile_width,
                y * geometry.tile_height,
                geometry.tile_width,
                geometry.tile_height,
            );
            tiles.push(MapTile { coord: TileCoord::new(x, y), data: PaletteData::new(tile) });
        }
    }
    tiles
}
