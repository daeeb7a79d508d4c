//! Atlas compositing - lays recognized series out as columns of frames
//!
//! Column `i` holds the frames of the `i`-th recognized series from top to
//! bottom. The background is fully transparent.

use image::{Rgba, RgbaImage};
use serde::Serialize;
use std::collections::BTreeMap;

use super::tileset::TileCoord;
use super::TileGeometry;

/// Transparent color for atlas background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Summary of one atlas column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtlasColumn {
    /// Name of the template book the series came from
    pub book: String,
    /// Series position inside its book
    pub series: usize,
    /// Template cell of the series
    pub cell: [u32; 2],
    /// Template frame that matched best
    pub frame: usize,
    /// Similarity distance of that match
    pub distance: u32,
    /// Whether the frames were recolored to the tileset's colors
    pub recolored: bool,
}

/// A tileset tile and the atlas column it animates with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtlasTile {
    pub x: u32,
    pub y: u32,
    pub column: usize,
}

/// Complete atlas metadata
#[derive(Debug, Clone, Serialize)]
pub struct AtlasMetadata {
    pub image: String,
    pub size: [u32; 2],
    pub tile_size: [u32; 2],
    pub frame_count: u32,
    pub columns: Vec<AtlasColumn>,
    pub tiles: Vec<AtlasTile>,
}

impl AtlasMetadata {
    pub fn new(
        image: impl Into<String>,
        geometry: &TileGeometry,
        columns: &[AtlasColumn],
        mapping: &BTreeMap<TileCoord, usize>,
    ) -> Self {
        let (width, height) = atlas_size(columns.len(), geometry);
        Self {
            image: image.into(),
            size: [width, height],
            tile_size: [geometry.tile_width, geometry.tile_height],
            frame_count: geometry.frame_count,
            columns: columns.to_vec(),
            tiles: mapping
                .iter()
                .map(|(coord, &column)| AtlasTile { x: coord.x, y: coord.y, column })
                .collect(),
        }
    }
}

/// Pixel size of an atlas with `columns` series.
pub fn atlas_size(columns: usize, geometry: &TileGeometry) -> (u32, u32) {
    (columns as u32 * geometry.tile_width, geometry.frame_count * geometry.tile_height)
}

/// Paste each series' frames into its own column.
///
/// Returns `None` when there is nothing to place.
pub fn compose_atlas<F>(series_frames: &[F], geometry: &TileGeometry) -> Option<RgbaImage>
where
    F: AsRef<[RgbaImage]>,
{
    if series_frames.is_empty() {
        return None;
    }

    let (width, height) = atlas_size(series_frames.len(), geometry);
    let mut atlas = RgbaImage::from_pixel(width, height, TRANSPARENT);

    for (column, frames) in series_frames.iter().enumerate() {
        let x = column as u32 * geometry.tile_width;
        for (row, frame) in frames.as_ref().iter().take(geometry.frame_count as usize).enumerate() {
            copy_frame_to_atlas(&mut atlas, frame, x, row as u32 * geometry.tile_height);
        }
    }

    Some(atlas)
}

/// Copy a frame image to the atlas at the given position
fn copy_frame_to_atlas(atlas: &mut RgbaImage, frame: &RgbaImage, x: u32, y: u32) {
    for fy in 0..frame.height() {
        for fx in 0..frame.width() {
            if x + fx < atlas.width() && y + fy < atlas.height() {
                atlas.put_pixel(x + fx, y + fy, *frame.get_pixel(fx, fy));
            }
        }
    }
}
