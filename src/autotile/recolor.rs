//! Recoloring matched template series to a tile's actual colors.

use image::RgbaImage;

use super::template::{Book, Series};
use super::tileset::MapTile;
use crate::color::Rgb;
use crate::palette::{convert_colors, ColorMap, PaletteData};

/// Map the template frame's colors onto the tile's colors by canonical
/// index.
///
/// Template colors beyond the tile's color count stay unmapped.
pub fn conversion_map(template: &PaletteData, tile: &PaletteData) -> ColorMap {
    template
        .unique_colors()
        .iter()
        .zip(tile.unique_colors())
        .map(|(&from, &to)| (from, to))
        .collect()
}

/// Find a replacement for a template color the best frame never used.
///
/// Searches the other series of the same book, frame by frame, for a frame
/// containing `color` whose index pattern equals some map tile's pattern,
/// and borrows that tile's color at the same canonical index. The first
/// hit in series, frame, tile order wins.
pub fn fix_missing_color(
    color: Rgb,
    book: &Book,
    skip_series: usize,
    map_tiles: &[MapTile],
) -> Option<Rgb> {
    for (si, series) in book.series.iter().enumerate() {
        if si == skip_series {
            continue;
        }
        for frame in series.frames() {
            let Some(position) = frame.position_of(color) else {
                continue;
            };
            for tile in map_tiles {
                if tile.data.is_degenerate() || tile.data.palette() != frame.palette() {
                    continue;
                }
                if let Some(&replacement) = tile.data.unique_colors().get(position) {
                    return Some(replacement);
                }
            }
        }
    }
    None
}

/// Recolor every frame of a newly recognized series.
///
/// `best_frame` is the template frame that matched `tile`. Colors that
/// cannot be resolved keep their template color.
pub fn recolor_series(
    book: &Book,
    series_index: usize,
    best_frame: usize,
    tile: &PaletteData,
    map_tiles: &[MapTile],
) -> Vec<RgbaImage> {
    let series: &Series = &book.series[series_index];
    let Some(matched) = series.frame(best_frame) else {
        return series.frames().iter().map(|f| f.image().clone()).collect();
    };

    let mut map = conversion_map(matched, tile);
    for frame in series.frames() {
        for &color in frame.unique_colors() {
            if map.contains_key(&color) {
                continue;
            }
            match fix_missing_color(color, book, series_index, map_tiles) {
                Some(replacement) => {
                    log::trace!("{}: borrowed {} for {}", book.name, replacement, color);
                    map.insert(color, replacement);
                }
                None => log::debug!("{}: no replacement for {}", book.name, color),
            }
        }
    }

    series.frames().iter().map(|f| convert_colors(f.image(), &map)).collect()
}
