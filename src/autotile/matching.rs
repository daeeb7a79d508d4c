//! Best-match search of map tiles against template books.
//!
//! Each tile's search is independent, so tiles are scored on a rayon pool.
//! Results come back in tile order regardless of the worker count.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::template::Book;
use super::tileset::MapTile;
use super::AutotileError;
use crate::palette::{PaletteData, PaletteError, SimilarityMode};
use crate::progress::{ProgressEvent, ProgressSink, Stage};

/// Identity of a series: its book's and its own load position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId {
    pub book: usize,
    pub series: usize,
}

/// Closest template frame found for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestMatch {
    pub series: SeriesId,
    pub frame: usize,
    pub distance: u32,
}

/// Parameters shared by every tile search.
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    pub mode: SimilarityMode,
    /// Matches must score strictly below this; `None` uses the tile's pixel
    /// count
    pub max_distance: Option<u32>,
    /// Worker threads; 1 scores sequentially, 0 uses all cores
    pub jobs: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { mode: SimilarityMode::default(), max_distance: None, jobs: 0 }
    }
}

/// Search every book, series and frame for the closest pattern to `tile`.
///
/// Ties keep the first candidate found in book, series, frame order.
pub fn find_best_match(
    tile: &PaletteData,
    books: &[Book],
    options: &MatchOptions,
) -> Result<Option<BestMatch>, PaletteError> {
    let mut threshold = options.max_distance.unwrap_or(tile.pixel_count() as u32);
    let mut best = None;

    for (bi, book) in books.iter().enumerate() {
        for (si, series) in book.series.iter().enumerate() {
            for (fi, frame) in series.frames().iter().enumerate() {
                let distance = frame.distance(tile, options.mode)?;
                if distance < threshold {
                    threshold = distance;
                    best = Some(BestMatch {
                        series: SeriesId { book: bi, series: si },
                        frame: fi,
                        distance,
                    });
                    if distance == 0 {
                        return Ok(best);
                    }
                }
            }
        }
    }

    Ok(best)
}

/// Score every tile. Returns `None` if the sink cancelled the run.
///
/// Degenerate tiles (fewer than two colors) are never matched.
pub fn score_tiles(
    tiles: &[MapTile],
    books: &[Book],
    options: &MatchOptions,
    progress: &dyn ProgressSink,
) -> Result<Option<Vec<Option<BestMatch>>>, AutotileError> {
    let total = tiles.len();
    let done = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    // Highest percentage reported so far; held while reporting so workers
    // never report out of order.
    let reported = Mutex::new(Stage::Matching.span().0);

    let score = |tile: &MapTile| -> Result<Option<BestMatch>, PaletteError> {
        if cancelled.load(Ordering::Relaxed) || progress.is_cancelled() {
            cancelled.store(true, Ordering::Relaxed);
            return Ok(None);
        }
        let found = if tile.data.is_degenerate() {
            None
        } else {
            find_best_match(&tile.data, books, options)?
        };
        let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = Stage::Matching.percent(finished, total);
        if let Ok(mut last) = reported.lock() {
            if percent > *last {
                *last = percent;
                progress.report(ProgressEvent::Percent { stage: Stage::Matching, percent });
            }
        }
        Ok(found)
    };

    let results: Result<Vec<Option<BestMatch>>, PaletteError> = if options.jobs == 1 {
        tiles.iter().map(score).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(options.jobs).build()?;
        pool.install(|| tiles.par_iter().map(score).collect())
    };
    let results = results?;

    if cancelled.load(Ordering::SeqCst) {
        return Ok(None);
    }
    Ok(Some(results))
}
