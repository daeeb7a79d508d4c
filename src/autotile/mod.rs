//! Autotile matching engine
//!
//! Matches the tiles of a tileset against a library of animated templates
//! and builds an atlas of the recognized animations, recolored to the
//! tileset's own colors.
//!
//! # Overview
//!
//! A run goes through these stages:
//! - **Palettizing**: slice the tileset and index every tile
//! - **Matching**: find the closest template frame for each tile
//! - **Recoloring**: convert each newly recognized series to its tile's colors
//! - **Compositing**: paste the series into atlas columns
//!
//! # Example
//!
//! ```ignore
//! use tileforge::autotile::{AutotileEngine, EngineOptions};
//! use tileforge::progress::NullProgress;
//!
//! let mut engine = AutotileEngine::new("autotiles", EngineOptions::default());
//! let tileset = image::open("tileset.png")?.to_rgba8();
//! let result = engine.run(&tileset, true, &NullProgress)?;
//! if let Some(atlas) = result.atlas {
//!     atlas.save("autotiles.png")?;
//! }
//! ```

pub mod atlas;
pub mod matching;
pub mod recolor;
pub mod template;
pub mod tileset;

pub use atlas::{compose_atlas, AtlasColumn, AtlasMetadata};
pub use matching::{find_best_match, score_tiles, BestMatch, MatchOptions, SeriesId};
pub use recolor::{conversion_map, fix_missing_color, recolor_series};
pub use template::{load_books, Book, Series, TemplateFingerprint, TemplateLoadError};
pub use tileset::{slice_tileset, MapTile, TileCoord};

use image::RgbaImage;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::palette::PaletteError;
use crate::progress::{ProgressEvent, ProgressSink, Stage};

/// Tile and animation geometry shared by tilesets and templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    pub tile_width: u32,
    pub tile_height: u32,
    /// Frames per template animation
    pub frame_count: u32,
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self { tile_width: 16, tile_height: 16, frame_count: 16 }
    }
}

impl TileGeometry {
    /// Every dimension must be non-zero.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("tile_width", self.tile_width),
            ("tile_height", self.tile_height),
            ("frame_count", self.frame_count),
        ] {
            if value == 0 {
                return Err(format!("{} must be positive", name));
            }
        }
        Ok(())
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum AutotileError {
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error("invalid tile geometry: {0}")]
    InvalidGeometry(String),
    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("cannot read tileset '{}': {source}", path.display())]
    Tileset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    TemplatesLoaded,
    Palettizing,
    Matching,
    Recoloring,
    Compositing,
    Done,
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    pub geometry: TileGeometry,
    pub matching: MatchOptions,
}

/// Output of a run.
#[derive(Debug, Clone, Default)]
pub struct AutotileResult {
    /// `None` when nothing matched or the run was cancelled
    pub atlas: Option<RgbaImage>,
    /// Tileset coordinate to atlas column
    pub mapping: BTreeMap<TileCoord, usize>,
    /// One entry per atlas column, in recognition order
    pub columns: Vec<AtlasColumn>,
    pub cancelled: bool,
}

impl AutotileResult {
    fn cancelled() -> Self {
        Self { cancelled: true, ..Self::default() }
    }

    /// No autotiles detected.
    pub fn is_empty(&self) -> bool {
        self.atlas.is_none()
    }
}

/// A series recognized during the current run.
#[derive(Debug, Clone)]
struct RecognizedSeries {
    column: AtlasColumn,
    frames: Vec<RgbaImage>,
}

/// Matches tilesets against template books.
///
/// Books are loaded once and reused across runs until the template
/// directory changes. Per-run state is dropped by [`clear`](Self::clear).
#[derive(Debug)]
pub struct AutotileEngine {
    template_dir: Option<PathBuf>,
    options: EngineOptions,
    books: Vec<Book>,
    fingerprint: Option<TemplateFingerprint>,
    load_errors: Vec<TemplateLoadError>,
    state: EngineState,
    map_tiles: Vec<MapTile>,
    recognized: Vec<RecognizedSeries>,
    recognized_index: HashMap<SeriesId, usize>,
}

impl AutotileEngine {
    /// Engine reading templates from `template_dir` on first use.
    pub fn new(template_dir: impl Into<PathBuf>, options: EngineOptions) -> Self {
        Self {
            template_dir: Some(template_dir.into()),
            options,
            books: Vec::new(),
            fingerprint: None,
            load_errors: Vec::new(),
            state: EngineState::Idle,
            map_tiles: Vec::new(),
            recognized: Vec::new(),
            recognized_index: HashMap::new(),
        }
    }

    /// Engine over books that are already in memory.
    pub fn with_books(books: Vec<Book>, options: EngineOptions) -> Self {
        Self {
            template_dir: None,
            options,
            books,
            fingerprint: None,
            load_errors: Vec::new(),
            state: EngineState::TemplatesLoaded,
            map_tiles: Vec::new(),
            recognized: Vec::new(),
            recognized_index: HashMap::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Problems from the last template load.
    pub fn template_errors(&self) -> &[TemplateLoadError] {
        &self.load_errors
    }

    /// Tiles indexed by the current run.
    pub fn map_tiles(&self) -> &[MapTile] {
        &self.map_tiles
    }

    /// Number of series recognized by the current run.
    pub fn recognized_count(&self) -> usize {
        self.recognized.len()
    }

    /// (Re)load templates if the directory changed since the last load.
    ///
    /// Returns whether a load happened.
    pub fn load_templates(&mut self) -> bool {
        let Some(dir) = &self.template_dir else {
            return false;
        };
        let fingerprint = TemplateFingerprint::of(dir);
        if self.fingerprint.as_ref() == Some(&fingerprint) {
            return false;
        }

        let (books, errors) = load_books(dir, &self.options.geometry);
        log::info!(
            "loaded {} template book{} from {}",
            books.len(),
            if books.len() == 1 { "" } else { "s" },
            dir.display()
        );
        self.books = books;
        self.load_errors = errors;
        self.fingerprint = Some(fingerprint);
        self.state = EngineState::TemplatesLoaded;
        true
    }

    /// Drop per-run caches, keeping loaded books.
    pub fn clear(&mut self) {
        self.map_tiles.clear();
        self.recognized.clear();
        self.recognized_index.clear();
        self.state = if self.template_dir.is_some() && self.fingerprint.is_none() {
            EngineState::Idle
        } else {
            EngineState::TemplatesLoaded
        };
    }

    /// Decode the tileset at `path` and [`run`](Self::run) on it.
    pub fn run_path(
        &mut self,
        path: &Path,
        enable_color_conversion: bool,
        progress: &dyn ProgressSink,
    ) -> Result<AutotileResult, AutotileError> {
        let tileset = image::open(path)
            .map_err(|source| AutotileError::Tileset { path: path.to_path_buf(), source })?
            .to_rgba8();
        self.run(&tileset, enable_color_conversion, progress)
    }

    /// Match `tileset` against the loaded templates and build the atlas.
    ///
    /// A cancelled run returns an empty result with `cancelled` set and
    /// leaves the engine cleared.
    pub fn run(
        &mut self,
        tileset: &RgbaImage,
        enable_color_conversion: bool,
        progress: &dyn ProgressSink,
    ) -> Result<AutotileResult, AutotileError> {
        self.options.geometry.validate().map_err(AutotileError::InvalidGeometry)?;
        self.clear();
        if self.load_templates() {
            for error in &self.load_errors {
                progress.report(ProgressEvent::Warning { message: error.to_string() });
            }
        }
        if self.books.is_empty() {
            log::warn!("no template books loaded, nothing can match");
        }
        if progress.is_cancelled() {
            return Ok(self.cancel(progress));
        }

        self.enter(EngineState::Palettizing, Stage::Palettizing, progress);
        self.map_tiles = slice_tileset(tileset, &self.options.geometry);
        log::debug!("palettized {} tiles", self.map_tiles.len());
        progress.report(ProgressEvent::Percent {
            stage: Stage::Palettizing,
            percent: Stage::Palettizing.span().1,
        });
        if progress.is_cancelled() {
            return Ok(self.cancel(progress));
        }

        self.enter(EngineState::Matching, Stage::Matching, progress);
        let scores =
            match score_tiles(&self.map_tiles, &self.books, &self.options.matching, progress) {
                Ok(Some(scores)) => scores,
                Ok(None) => return Ok(self.cancel(progress)),
                Err(e) => {
                    self.clear();
                    return Err(e);
                }
            };

        self.enter(EngineState::Recoloring, Stage::Recoloring, progress);
        let mut mapping = BTreeMap::new();
        let mut cancelled = false;
        let total = self.map_tiles.len();
        for (i, (tile, best)) in self.map_tiles.iter().zip(&scores).enumerate() {
            if progress.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(best) = best else {
                continue;
            };

            let column = match self.recognized_index.get(&best.series) {
                Some(&column) => column,
                None => {
                    let book = &self.books[best.series.book];
                    let series = &book.series[best.series.series];
                    let frames = if enable_color_conversion {
                        recolor_series(book, best.series.series, best.frame, &tile.data, &self.map_tiles)
                    } else {
                        series.frames().iter().map(|f| f.image().clone()).collect()
                    };
                    let column = self.recognized.len();
                    log::debug!(
                        "tile ({}, {}) recognized as {}[{}] frame {} (distance {}), column {}",
                        tile.coord.x,
                        tile.coord.y,
                        book.name,
                        best.series.series,
                        best.frame,
                        best.distance,
                        column
                    );
                    self.recognized.push(RecognizedSeries {
                        column: AtlasColumn {
                            book: book.name.clone(),
                            series: best.series.series,
                            cell: [series.cell.0, series.cell.1],
                            frame: best.frame,
                            distance: best.distance,
                            recolored: enable_color_conversion,
                        },
                        frames,
                    });
                    self.recognized_index.insert(best.series, column);
                    column
                }
            };
            mapping.insert(tile.coord, column);
            progress.report(ProgressEvent::Percent {
                stage: Stage::Recoloring,
                percent: Stage::Recoloring.percent(i + 1, total),
            });
        }
        if cancelled || progress.is_cancelled() {
            return Ok(self.cancel(progress));
        }

        self.enter(EngineState::Compositing, Stage::Compositing, progress);
        let frames: Vec<&[RgbaImage]> = self.recognized.iter().map(|r| r.frames.as_slice()).collect();
        let atlas = compose_atlas(&frames, &self.options.geometry);
        let columns: Vec<AtlasColumn> = self.recognized.iter().map(|r| r.column.clone()).collect();
        progress.report(ProgressEvent::Percent { stage: Stage::Compositing, percent: 100 });

        self.state = EngineState::Done;
        progress.report(ProgressEvent::Finished { columns: columns.len(), cancelled: false });
        if atlas.is_none() {
            log::info!("no autotiles detected");
        }

        Ok(AutotileResult { atlas, mapping, columns, cancelled: false })
    }

    fn enter(&mut self, state: EngineState, stage: Stage, progress: &dyn ProgressSink) {
        self.state = state;
        progress.report(ProgressEvent::StageStarted { stage });
    }

    fn cancel(&mut self, progress: &dyn ProgressSink) -> AutotileResult {
        log::info!("run cancelled");
        self.clear();
        progress.report(ProgressEvent::Finished { columns: 0, cancelled: true });
        AutotileResult::cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteData;
    use crate::progress::{CancelFlag, NullProgress, RecordingProgress};
    use image::Rgba;

    fn geometry() -> TileGeometry {
        TileGeometry { tile_width: 4, tile_height: 4, frame_count: 2 }
    }

    fn options() -> EngineOptions {
        EngineOptions {
            geometry: geometry(),
            matching: MatchOptions { jobs: 1, ..MatchOptions::default() },
        }
    }

    fn diagonal(fg: [u8; 3], bg: [u8; 3]) -> RgbaImage {
        RgbaImage::from_fn(4, 4, |x, y| {
            let c = if x == y { fg } else { bg };
            Rgba([c[0], c[1], c[2], 255])
        })
    }

    fn diagonal_book() -> Book {
        let frames = vec![
            PaletteData::new(diagonal([1, 1, 1], [2, 2, 2])),
            PaletteData::new(diagonal([3, 3, 3], [2, 2, 2])),
        ];
        Book { name: "diag".to_string(), series: vec![Series::new((0, 0), frames)] }
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = AutotileEngine::with_books(vec![diagonal_book()], options());
        assert_eq!(engine.state(), EngineState::TemplatesLoaded);

        let tileset = diagonal([200, 0, 0], [0, 0, 200]);
        engine.run(&tileset, true, &NullProgress).unwrap();
        assert_eq!(engine.state(), EngineState::Done);
        assert_eq!(engine.recognized_count(), 1);

        engine.clear();
        assert_eq!(engine.state(), EngineState::TemplatesLoaded);
        assert_eq!(engine.recognized_count(), 0);
        assert!(engine.map_tiles().is_empty());
    }

    #[test]
    fn test_engine_starts_idle_with_directory() {
        let engine = AutotileEngine::new("/nonexistent", options());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_run_reports_stages_in_order() {
        let mut engine = AutotileEngine::with_books(vec![diagonal_book()], options());
        let sink = RecordingProgress::new();
        engine.run(&diagonal([200, 0, 0], [0, 0, 200]), true, &sink).unwrap();

        let stages: Vec<Stage> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::StageStarted { stage } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![Stage::Palettizing, Stage::Matching, Stage::Recoloring, Stage::Compositing]
        );
        assert_eq!(
            sink.events().last(),
            Some(&ProgressEvent::Finished { columns: 1, cancelled: false })
        );
    }

    #[test]
    fn test_recoloring_disabled_keeps_template_colors() {
        let mut engine = AutotileEngine::with_books(vec![diagonal_book()], options());
        let result = engine.run(&diagonal([200, 0, 0], [0, 0, 200]), false, &NullProgress).unwrap();
        let atlas = result.atlas.unwrap();
        assert_eq!(*atlas.get_pixel(1, 0), Rgba([2, 2, 2, 255]));
        assert!(!result.columns[0].recolored);
    }

    #[test]
    fn test_cancel_before_matching() {
        let mut engine = AutotileEngine::with_books(vec![diagonal_book()], options());
        let sink = CancelFlag::new(NullProgress).cancel_at(10);
        let result = engine.run(&diagonal([200, 0, 0], [0, 0, 200]), true, &sink).unwrap();

        assert!(result.cancelled);
        assert!(result.atlas.is_none());
        assert!(result.mapping.is_empty());
        assert_eq!(engine.recognized_count(), 0);
    }

    #[test]
    fn test_zero_geometry_is_rejected() {
        for geometry in [
            TileGeometry { tile_width: 0, ..geometry() },
            TileGeometry { tile_height: 0, ..geometry() },
            TileGeometry { frame_count: 0, ..geometry() },
        ] {
            let options = EngineOptions { geometry, ..options() };
            let mut engine = AutotileEngine::with_books(Vec::new(), options);
            let tileset = diagonal([200, 0, 0], [0, 0, 200]);
            let err = engine.run(&tileset, true, &NullProgress).unwrap_err();
            assert!(matches!(err, AutotileError::InvalidGeometry(_)), "{:?}", geometry);
            assert_eq!(engine.state(), EngineState::TemplatesLoaded);
        }
    }

    #[test]
    fn test_mismatched_book_dimensions_error() {
        let frames = vec![PaletteData::new(RgbaImage::from_fn(2, 2, |x, _| Rgba([x as u8, 0, 0, 255])))];
        let book = Book { name: "small".to_string(), series: vec![Series::new((0, 0), frames)] };
        let mut engine = AutotileEngine::with_books(vec![book], options());

        let err = engine.run(&diagonal([200, 0, 0], [0, 0, 200]), true, &NullProgress).unwrap_err();
        assert!(matches!(err, AutotileError::Palette(PaletteError::DimensionMismatch { .. })));
        assert_eq!(engine.recognized_count(), 0);
    }
}
