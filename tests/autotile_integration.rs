//! Autotile Engine Test Suite
//!
//! Integration tests for the full matching pipeline:
//!
//! - Template loading from a directory
//! - Matching and atlas layout
//! - Recoloring of recognized series
//! - Determinism across worker counts
//! - Cancellation and progress reporting

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use image::{Rgba, RgbaImage};
use tileforge::autotile::{
    AtlasMetadata, AutotileEngine, EngineOptions, EngineState, MatchOptions, TileCoord,
    TileGeometry,
};
use tileforge::progress::{CancelFlag, NullProgress, ProgressEvent, RecordingProgress};

// ============================================================================
// Test Utilities
// ============================================================================

const TILE: u32 = 16;
const FRAMES: u32 = 16;
const BG: [u8; 3] = [200, 200, 200];

fn px(c: [u8; 3]) -> Rgba<u8> {
    Rgba([c[0], c[1], c[2], 255])
}

#[derive(Clone, Copy)]
enum Pattern {
    Diagonal,
    HalfLeft,
    Checker,
}

impl Pattern {
    fn is_fg(self, x: u32, y: u32) -> bool {
        match self {
            Pattern::Diagonal => x == y,
            Pattern::HalfLeft => x < TILE / 2,
            Pattern::Checker => (x + y) % 2 == 0,
        }
    }

    fn tile(self, fg: [u8; 3], bg: [u8; 3]) -> RgbaImage {
        RgbaImage::from_fn(TILE, TILE, |x, y| px(if self.is_fg(x, y) { fg } else { bg }))
    }
}

/// Foreground of `frame` in the template series at `index`.
fn template_fg(index: usize, frame: u32) -> [u8; 3] {
    let mut c = [0, 0, 0];
    c[index] = 10 + frame as u8;
    c
}

/// A 256x48 template: 16 frames side by side, one column of three cells.
fn write_template(dir: &Path, name: &str) {
    let patterns = [Pattern::Diagonal, Pattern::HalfLeft, Pattern::Checker];
    let image = RgbaImage::from_fn(TILE * FRAMES, TILE * 3, |x, y| {
        let frame = x / TILE;
        let cell = (y / TILE) as usize;
        let fg = template_fg(cell, frame);
        px(if patterns[cell].is_fg(x % TILE, y % TILE) { fg } else { BG })
    });
    image.save(dir.join(name)).unwrap();
}

fn template_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_template(temp.path(), "water.png");
    temp
}

/// Tileset: diagonal, half, checker, then a solid tile.
fn tileset() -> RgbaImage {
    let tiles = [
        Pattern::Diagonal.tile([255, 0, 0], [0, 0, 255]),
        Pattern::HalfLeft.tile([0, 255, 0], [0, 0, 0]),
        Pattern::Checker.tile([255, 255, 0], [128, 0, 128]),
        RgbaImage::from_pixel(TILE, TILE, px([50, 50, 50])),
    ];
    let mut image = RgbaImage::new(TILE * tiles.len() as u32, TILE);
    for (i, tile) in tiles.iter().enumerate() {
        image::imageops::replace(&mut image, tile, i as i64 * TILE as i64, 0);
    }
    image
}

fn options(jobs: usize) -> EngineOptions {
    EngineOptions {
        geometry: TileGeometry { tile_width: TILE, tile_height: TILE, frame_count: FRAMES },
        matching: MatchOptions { jobs, ..MatchOptions::default() },
    }
}

fn crop(image: &RgbaImage, x: u32, y: u32) -> RgbaImage {
    image::imageops::crop_imm(image, x, y, TILE, TILE).to_image()
}

// ============================================================================
// Matching and Layout
// ============================================================================

#[test]
fn test_atlas_has_one_column_per_series() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));

    let result = engine.run(&tileset(), true, &NullProgress).unwrap();
    let atlas = result.atlas.as_ref().unwrap();

    assert_eq!(atlas.dimensions(), (48, 256));
    assert_eq!(result.columns.len(), 3);
    assert_eq!(engine.state(), EngineState::Done);
    assert_eq!(engine.books().len(), 1);
    assert_eq!(engine.books()[0].series.len(), 3);
}

#[test]
fn test_mapping_follows_tile_order() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let result = engine.run(&tileset(), true, &NullProgress).unwrap();

    assert_eq!(result.mapping.get(&TileCoord::new(0, 0)), Some(&0));
    assert_eq!(result.mapping.get(&TileCoord::new(1, 0)), Some(&1));
    assert_eq!(result.mapping.get(&TileCoord::new(2, 0)), Some(&2));
    // Solid tiles never match
    assert_eq!(result.mapping.get(&TileCoord::new(3, 0)), None);

    let cells: Vec<[u32; 2]> = result.columns.iter().map(|c| c.cell).collect();
    assert_eq!(cells, vec![[0, 0], [0, 1], [0, 2]]);
    assert!(result.columns.iter().all(|c| c.distance == 0 && c.frame == 0));
}

#[test]
fn test_exact_match_recolors_to_tile() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let tiles = tileset();
    let result = engine.run(&tiles, true, &NullProgress).unwrap();
    let atlas = result.atlas.unwrap();

    for column in 0..3 {
        assert_eq!(crop(&atlas, column * TILE, 0), crop(&tiles, column * TILE, 0));
    }
}

#[test]
fn test_unresolved_colors_keep_template_color() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let result = engine.run(&tileset(), true, &NullProgress).unwrap();
    let atlas = result.atlas.unwrap();

    // Frame 1 foreground appears in no matched frame and no other series.
    assert_eq!(*atlas.get_pixel(0, TILE), px(template_fg(0, 1)));
    // Background was matched in frame 0 and follows the tile.
    assert_eq!(*atlas.get_pixel(1, TILE), px([0, 0, 255]));
}

#[test]
fn test_recolor_disabled_copies_template() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let result = engine.run(&tileset(), false, &NullProgress).unwrap();
    let atlas = result.atlas.unwrap();

    assert_eq!(crop(&atlas, 0, 0), Pattern::Diagonal.tile(template_fg(0, 0), BG));
    assert_eq!(crop(&atlas, 0, 3 * TILE), Pattern::Diagonal.tile(template_fg(0, 3), BG));
    assert!(result.columns.iter().all(|c| !c.recolored));
}

#[test]
fn test_single_tile_fills_one_column() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let tiles = Pattern::Diagonal.tile([255, 0, 0], [0, 0, 255]);
    let result = engine.run(&tiles, true, &NullProgress).unwrap();
    let atlas = result.atlas.unwrap();
    assert_eq!(atlas.dimensions(), (16, 256));
    assert_eq!(result.columns.len(), 1);
}

#[test]
fn test_no_matches_gives_empty_result() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let solid = RgbaImage::from_pixel(32, 32, px([9, 9, 9]));

    let result = engine.run(&solid, true, &NullProgress).unwrap();
    assert!(result.is_empty());
    assert!(result.mapping.is_empty());
    assert!(!result.cancelled);
}

#[test]
fn test_metadata_describes_run() {
    let temp = template_dir();
    let engine_options = options(1);
    let mut engine = AutotileEngine::new(temp.path(), engine_options);
    let result = engine.run(&tileset(), true, &NullProgress).unwrap();

    let meta = AtlasMetadata::new(
        "town_autotiles.png",
        &engine_options.geometry,
        &result.columns,
        &result.mapping,
    );
    assert_eq!(meta.size, [48, 256]);
    assert_eq!(meta.tiles.len(), 3);

    let json: serde_json::Value = serde_json::to_value(&meta).unwrap();
    assert_eq!(json["columns"][0]["book"], "water");
    assert_eq!(json["tiles"][2]["column"], 2);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_results_independent_of_worker_count() {
    let temp = template_dir();
    let tiles = tileset();

    let mut sequential = AutotileEngine::new(temp.path(), options(1));
    let expected = sequential.run(&tiles, true, &NullProgress).unwrap();

    for jobs in [0, 2, 4] {
        let mut parallel = AutotileEngine::new(temp.path(), options(jobs));
        let result = parallel.run(&tiles, true, &NullProgress).unwrap();
        assert_eq!(result.atlas, expected.atlas, "jobs = {}", jobs);
        assert_eq!(result.mapping, expected.mapping, "jobs = {}", jobs);
        assert_eq!(result.columns, expected.columns, "jobs = {}", jobs);
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(2));
    let first = engine.run(&tileset(), true, &NullProgress).unwrap();
    let second = engine.run(&tileset(), true, &NullProgress).unwrap();

    assert_eq!(first.atlas, second.atlas);
    assert_eq!(first.mapping, second.mapping);
}

// ============================================================================
// Cancellation and Progress
// ============================================================================

#[test]
fn test_cancel_mid_run_then_rerun() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));

    let sink = CancelFlag::new(NullProgress).cancel_at(50);
    let cancelled = engine.run(&tileset(), true, &sink).unwrap();
    assert!(cancelled.cancelled);
    assert!(cancelled.atlas.is_none());
    assert!(cancelled.columns.is_empty());
    assert_eq!(engine.recognized_count(), 0);
    assert!(engine.map_tiles().is_empty());
    assert_eq!(engine.state(), EngineState::TemplatesLoaded);

    let result = engine.run(&tileset(), true, &NullProgress).unwrap();
    assert!(!result.cancelled);
    assert_eq!(result.columns.len(), 3);
}

#[test]
fn test_cancel_before_start() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let sink = CancelFlag::new(RecordingProgress::new());
    sink.cancel();

    let result = engine.run(&tileset(), true, &sink).unwrap();
    assert!(result.cancelled);
    assert_eq!(
        sink.inner().events().last(),
        Some(&ProgressEvent::Finished { columns: 0, cancelled: true })
    );
}

#[test]
fn test_progress_percentages_never_decrease() {
    let temp = template_dir();
    for jobs in [1, 4] {
        let mut engine = AutotileEngine::new(temp.path(), options(jobs));
        let sink = RecordingProgress::new();
        engine.run(&tileset(), true, &sink).unwrap();

        let percents: Vec<u8> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Percent { percent, .. } => Some(percent),
                _ => None,
            })
            .collect();
        assert!(!percents.is_empty());
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "jobs = {}: {:?}", jobs, percents);
        assert_eq!(percents.last(), Some(&100));
    }
}

#[test]
fn test_cancel_mid_matching_with_workers() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(4));

    let sink = CancelFlag::new(NullProgress).cancel_at(50);
    let result = engine.run(&tileset(), true, &sink).unwrap();
    assert!(result.cancelled);
    assert!(result.atlas.is_none());
    assert!(result.mapping.is_empty());
    assert_eq!(engine.recognized_count(), 0);
    assert!(engine.map_tiles().is_empty());

    let rerun = engine.run(&tileset(), true, &NullProgress).unwrap();
    assert_eq!(rerun.columns.len(), 3);
}

// ============================================================================
// Template Loading
// ============================================================================

#[test]
fn test_bad_templates_are_skipped_with_warnings() {
    let temp = template_dir();
    RgbaImage::from_pixel(7, 7, px([1, 2, 3])).save(temp.path().join("odd.png")).unwrap();
    fs::write(temp.path().join("broken.png"), b"not a png").unwrap();

    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let sink = RecordingProgress::new();
    let result = engine.run(&tileset(), true, &sink).unwrap();

    assert_eq!(engine.books().len(), 1);
    assert_eq!(engine.template_errors().len(), 2);
    let warnings = sink
        .events()
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Warning { .. }))
        .count();
    assert_eq!(warnings, 2);
    assert_eq!(result.columns.len(), 3);
}

#[test]
fn test_missing_template_dir_matches_nothing() {
    let temp = TempDir::new().unwrap();
    let mut engine = AutotileEngine::new(temp.path().join("missing"), options(1));
    let sink = RecordingProgress::new();

    let result = engine.run(&tileset(), true, &sink).unwrap();
    assert!(result.is_empty());
    assert!(!result.cancelled);
    assert!(sink.events().iter().any(|e| matches!(e, ProgressEvent::Warning { .. })));
}

#[test]
fn test_templates_reload_when_directory_changes() {
    let temp = TempDir::new().unwrap();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    assert!(engine.load_templates());
    assert!(engine.books().is_empty());
    assert!(!engine.load_templates());

    write_template(temp.path(), "lava.png");
    assert!(engine.load_templates());
    assert_eq!(engine.books().len(), 1);
    assert_eq!(engine.books()[0].name, "lava");
}

#[test]
fn test_run_path_reports_unreadable_tileset() {
    let temp = template_dir();
    let mut engine = AutotileEngine::new(temp.path(), options(1));
    let err = engine
        .run_path(&temp.path().join("nope.png"), true, &NullProgress)
        .unwrap_err();
    assert!(err.to_string().contains("nope.png"));
}
