//! Template books: animated autotile looks loaded from PNG files.
//!
//! A template image holds `frame_count` frames side by side. Each frame is a
//! grid of tiles; the tile at one grid cell across all frames is a
//! [`Series`]. All series of one image form a [`Book`].

use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use super::tileset::crop_tile;
use super::TileGeometry;
use crate::palette::PaletteData;

/// A template file that could not be used. Never fatal to a run.
#[derive(Debug, Error)]
pub enum TemplateLoadError {
    /// The file could not be listed or read
    #[error("cannot read template '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not a decodable image
    #[error("cannot decode template '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The image does not divide into frames and tiles
    #[error("template '{}' is {width}x{height}, {reason}", path.display())]
    Geometry { path: PathBuf, width: u32, height: u32, reason: String },
}

impl TemplateLoadError {
    pub fn path(&self) -> &Path {
        match self {
            TemplateLoadError::Io { path, .. }
            | TemplateLoadError::Decode { path, .. }
            | TemplateLoadError::Geometry { path, .. } => path,
        }
    }
}

/// One animated look: the same template cell across every frame.
#[derive(Debug, Clone)]
pub struct Series {
    /// Tile position of this series inside a template frame
    pub cell: (u32, u32),
    frames: Vec<PaletteData>,
}

impl Series {
    pub fn new(cell: (u32, u32), frames: Vec<PaletteData>) -> Self {
        Self { cell, frames }
    }

    pub fn frames(&self) -> &[PaletteData] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&PaletteData> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// All series sliced from one template image.
#[derive(Debug, Clone)]
pub struct Book {
    pub name: String,
    pub series: Vec<Series>,
}

impl Book {
    /// Slice a decoded template image into series.
    ///
    /// Cells are visited column by column. Cells that are blank or solid in
    /// every frame are skipped.
    pub fn from_image(
        name: impl Into<String>,
        image: &RgbaImage,
        geometry: &TileGeometry,
    ) -> Result<Self, String> {
        geometry.validate()?;
        let (width, height) = image.dimensions();
        let (tile_w, tile_h) = (geometry.tile_width, geometry.tile_height);

        if width == 0 || height == 0 {
            return Err("image is empty".to_string());
        }
        if width % geometry.frame_count != 0 {
            return Err(format!("width does not split into {} frames", geometry.frame_count));
        }
        let frame_width = width / geometry.frame_count;
        if frame_width % tile_w != 0 || height % tile_h != 0 {
            return Err(format!(
                "frames of {}x{} do not split into {}x{} tiles",
                frame_width, height, tile_w, tile_h
            ));
        }

        let name = name.into();
        let mut series = Vec::new();
        for cx in 0..frame_width / tile_w {
            for cy in 0..height / tile_h {
                let frames: Vec<PaletteData> = (0..geometry.frame_count)
                    .map(|f| {
                        let x = f * frame_width + cx * tile_w;
                        PaletteData::new(crop_tile(image, x, cy * tile_h, tile_w, tile_h))
                    })
                    .collect();

                if frames.iter().all(PaletteData::is_degenerate) {
                    log::trace!("{}: cell ({}, {}) is blank, skipped", name, cx, cy);
                    continue;
                }
                series.push(Series::new((cx, cy), frames));
            }
        }

        log::debug!("{}: {} series", name, series.len());
        Ok(Self { name, series })
    }

    /// Load and slice one template file.
    pub fn load(path: &Path, geometry: &TileGeometry) -> Result<Self, TemplateLoadError> {
        let image = image::open(path)
            .map_err(|source| match source {
                image::ImageError::IoError(source) => {
                    TemplateLoadError::Io { path: path.to_path_buf(), source }
                }
                source => TemplateLoadError::Decode { path: path.to_path_buf(), source },
            })?
            .to_rgba8();

        let name = path.file_stem().unwrap_or_default().to_string_lossy().into_owned();
        Self::from_image(name, &image, geometry).map_err(|reason| TemplateLoadError::Geometry {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            reason,
        })
    }
}

/// Find all template PNGs in `dir`, sorted by path.
pub fn discover_templates(dir: &Path) -> Result<Vec<PathBuf>, TemplateLoadError> {
    if !dir.is_dir() {
        return Err(TemplateLoadError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }
    // Directory names may hold glob metacharacters such as `[`.
    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join("*.png");
    let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| TemplateLoadError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
        })?
        .filter_map(Result::ok)
        .collect();
    paths.sort();
    Ok(paths)
}

/// Load every template in `dir`.
///
/// Files that fail are logged and returned alongside the books that loaded.
pub fn load_books(dir: &Path, geometry: &TileGeometry) -> (Vec<Book>, Vec<TemplateLoadError>) {
    let paths = match discover_templates(dir) {
        Ok(paths) => paths,
        Err(e) => {
            log::warn!("{}", e);
            return (Vec::new(), vec![e]);
        }
    };

    let mut books = Vec::new();
    let mut errors = Vec::new();
    for path in paths {
        match Book::load(&path, geometry) {
            Ok(book) => books.push(book),
            Err(e) => {
                log::warn!("skipping template: {}", e);
                errors.push(e);
            }
        }
    }
    (books, errors)
}

/// Snapshot of a template directory listing, used to detect changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateFingerprint(Vec<(PathBuf, u64, Option<SystemTime>)>);

impl TemplateFingerprint {
    pub fn of(dir: &Path) -> Self {
        let entries = discover_templates(dir)
            .unwrap_or_default()
            .into_iter()
            .map(|path| {
                let meta = std::fs::metadata(&path).ok();
                let len = meta.as_ref().map(|m| m.len()).unwrap_or(0);
                let modified = meta.and_then(|m| m.modified().ok());
                (path, len, modified)
            })
            .collect();
        Self(entries)
    }
}
