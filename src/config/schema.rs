//! Configuration schema types for `tileforge.toml`
//!
//! Defines the structure and validation rules for tileforge configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::autotile::{EngineOptions, MatchOptions, TileGeometry};
use crate::palette::SimilarityMode;

/// Template source section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding template PNGs
    #[serde(default = "default_template_dir")]
    pub dir: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self { dir: default_template_dir() }
    }
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("autotiles")
}

/// Tile and frame geometry, shared with the engine that plays the atlas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    #[serde(default = "default_tile_size")]
    pub tile_width: u32,
    #[serde(default = "default_tile_size")]
    pub tile_height: u32,
    /// Frames per autotile animation
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            tile_width: default_tile_size(),
            tile_height: default_tile_size(),
            frame_count: default_frame_count(),
        }
    }
}

fn default_tile_size() -> u32 {
    16
}

fn default_frame_count() -> u32 {
    16
}

/// Matching behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// How tile patterns are compared
    #[serde(default)]
    pub similarity: SimilarityMode,
    /// Exclusive distance limit; defaults to the tile's pixel count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<u32>,
    /// Recolor matched templates to the tileset's colors
    #[serde(default = "default_true")]
    pub color_conversion: bool,
    /// Worker threads (0 = all cores)
    #[serde(default)]
    pub jobs: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity: SimilarityMode::default(),
            max_distance: None,
            color_conversion: true,
            jobs: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Complete tileforge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "geometry.tile_width")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tileforge.toml: '{}' {}", self.field, self.message)
    }
}

impl ForgeConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("geometry.tile_width", self.geometry.tile_width),
            ("geometry.tile_height", self.geometry.tile_height),
            ("geometry.frame_count", self.geometry.frame_count),
        ] {
            if value == 0 {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be a positive integer".to_string(),
                });
            }
        }

        if self.matching.max_distance == Some(0) {
            errors.push(ConfigValidationError {
                field: "matching.max_distance".to_string(),
                message: "must be positive, nothing scores below 0".to_string(),
            });
        }

        errors
    }

    pub fn geometry(&self) -> TileGeometry {
        TileGeometry {
            tile_width: self.geometry.tile_width,
            tile_height: self.geometry.tile_height,
            frame_count: self.geometry.frame_count,
        }
    }

    /// Engine options described by this configuration.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            geometry: self.geometry(),
            matching: MatchOptions {
                mode: self.matching.similarity,
                max_distance: self.matching.max_distance,
                jobs: self.matching.jobs,
            },
        }
    }
}
