//! Tileforge - palette indexing and autotile matching for tactical RPG tilesets
//!
//! This library provides functionality to:
//! - Extract and canonicalize palettes from sprite and tile images
//! - Remap pixels between palettes, including colorkey transparency
//! - Match tileset tiles against animated autotile templates and build a
//!   recolored autotile atlas

pub mod autotile;
pub mod cli;
pub mod color;
pub mod config;
pub mod palette;
pub mod progress;
