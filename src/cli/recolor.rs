//! Recolor and colorkey command implementations

use std::path::Path;
use std::process::ExitCode;

use crate::color::Rgb;
use crate::palette::{convert_colorkey_to_alpha, convert_colors, ColorMap, CombatPalette};

use super::{open_image, parse_color_pair, save_image, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the recolor command
pub fn run_recolor(
    input: &Path,
    output: &Path,
    maps: &[String],
    palette_from: Option<&Path>,
    palette_to: Option<&Path>,
) -> ExitCode {
    let mut map = ColorMap::new();

    if let (Some(from), Some(to)) = (palette_from, palette_to) {
        let from = match read_palette(from) {
            Ok(palette) => palette,
            Err(code) => return code,
        };
        let to = match read_palette(to) {
            Ok(palette) => palette,
            Err(code) => return code,
        };
        map = from.remap_to(&to);
    }

    // Explicit pairs win over palette swaps.
    for pair in maps {
        match parse_color_pair(pair) {
            Ok((from, to)) => {
                map.insert(from, to);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        }
    }

    if map.is_empty() {
        eprintln!("Error: No color mappings given (use --map or --palette-from/--palette-to)");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let image = match open_image(input) {
        Ok(image) => image,
        Err(code) => return code,
    };
    let converted = convert_colors(&image, &map);
    if let Err(code) = save_image(&converted, output) {
        return code;
    }

    println!(
        "Recolored: {} ({} mapping{})",
        output.display(),
        map.len(),
        if map.len() == 1 { "" } else { "s" }
    );
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the colorkey command
pub fn run_colorkey(input: &Path, output: &Path, key: &str) -> ExitCode {
    let key: Rgb = match key.parse() {
        Ok(color) => color,
        Err(e) => {
            eprintln!("Error: Invalid --key '{}': {}", key, e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let image = match open_image(input) {
        Ok(image) => image,
        Err(code) => return code,
    };
    let converted = convert_colorkey_to_alpha(&image, key);
    if let Err(code) = save_image(&converted, output) {
        return code;
    }

    let cleared = converted.pixels().filter(|p| p.0[3] == 0).count();
    println!(
        "Colorkey {}: {} ({} pixel{} cleared)",
        key,
        output.display(),
        cleared,
        if cleared == 1 { "" } else { "s" }
    );
    ExitCode::from(EXIT_SUCCESS)
}

fn read_palette(path: &Path) -> Result<CombatPalette, ExitCode> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: Cannot read '{}': {}", path.display(), e);
        ExitCode::from(EXIT_ERROR)
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        eprintln!("Error: Invalid palette '{}': {}", path.display(), e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}
