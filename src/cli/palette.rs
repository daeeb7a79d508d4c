//! Palette command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::palette::{color_frequencies, extract_full_palette, CombatPalette, PaletteData};

use super::{open_image, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the palette command
pub fn run_palette(input: &Path, canonical: bool, json: bool) -> ExitCode {
    let image = match open_image(input) {
        Ok(image) => image,
        Err(code) => return code,
    };

    if json {
        let palette = if canonical {
            let data = PaletteData::new(image);
            CombatPalette::from_colors(data.unique_colors())
        } else {
            CombatPalette::from_image(&image)
        };
        return match serde_json::to_string_pretty(&palette) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: Failed to serialize palette: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    let mut counts = color_frequencies(&extract_full_palette(&image));
    if canonical {
        counts.sort_by(|a, b| b.1.cmp(&a.1));
    }

    println!(
        "{} ({}x{}, {} color{})",
        input.display(),
        image.width(),
        image.height(),
        counts.len(),
        if counts.len() == 1 { "" } else { "s" }
    );
    for (index, (color, count)) in counts.iter().enumerate() {
        println!("  {:>3}  {}  {:>6} px", index, color, count);
    }

    ExitCode::from(EXIT_SUCCESS)
}
