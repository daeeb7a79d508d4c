//! Match command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::autotile::{AtlasMetadata, AutotileEngine};
use crate::config::{load_config, merge_cli_overrides, CliOverrides};
use crate::palette::SimilarityMode;
use crate::progress::{ConsoleProgress, NullProgress, ProgressSink};

use super::{open_image, save_image, sibling_path, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the match command
pub fn run_match(
    input: &Path,
    output: Option<&Path>,
    metadata: Option<&Path>,
    templates: Option<PathBuf>,
    no_recolor: bool,
    exact: bool,
    jobs: Option<usize>,
    config_path: Option<&Path>,
    show_progress: bool,
) -> ExitCode {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let overrides = CliOverrides {
        templates,
        jobs,
        similarity: exact.then_some(SimilarityMode::Exact),
        color_conversion: no_recolor.then_some(false),
    };
    merge_cli_overrides(&mut config, &overrides);

    if !config.templates.dir.is_dir() {
        eprintln!("Error: Template directory '{}' not found", config.templates.dir.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let tileset = match open_image(input) {
        Ok(image) => image,
        Err(code) => return code,
    };

    let options = config.engine_options();
    let mut engine = AutotileEngine::new(&config.templates.dir, options);
    let progress: Box<dyn ProgressSink> =
        if show_progress { Box::new(ConsoleProgress::new()) } else { Box::new(NullProgress) };

    let result = match engine.run(&tileset, config.matching.color_conversion, progress.as_ref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let Some(atlas) = &result.atlas else {
        println!("No autotiles detected in {}", input.display());
        return ExitCode::from(EXIT_SUCCESS);
    };

    let atlas_path =
        output.map(Path::to_path_buf).unwrap_or_else(|| sibling_path(input, "_autotiles.png"));
    if let Err(code) = save_image(atlas, &atlas_path) {
        return code;
    }

    let metadata_path =
        metadata.map(Path::to_path_buf).unwrap_or_else(|| atlas_path.with_extension("json"));
    let image_name = atlas_path.file_name().unwrap_or_default().to_string_lossy().to_string();
    let meta = AtlasMetadata::new(image_name, &options.geometry, &result.columns, &result.mapping);
    let json = match serde_json::to_string_pretty(&meta) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: Failed to serialize metadata: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Err(e) = std::fs::write(&metadata_path, json) {
        eprintln!("Error: Failed to write '{}': {}", metadata_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!(
        "Matched: {} ({} autotile{}, {} tile{} mapped, {}x{})",
        atlas_path.display(),
        result.columns.len(),
        if result.columns.len() == 1 { "" } else { "s" },
        result.mapping.len(),
        if result.mapping.len() == 1 { "" } else { "s" },
        atlas.width(),
        atlas.height()
    );
    println!("Metadata: {}", metadata_path.display());

    ExitCode::from(EXIT_SUCCESS)
}
