//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod autotile;
mod palette;
mod recolor;

use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::color::Rgb;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Tileforge - palette remapping and autotile detection for tilesets
#[derive(Parser)]
#[command(name = "tileforge")]
#[command(about = "Tileforge - palette remapping and autotile detection for tilesets")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect autotiles in a tileset and build an animated atlas
    Match {
        /// Tileset PNG to scan
        input: PathBuf,

        /// Output atlas PNG (default: {input}_autotiles.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write atlas metadata JSON to this path (default: next to the atlas)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Template directory (overrides tileforge.toml)
        #[arg(short, long)]
        templates: Option<PathBuf>,

        /// Keep template colors instead of recoloring to the tileset
        #[arg(long)]
        no_recolor: bool,

        /// Only accept templates whose pattern is identical to the tile
        #[arg(long)]
        exact: bool,

        /// Number of worker threads (0 = all cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Path to tileforge.toml (default: search upward from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print stage progress to stderr
        #[arg(long)]
        progress: bool,
    },

    /// Print the palette of an image
    Palette {
        /// Image to read
        input: PathBuf,

        /// Order colors by frequency instead of first appearance
        #[arg(long)]
        canonical: bool,

        /// Print a combat palette as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace colors in an image
    Recolor {
        /// Image to recolor
        input: PathBuf,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Color replacement as FROM=TO, e.g. "#FF0000=#00FF00" (repeatable)
        #[arg(short, long = "map", value_name = "FROM=TO")]
        maps: Vec<String>,

        /// Combat palette JSON the image is drawn in
        #[arg(long, requires = "palette_to")]
        palette_from: Option<PathBuf>,

        /// Combat palette JSON to swap to
        #[arg(long, requires = "palette_from")]
        palette_to: Option<PathBuf>,
    },

    /// Turn a colorkey into transparency
    Colorkey {
        /// Image to convert
        input: PathBuf,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Colorkey color
        #[arg(short, long, default_value = "#000000")]
        key: String,
    },
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Match {
            input,
            output,
            metadata,
            templates,
            no_recolor,
            exact,
            jobs,
            config,
            progress,
        } => autotile::run_match(
            &input,
            output.as_deref(),
            metadata.as_deref(),
            templates,
            no_recolor,
            exact,
            jobs,
            config.as_deref(),
            progress,
        ),
        Commands::Palette { input, canonical, json } => {
            palette::run_palette(&input, canonical, json)
        }
        Commands::Recolor { input, output, maps, palette_from, palette_to } => {
            recolor::run_recolor(
                &input,
                &output,
                &maps,
                palette_from.as_deref(),
                palette_to.as_deref(),
            )
        }
        Commands::Colorkey { input, output, key } => recolor::run_colorkey(&input, &output, &key),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    // A logger may already be installed when embedded; keep it.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

/// Open an image as RGBA, reporting failures on stderr.
pub(crate) fn open_image(path: &Path) -> Result<image::RgbaImage, ExitCode> {
    match image::open(path) {
        Ok(image) => Ok(image.to_rgba8()),
        Err(e) => {
            eprintln!("Error: Cannot open '{}': {}", path.display(), e);
            Err(ExitCode::from(EXIT_ERROR))
        }
    }
}

/// Save an image, reporting failures on stderr.
pub(crate) fn save_image(image: &image::RgbaImage, path: &Path) -> Result<(), ExitCode> {
    image.save(path).map_err(|e| {
        eprintln!("Error: Failed to write '{}': {}", path.display(), e);
        ExitCode::from(EXIT_ERROR)
    })
}

/// Parse a `FROM=TO` color pair.
pub(crate) fn parse_color_pair(s: &str) -> Result<(Rgb, Rgb), String> {
    let (from, to) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid mapping '{}': expected FROM=TO", s))?;
    let from: Rgb = from.trim().parse().map_err(|e| format!("Invalid color '{}': {}", from, e))?;
    let to: Rgb = to.trim().parse().map_err(|e| format!("Invalid color '{}': {}", to, e))?;
    Ok((from, to))
}

/// Default output path: `{input stem}{suffix}` next to the input.
pub(crate) fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.parent().unwrap_or(Path::new(".")).join(format!("{}{}", stem, suffix))
}
