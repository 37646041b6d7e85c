//! # Saorsa Tiles CLI
//!
//! Headless host for the tiled canvas engine.
//!
//! ## Subcommands
//!
//! - `replay` - run a JSON command script against a fresh canvas, then save
//!   the composite and optionally the final screen frame
//! - `retile` - load an image into tiles and write the composite back out
//!
//! ## Configuration
//!
//! A JSON [`CanvasConfig`] file can be passed with `--config`; `--tile-size`
//! overrides its tile edge. The viewport size comes from `--width`/`--height`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use canvas_core::{CanvasConfig, Command, Size};
use canvas_renderer::CanvasEngine;
use clap::{Parser, Subcommand};

/// Command-line arguments for canvas-cli.
#[derive(Debug, Clone, Parser)]
#[command(name = "canvas-cli")]
#[command(about = "Headless host for the Saorsa Tiles canvas engine")]
#[command(version)]
pub struct CliArgs {
    /// JSON canvas configuration file
    #[arg(long, global = true, env = "SAORSA_TILES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long, global = true, default_value = "1280", env = "SAORSA_TILES_WIDTH")]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, global = true, default_value = "720", env = "SAORSA_TILES_HEIGHT")]
    pub height: u32,

    /// Tile edge in pixels, overriding the configuration file
    #[arg(long, global = true, env = "SAORSA_TILES_TILE_SIZE")]
    pub tile_size: Option<u32>,

    /// What to do
    #[command(subcommand)]
    pub command: HostCommand,
}

/// Subcommands of canvas-cli.
#[derive(Debug, Clone, Subcommand)]
pub enum HostCommand {
    /// Replay a JSON command script and save the canvas
    Replay {
        /// Script file: a JSON array of commands
        #[arg(long)]
        script: PathBuf,
        /// Where to save the canvas composite (format from extension)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Where to save the final screen frame as PNG
        #[arg(long)]
        frame: Option<PathBuf>,
    },
    /// Load an image into tiles and save the composite
    Retile {
        /// Image to load
        #[arg(long)]
        input: PathBuf,
        /// Where to write the composite (format from extension)
        #[arg(long)]
        output: PathBuf,
    },
}

/// Host configuration assembled from arguments and the optional config file.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Canvas engine configuration.
    pub canvas: CanvasConfig,
    /// Viewport size in pixels.
    pub viewport: Size,
}

impl HostConfig {
    /// Build the host configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or the resulting
    /// configuration is invalid.
    pub fn from_args(args: &CliArgs) -> anyhow::Result<Self> {
        let mut canvas = match &args.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                CanvasConfig::from_json(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => CanvasConfig::default(),
        };
        if let Some(tile_size) = args.tile_size {
            canvas.tile_size = tile_size;
        }
        canvas.validate()?;

        Ok(Self {
            canvas,
            viewport: Size::new(
                f32::from(clamp_u16(args.width)),
                f32::from(clamp_u16(args.height)),
            ),
        })
    }

    /// Create an engine for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be created.
    pub fn engine(&self) -> anyhow::Result<CanvasEngine> {
        Ok(CanvasEngine::new(self.canvas.clone(), self.viewport)?)
    }
}

/// Result of a script replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Commands applied.
    pub commands: usize,
    /// Tiles resident at the end.
    pub tiles: usize,
    /// Text items at the end.
    pub annotations: usize,
    /// Size of the saved composite, if one was written.
    pub saved: Option<(u32, u32)>,
}

/// Replay a command script against a fresh canvas.
///
/// # Errors
///
/// Returns an error if the script cannot be read or parsed, a command fails,
/// or an output cannot be written.
pub fn replay(
    config: &HostConfig,
    script: &Path,
    output: Option<&Path>,
    frame: Option<&Path>,
) -> anyhow::Result<ReplaySummary> {
    let json = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let commands = Command::parse_script(&json)
        .with_context(|| format!("parsing script {}", script.display()))?;

    let mut engine = config.engine()?;
    engine.on_zoom_changed(|percent| tracing::debug!("Zoom now {percent}%"));

    let total = commands.len();
    for (i, command) in commands.into_iter().enumerate() {
        tracing::trace!("Applying command {}/{total}: {command:?}", i + 1);
        engine
            .apply(command)
            .with_context(|| format!("command {} of {total}", i + 1))?;
    }

    let saved = match output {
        Some(path) => Some(
            engine
                .save_to(path)
                .with_context(|| format!("saving {}", path.display()))?,
        ),
        None => None,
    };
    if let Some(path) = frame {
        engine
            .render()?
            .save_png(path)
            .with_context(|| format!("writing frame {}", path.display()))?;
    }

    let summary = ReplaySummary {
        commands: total,
        tiles: engine.store().len(),
        annotations: engine.annotations().len(),
        saved,
    };
    tracing::info!(
        "Replayed {} commands: {} tiles, {} text items",
        summary.commands,
        summary.tiles,
        summary.annotations
    );
    Ok(summary)
}

/// Load an image into tiles and save the composite.
///
/// Returns the size of the written image.
///
/// # Errors
///
/// Returns an error if the input cannot be decoded or the output cannot be written.
pub fn retile(config: &HostConfig, input: &Path, output: &Path) -> anyhow::Result<(u32, u32)> {
    let mut engine = config.engine()?;
    let loaded = engine
        .load_from(input)
        .with_context(|| format!("loading {}", input.display()))?;
    if engine.store().len() < loaded {
        tracing::warn!(
            "Only {} of {loaded} tiles stayed resident; \
             raise base_tile_capacity to keep the whole image",
            engine.store().len()
        );
    }
    let size = engine
        .save_to(output)
        .with_context(|| format!("saving {}", output.display()))?;
    Ok(size)
}

/// Run the parsed command line.
///
/// # Errors
///
/// Returns an error from the selected subcommand.
pub fn run(args: &CliArgs) -> anyhow::Result<()> {
    let config = HostConfig::from_args(args)?;
    match &args.command {
        HostCommand::Replay {
            script,
            output,
            frame,
        } => {
            replay(&config, script, output.as_deref(), frame.as_deref())?;
        }
        HostCommand::Retile { input, output } => {
            let (width, height) = retile(&config, input, output)?;
            tracing::info!("Wrote {width}x{height} image to {}", output.display());
        }
    }
    Ok(())
}

fn clamp_u16(value: u32) -> u16 {
    u16::try_from(value.max(1)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["canvas-cli"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn test_defaults() {
        let parsed = args(&["replay", "--script", "s.json"]);
        let config = HostConfig::from_args(&parsed).expect("config");
        assert_eq!(config.canvas.tile_size, 256);
        assert!((config.viewport.width - 1280.0).abs() < f32::EPSILON);
        assert!((config.viewport.height - 720.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_tile_size_overrides_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("canvas.json");
        std::fs::write(&path, r#"{"tile_size": 128, "base_tile_capacity": 64}"#).expect("write");

        let parsed = args(&[
            "--config",
            path.to_str().expect("utf8 path"),
            "--tile-size",
            "64",
            "replay",
            "--script",
            "s.json",
        ]);
        let config = HostConfig::from_args(&parsed).expect("config");
        assert_eq!(config.canvas.tile_size, 64);
        assert_eq!(config.canvas.base_tile_capacity, 64);
    }

    #[test]
    fn test_invalid_tile_size_rejected() {
        let parsed = args(&["--tile-size", "0", "replay", "--script", "s.json"]);
        assert!(HostConfig::from_args(&parsed).is_err());
    }

    #[test]
    fn test_replay_script_writes_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("session.json");
        let output = dir.path().join("canvas.png");
        let frame = dir.path().join("frame.png");
        std::fs::write(
            &script,
            r##"[
                {"op": "set_brush_color", "color": "#3366cc"},
                {"op": "set_brush_size", "size": 5},
                {"op": "pointer_down", "x": 10, "y": 10},
                {"op": "pointer_move", "x": 300, "y": 10},
                {"op": "pointer_up", "x": 300, "y": 10},
                {"op": "add_text", "x": 100, "y": 100, "text": "label"}
            ]"##,
        )
        .expect("write");

        let config = HostConfig::from_args(&args(&[
            "--width", "400", "--height", "300", "replay", "--script", "x",
        ]))
        .expect("config");
        let summary = replay(&config, &script, Some(&output), Some(&frame)).expect("replay");

        assert_eq!(summary.commands, 6);
        assert_eq!(summary.tiles, 2);
        assert_eq!(summary.annotations, 1);
        assert_eq!(summary.saved, Some((512, 256)));
        let rendered = image::open(&frame).expect("frame");
        assert_eq!((rendered.width(), rendered.height()), (400, 300));
    }

    #[test]
    fn test_replay_reports_failing_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("bad.json");
        std::fs::write(&script, r#"[{"op": "save", "path": "nowhere.png"}]"#).expect("write");

        let config = HostConfig::from_args(&args(&["replay", "--script", "x"])).expect("config");
        let err = replay(&config, &script, None, None).expect_err("empty canvas");
        assert!(format!("{err:#}").contains("command 1 of 1"));
    }

    #[test]
    fn test_retile_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        image::RgbaImage::from_pixel(100, 70, image::Rgba([20, 40, 60, 255]))
            .save(&input)
            .expect("write input");

        let config = HostConfig::from_args(&args(&[
            "--tile-size",
            "32",
            "retile",
            "--input",
            "x",
            "--output",
            "y",
        ]))
        .expect("config");
        let size = retile(&config, &input, &output).expect("retile");

        // Four columns and three rows of 32 px tiles cover the image.
        assert_eq!(size, (128, 96));
        let written = image::open(&output).expect("decode").to_rgba8();
        assert_eq!(written.get_pixel(50, 50).0, [20, 40, 60, 255]);
        assert_eq!(written.get_pixel(120, 90).0, [255, 255, 255, 255]);
    }
}
