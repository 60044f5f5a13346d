use crate::config::{config_path, load_config, save_config, Config};
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::web::serve;
use clap::{Args, Parser, Subcommand};
use image::DynamicImage;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

pub const USAGE: &str = "Usage: age-gender <image_path>";

#[derive(Parser)]
#[command(
    name = "age-gender",
    version,
    about = "Estimate gender and age range of faces in a photo"
)]
pub struct Cli {
    /// Image to analyse
    pub image: Option<PathBuf>,
    #[command(flatten)]
    pub model: ModelArgs,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Default)]
pub struct ModelArgs {
    /// Directory containing the ONNX models
    #[arg(long)]
    pub models: Option<PathBuf>,
    /// Minimum detector confidence for a face
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f32>,
}

impl ModelArgs {
    fn apply(&self, cfg: &mut Config) {
        if let Some(dir) = &self.models {
            cfg.model_dir = dir.clone();
        }
        if let Some(t) = self.threshold {
            cfg.confidence_threshold = t;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the upload form web server
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Write the effective configuration to the config file
    InitConfig,
}

/// How a CLI invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Usage,
    ImageNotFound,
    NoFace,
    /// Number of faces printed.
    Reported(usize),
    ConfigWritten,
    Served,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Usage | Outcome::ImageNotFound => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        }
    }
}

pub fn parse_threshold(s: &str) -> std::result::Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=1"))
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub fn run_cli() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();
    match execute(cli, &mut stdout) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    /// Layers top-level flags, then subcommand flags, over `base`.
    pub fn effective_config(&self, mut base: Config) -> Config {
        self.model.apply(&mut base);
        if let Some(Commands::Serve { bind, model }) = &self.command {
            model.apply(&mut base);
            if let Some(bind) = bind {
                base.bind = bind.clone();
            }
        }
        base
    }
}

pub fn execute(cli: Cli, out: &mut impl Write) -> Result<Outcome> {
    let cfg = cli.effective_config(load_config());
    match cli.command {
        Some(Commands::Serve { .. }) => {
            serve_blocking(cfg)?;
            Ok(Outcome::Served)
        }
        Some(Commands::InitConfig) => {
            save_config(&cfg)?;
            info!(path = %config_path().display(), "configuration written");
            Ok(Outcome::ConfigWritten)
        }
        None => {
            let Some(path) = cli.image else {
                writeln!(out, "{USAGE}")?;
                return Ok(Outcome::Usage);
            };
            let Some(image) = open_image(&path) else {
                writeln!(out, "Image not found: {}", path.display())?;
                return Ok(Outcome::ImageNotFound);
            };
            let pipeline = Pipeline::load(&cfg)?;
            report_faces(&pipeline, &image, out)
        }
    }
}

fn open_image(path: &Path) -> Option<DynamicImage> {
    match image::open(path) {
        Ok(img) => Some(img),
        Err(e) => {
            debug!(path = %path.display(), "failed to open image: {e}");
            None
        }
    }
}

/// Prints one `"<gender>, <age>"` line per classified face.
pub fn report_faces(
    pipeline: &Pipeline,
    image: &DynamicImage,
    out: &mut impl Write,
) -> Result<Outcome> {
    let analysis = pipeline.analyze(image)?;
    if analysis.boxes.is_empty() {
        writeln!(out, "No face detected")?;
        return Ok(Outcome::NoFace);
    }
    for face in &analysis.faces {
        writeln!(out, "{face}")?;
    }
    Ok(Outcome::Reported(analysis.faces.len()))
}

fn serve_blocking(cfg: Config) -> Result<()> {
    let pipeline = Pipeline::load(&cfg)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(pipeline, &cfg))
}
