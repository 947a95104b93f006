use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use mocorr_core::io::{load_movie_manifest, load_movie_stack, save_image_stretched, save_movie_manifest, MrcReader};
use mocorr_core::movie::Movie;
use mocorr_core::pipeline::config::RelaxationMode;
use mocorr_core::pipeline::{run_correction, CorrectionConfig};

use crate::coefficients;
use crate::progress::BarReporter;
use crate::summary::{print_correction_result, print_correction_summary};

#[derive(Clone, ValueEnum)]
pub enum ModeArg {
    Sequential,
    Parallel,
}

#[derive(Args)]
pub struct CorrectArgs {
    /// Input MRC stack or .xmd movie manifest
    pub input: PathBuf,

    /// Comma-separated frame time stamps for an MRC stack (default 0, 1, 2, ...)
    #[arg(long, value_delimiter = ',')]
    pub times: Vec<f64>,

    /// Correction config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Relaxation variant (overrides the config)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Only remove whole-frame shifts
    #[arg(long)]
    pub global_only: bool,

    /// Warp supersampling factor (overrides the config)
    #[arg(long)]
    pub supersample: Option<usize>,

    /// Output directory
    #[arg(short, long, default_value = "corrected")]
    pub output: PathBuf,
}

pub fn run(args: &CorrectArgs) -> Result<()> {
    let config = build_config(args)?;
    let movie = load_movie(&args.input, &args.times)?;

    print_correction_summary(&config, &args.input, &args.output, &movie);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let reporter = BarReporter::new();
    let output = run_correction(movie, &config, &reporter)?;
    reporter.finish();

    let manifest = save_movie_manifest(&output.movie, &args.output, "corrected")
        .context("Failed to save corrected movie")?;
    let sum_path = args.output.join("sum.tiff");
    save_image_stretched(&output.movie.sum_frames()?, &sum_path)
        .with_context(|| format!("Failed to save {}", sum_path.display()))?;
    let coefficients_path = args.output.join("coefficients.toml");
    if output.model.is_fitted() {
        coefficients::save(&output.model, &coefficients_path)?;
    }

    print_correction_result(&output);
    println!("\nCorrected movie saved to {}", manifest.display());
    println!("Summed image saved to {}", sum_path.display());
    if output.model.is_fitted() {
        println!("Model saved to {}", coefficients_path.display());
    }

    Ok(())
}

fn build_config(args: &CorrectArgs) -> Result<CorrectionConfig> {
    let mut config: CorrectionConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid correction config")?
    } else {
        CorrectionConfig::default()
    };

    if let Some(ref mode) = args.mode {
        config.relaxation.mode = match mode {
            ModeArg::Sequential => RelaxationMode::Sequential,
            ModeArg::Parallel => RelaxationMode::ParallelRelaxed,
        };
    }
    if args.global_only {
        config.local = false;
    }
    if let Some(supersample) = args.supersample {
        config.warp.supersample = supersample;
    }
    config.validate()?;
    Ok(config)
}

fn load_movie(path: &Path, times: &[f64]) -> Result<Movie> {
    if path.extension().and_then(|e| e.to_str()) == Some("xmd") {
        if !times.is_empty() {
            bail!("--times cannot be combined with a manifest; time stamps come from the manifest");
        }
        return load_movie_manifest(path).with_context(|| format!("Failed to load {}", path.display()));
    }

    let times = if times.is_empty() {
        let count = MrcReader::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .section_count();
        (0..count).map(|i| i as f64).collect()
    } else {
        times.to_vec()
    };
    load_movie_stack(path, &times).with_context(|| format!("Failed to load {}", path.display()))
}
