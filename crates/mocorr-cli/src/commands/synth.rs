use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use mocorr_core::io::{load_image, save_image, save_movie_manifest, save_movie_stack};
use mocorr_core::pipeline::{synthesize_movie, synthesize_random_movie};

use crate::coefficients;

#[derive(Args)]
pub struct SynthArgs {
    /// Reference image (PNG/TIFF), taken as the scene at t = 0
    pub image: PathBuf,

    /// Number of frames, at times 0, 1, 2, ...
    #[arg(long, default_value = "10")]
    pub frames: usize,

    /// Seed for the random deformation (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use these coefficients (TOML) instead of a random deformation
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Warp supersampling factor
    #[arg(long, default_value = "1")]
    pub supersample: usize,

    /// Resize the reference before warping, as HEIGHTxWIDTH
    #[arg(long)]
    pub resize: Option<String>,

    /// Overlay a grid so the deformation is visible
    #[arg(long)]
    pub grid: bool,

    /// Grid line width in pixels
    #[arg(long, default_value = "2")]
    pub grid_width: usize,

    /// Gap between grid lines in pixels
    #[arg(long, default_value = "20")]
    pub grid_spacing: usize,

    /// Output directory
    #[arg(short, long, default_value = "synthetic")]
    pub output: PathBuf,
}

pub fn run(args: &SynthArgs) -> Result<()> {
    if args.frames == 0 {
        bail!("--frames must be at least 1");
    }

    let mut reference = load_image(&args.image)
        .with_context(|| format!("Failed to load {}", args.image.display()))?;
    if let Some(ref size) = args.resize {
        reference = reference.resize(parse_size(size)?);
    }
    if args.grid {
        reference.add_grid(args.grid_width, args.grid_spacing);
    }

    let (movie, model) = if let Some(ref model_path) = args.model {
        let model = coefficients::load(model_path)?;
        let times: Vec<f64> = (0..args.frames).map(|i| i as f64).collect();
        (synthesize_movie(&reference, &model, &times, args.supersample)?, model)
    } else {
        synthesize_random_movie(&reference, args.frames, args.seed, args.supersample)?
    };

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let reference_path = args.output.join("reference.tiff");
    save_image(&reference, &reference_path)?;
    let stack_path = args.output.join("movie.mrc");
    save_movie_stack(&movie, &stack_path)?;
    let manifest = save_movie_manifest(&movie, &args.output, "frame")?;
    let coefficients_path = args.output.join("coefficients.toml");
    coefficients::save(&model, &coefficients_path)?;

    let (h, w) = reference.shape();
    println!("Synthesized {} frames of {}x{}", movie.len(), w, h);
    println!("  Stack:        {}", stack_path.display());
    println!("  Manifest:     {}", manifest.display());
    println!("  Coefficients: {}", coefficients_path.display());

    Ok(())
}

fn parse_size(size: &str) -> Result<(usize, usize)> {
    let Some((h, w)) = size.split_once(['x', 'X']) else {
        bail!("Expected HEIGHTxWIDTH, got {size:?}");
    };
    let h: usize = h.trim().parse().with_context(|| format!("Bad height in {size:?}"))?;
    let w: usize = w.trim().parse().with_context(|| format!("Bad width in {size:?}"))?;
    if h == 0 || w == 0 {
        bail!("Size must be non-zero, got {size:?}");
    }
    Ok((h, w))
}
