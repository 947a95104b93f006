use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mocorr_core::io::manifest::read_manifest;
use mocorr_core::io::MrcReader;

#[derive(Args)]
pub struct InfoArgs {
    /// Input MRC stack or .xmd movie manifest
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    if args.file.extension().and_then(|e| e.to_str()) == Some("xmd") {
        return manifest_info(args);
    }

    let reader = MrcReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let header = &reader.header;

    println!("File:        {}", args.file.display());
    println!("Frames:      {}", header.nz);
    println!("Dimensions:  {}x{}", header.nx, header.ny);
    println!("Mode:        {:?}", header.mode);
    println!(
        "Byte order:  {}",
        if header.little_endian { "little-endian" } else { "big-endian" }
    );
    println!("Min/Max:     {} / {}", header.dmin, header.dmax);
    println!("Mean:        {}", header.dmean);
    println!("RMS:         {}", header.rms);
    if header.nsymbt > 0 {
        println!("Ext header:  {} bytes", header.nsymbt);
    }

    let total_mb = (header.section_byte_size() * reader.section_count()) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}

fn manifest_info(args: &InfoArgs) -> Result<()> {
    let entries = read_manifest(&args.file)
        .with_context(|| format!("Failed to read manifest {}", args.file.display()))?;

    println!("Manifest:    {}", args.file.display());
    println!("Frames:      {}", entries.len());
    for entry in &entries {
        println!("  {:<24}t = {}", entry.image, entry.time_stamp);
    }
    Ok(())
}
