use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{MocorrError, Result};
use crate::frame::Frame;
use crate::movie::Movie;
use crate::raster::Raster;

use super::manifest::{read_manifest, write_manifest, ManifestEntry};
use super::mrc::{read_stack, write_stack, MrcReader};

/// Save every frame as a single float32 MRC stack (no time stamps).
pub fn save_movie_stack(movie: &Movie, path: &Path) -> Result<()> {
    if movie.is_empty() {
        return Err(MocorrError::EmptySequence);
    }
    let rasters: Vec<&Raster> = movie.frames().iter().map(|f| &f.raster).collect();
    write_stack(path, &rasters)?;
    info!(frames = movie.len(), path = %path.display(), "saved movie stack");
    Ok(())
}

/// Load a movie from an MRC stack, one section per frame, pairing sections
/// with `time_stamps` in order.
pub fn load_movie_stack(path: &Path, time_stamps: &[f64]) -> Result<Movie> {
    let sections = read_stack(path)?;
    if sections.len() != time_stamps.len() {
        return Err(MocorrError::InvalidParameter(format!(
            "{} time stamps given for {} frames",
            time_stamps.len(),
            sections.len()
        )));
    }
    Movie::from_frames(
        sections
            .into_iter()
            .zip(time_stamps)
            .map(|(raster, &t)| Frame::new(raster, t)),
    )
}

/// Save each frame to `{name}{index:02}.mrc` inside `folder`, plus a
/// `{name}.xmd` manifest that lists them with their time stamps.
///
/// Returns the manifest path.
pub fn save_movie_manifest(movie: &Movie, folder: &Path, name: &str) -> Result<PathBuf> {
    if movie.is_empty() {
        return Err(MocorrError::EmptySequence);
    }

    let mut entries = Vec::with_capacity(movie.len());
    for (index, frame) in movie.frames().iter().enumerate() {
        let image = format!("{name}{index:02}.mrc");
        write_stack(&folder.join(&image), &[&frame.raster])?;
        entries.push(ManifestEntry {
            image,
            time_stamp: frame.time_stamp,
        });
    }

    let manifest = folder.join(format!("{name}.xmd"));
    write_manifest(&manifest, &entries)?;
    info!(frames = movie.len(), path = %manifest.display(), "saved movie manifest");
    Ok(manifest)
}

/// Load the frames a manifest lists. Image paths resolve relative to the
/// manifest's directory; each file contributes its first section.
pub fn load_movie_manifest(path: &Path) -> Result<Movie> {
    let entries = read_manifest(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut movie = Movie::new();
    for entry in entries {
        let reader = MrcReader::open(&base.join(&entry.image))?;
        if reader.section_count() == 0 {
            return Err(MocorrError::InvalidMrc(format!("{} holds no frames", entry.image)));
        }
        if reader.section_count() > 1 {
            warn!(
                image = %entry.image,
                sections = reader.section_count(),
                "using only the first section"
            );
        }
        movie.add(Frame::new(reader.read_section(0)?, entry.time_stamp))?;
    }
    Ok(movie)
}
