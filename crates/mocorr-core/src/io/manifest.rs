//! XMIPP STAR metadata listing the frames of a movie.
//!
//! ```text
//! # XMIPP_STAR_1 *
//!
//! data_movie_stack
//! loop_
//!   _image
//!   _time
//!   frame00.mrc  0
//!   frame01.mrc  1.5
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{MocorrError, Result};

const STAR_MAGIC: &str = "# XMIPP_STAR_1 *";
const BLOCK_NAME: &str = "data_movie_stack";
const IMAGE_LABEL: &str = "_image";
const TIME_LABEL: &str = "_time";

/// One frame reference: a file name relative to the manifest and its time stamp.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestEntry {
    pub image: String,
    pub time_stamp: f64,
}

pub fn format_manifest(entries: &[ManifestEntry]) -> String {
    let rule = "#".repeat(74);
    let mut out = String::new();
    out.push_str(STAR_MAGIC);
    out.push('\n');
    out.push_str(&rule);
    out.push_str("\n# Movie stack: each _image is an MRC file holding one frame, _time is its time stamp\n");
    out.push_str(&rule);
    out.push_str("\n\n");
    out.push_str(BLOCK_NAME);
    out.push_str("\nloop_\n  _image\n  _time\n");
    for entry in entries {
        let _ = writeln!(out, "  {}  {}", entry.image, entry.time_stamp);
    }
    out
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    if let Some(bad) = entries.iter().find(|e| e.image.is_empty() || e.image.contains(char::is_whitespace)) {
        return Err(MocorrError::InvalidManifest(format!(
            "image name {:?} cannot be stored in a manifest",
            bad.image
        )));
    }
    fs::write(path, format_manifest(entries))?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    parse_manifest(&fs::read_to_string(path)?)
}

/// Parse the first `loop_` of a manifest. Columns are located by label, so
/// extra labels are tolerated.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestEntry>> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    if !lines.by_ref().any(|(_, l)| l.starts_with("data_")) {
        return Err(MocorrError::InvalidManifest("no data block".into()));
    }
    match lines.next() {
        Some((_, "loop_")) => {}
        Some((n, other)) => {
            return Err(MocorrError::InvalidManifest(format!(
                "line {n}: expected loop_, found {other:?}"
            )))
        }
        None => return Err(MocorrError::InvalidManifest("missing loop_".into())),
    }

    let mut labels = Vec::new();
    let mut rows = Vec::new();
    for (n, line) in lines {
        if line.starts_with('_') && rows.is_empty() {
            labels.push(line.split_whitespace().next().unwrap_or(line));
        } else if line.starts_with("data_") || line == "loop_" {
            break;
        } else {
            rows.push((n, line));
        }
    }

    let column = |label: &str| {
        labels
            .iter()
            .position(|l| *l == label)
            .ok_or_else(|| MocorrError::InvalidManifest(format!("missing {label} label")))
    };
    let image_col = column(IMAGE_LABEL)?;
    let time_col = column(TIME_LABEL)?;

    rows.into_iter()
        .map(|(n, line)| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != labels.len() {
                return Err(MocorrError::InvalidManifest(format!(
                    "line {n}: expected {} fields, found {}",
                    labels.len(),
                    fields.len()
                )));
            }
            let time_stamp = fields[time_col].parse::<f64>().map_err(|_| {
                MocorrError::InvalidManifest(format!("line {n}: bad time stamp {:?}", fields[time_col]))
            })?;
            Ok(ManifestEntry {
                image: fields[image_col].to_string(),
                time_stamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_header_and_rows() {
        let text = format_manifest(&[ManifestEntry {
            image: "frame00.mrc".into(),
            time_stamp: 1.5,
        }]);
        assert!(text.starts_with(STAR_MAGIC));
        assert!(text.contains("data_movie_stack\nloop_\n  _image\n  _time\n"));
        assert!(text.ends_with("  frame00.mrc  1.5\n"));
    }

    #[test]
    fn parses_reordered_and_extra_labels() {
        let text = "data_movie_stack\nloop_\n _time\n _enabled\n _image\n 2.0 1 b.mrc\n 0.5 1 a.mrc\n";
        let entries = parse_manifest(text).unwrap();
        assert_eq!(
            entries,
            vec![
                ManifestEntry {
                    image: "b.mrc".into(),
                    time_stamp: 2.0
                },
                ManifestEntry {
                    image: "a.mrc".into(),
                    time_stamp: 0.5
                },
            ]
        );
    }

    #[test]
    fn rejects_malformed_manifests() {
        assert!(parse_manifest("loop_\n _image\n _time\n").is_err());
        assert!(parse_manifest("data_x\n _image\n").is_err());
        assert!(parse_manifest("data_x\nloop_\n _image\n a.mrc\n").is_err());
        assert!(parse_manifest("data_x\nloop_\n _image\n _time\n a.mrc\n").is_err());
        assert!(parse_manifest("data_x\nloop_\n _image\n _time\n a.mrc soon\n").is_err());
    }
}
