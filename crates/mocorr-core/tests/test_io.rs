#[allow(dead_code)]
mod common;

use std::fs;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use tempfile::TempDir;

use mocorr_core::error::MocorrError;
use mocorr_core::frame::Frame;
use mocorr_core::io::image_io::{load_image, save_png, save_tiff};
use mocorr_core::io::manifest::read_manifest;
use mocorr_core::io::{
    load_movie_manifest, load_movie_stack, read_stack, save_movie_manifest, save_movie_stack, write_stack, MrcMode,
    MrcReader,
};
use mocorr_core::movie::Movie;
use mocorr_core::raster::Raster;

fn ramp_movie(count: usize) -> Movie {
    Movie::from_frames((0..count).map(|i| {
        let data = Array2::from_shape_fn((6, 9), |(r, c)| (r * 9 + c) as f32 * 0.5 - i as f32);
        Frame::from_array(data, i as f64 * 0.25)
    }))
    .unwrap()
}

/// Minimal little-endian MRC header for hand-built files.
fn raw_header(nx: i32, ny: i32, nz: i32, mode: i32) -> Vec<u8> {
    let mut buf = vec![0u8; 1024];
    for (i, v) in [nx, ny, nz, mode].iter().enumerate() {
        buf[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
    buf[208..212].copy_from_slice(b"MAP ");
    buf[212] = 0x44;
    buf[213] = 0x44;
    buf
}

#[test]
fn test_mrc_stack_round_trip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stack.mrc");
    let movie = ramp_movie(3);
    let rasters: Vec<&Raster> = movie.frames().iter().map(|f| &f.raster).collect();
    write_stack(&path, &rasters).unwrap();

    let reader = MrcReader::open(&path).unwrap();
    assert_eq!(reader.header.mode, MrcMode::Float32);
    assert_eq!((reader.header.nx, reader.header.ny, reader.header.nz), (9, 6, 3));
    assert_eq!(reader.header.dmin, -2.0);
    assert_eq!(reader.header.dmax, 26.5);

    let back = read_stack(&path).unwrap();
    assert_eq!(back.len(), 3);
    for (a, b) in back.iter().zip(movie.frames()) {
        assert_eq!(a, &b.raster);
    }
}

#[test]
fn test_mrc_int16_with_extended_header() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("int16.mrc");

    let mut bytes = raw_header(3, 2, 1, 1);
    bytes[92..96].copy_from_slice(&8i32.to_le_bytes());
    bytes.extend_from_slice(&[0xAA; 8]);
    for v in [-3i16, 0, 7, 100, -100, 32767] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(&path, bytes).unwrap();

    let section = MrcReader::open(&path).unwrap().read_section(0).unwrap();
    assert_eq!(
        section.data,
        Array2::from_shape_vec((2, 3), vec![-3.0, 0.0, 7.0, 100.0, -100.0, 32767.0]).unwrap()
    );
}

#[test]
fn test_mrc_rejects_bad_files() {
    let tmp = TempDir::new().unwrap();

    let short = tmp.path().join("short.mrc");
    fs::write(&short, [0u8; 100]).unwrap();
    assert!(matches!(MrcReader::open(&short), Err(MocorrError::InvalidMrc(_))));

    let truncated = tmp.path().join("truncated.mrc");
    let mut bytes = raw_header(4, 4, 2, 2);
    bytes.extend_from_slice(&[0u8; 16]);
    fs::write(&truncated, bytes).unwrap();
    assert!(matches!(MrcReader::open(&truncated), Err(MocorrError::InvalidMrc(_))));

    let huge = tmp.path().join("huge.mrc");
    fs::write(&huge, raw_header(i32::MAX, i32::MAX, i32::MAX, 2)).unwrap();
    assert!(matches!(MrcReader::open(&huge), Err(MocorrError::InvalidMrc(_))));

    let bad_mode = tmp.path().join("mode.mrc");
    fs::write(&bad_mode, raw_header(1, 1, 1, 3)).unwrap();
    assert!(MrcReader::open(&bad_mode).is_err());
}

#[test]
fn test_movie_stack_needs_matching_time_stamps() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("movie.mrc");
    save_movie_stack(&ramp_movie(2), &path).unwrap();

    let movie = load_movie_stack(&path, &[5.0, 6.0]).unwrap();
    assert_eq!(movie.time_stamps(), vec![5.0, 6.0]);
    assert!(matches!(
        load_movie_stack(&path, &[5.0]),
        Err(MocorrError::InvalidParameter(_))
    ));
}

#[test]
fn test_manifest_movie_round_trip() {
    let tmp = TempDir::new().unwrap();
    let movie = ramp_movie(3);
    let manifest = save_movie_manifest(&movie, tmp.path(), "frame").unwrap();
    assert_eq!(manifest, tmp.path().join("frame.xmd"));
    assert!(tmp.path().join("frame00.mrc").exists());
    assert!(tmp.path().join("frame02.mrc").exists());

    let entries = read_manifest(&manifest).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1].image, "frame01.mrc");
    assert_eq!(entries[1].time_stamp, 0.25);

    let back = load_movie_manifest(&manifest).unwrap();
    assert_eq!(back.time_stamps(), movie.time_stamps());
    for (a, b) in back.frames().iter().zip(movie.frames()) {
        assert_eq!(a.raster, b.raster);
    }
}

#[test]
fn test_empty_movie_cannot_be_saved() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        save_movie_manifest(&Movie::new(), tmp.path(), "x"),
        Err(MocorrError::EmptySequence)
    ));
}

#[test]
fn test_png_and_tiff_round_trip() {
    let tmp = TempDir::new().unwrap();
    let raster = Raster::from_array(common::scene((16, 12)));

    let png = tmp.path().join("scene.png");
    save_png(&raster, &png).unwrap();
    let back = load_image(&png).unwrap();
    assert_eq!(back.shape(), (16, 12));
    for (a, b) in back.data.iter().zip(raster.data.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1.0 / 255.0 + 1e-6);
    }

    let tiff = tmp.path().join("scene.tiff");
    save_tiff(&raster, &tiff).unwrap();
    let back = load_image(&tiff).unwrap();
    for (a, b) in back.data.iter().zip(raster.data.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1.0 / 65535.0 + 1e-6);
    }
}
