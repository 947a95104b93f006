use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{MocorrError, Result};
use crate::raster::Raster;

/// Save a raster as 16-bit grayscale TIFF, clamping to `[0, 1]`.
pub fn save_tiff(raster: &Raster, path: &Path) -> Result<()> {
    let (h, w) = raster.shape();
    let pixels: Vec<u16> = raster
        .data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();

    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or(MocorrError::InvalidDimensions { width: w, height: h })?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a raster as 8-bit grayscale PNG, clamping to `[0, 1]`.
pub fn save_png(raster: &Raster, path: &Path) -> Result<()> {
    let (h, w) = raster.shape();

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in raster.data.indexed_iter() {
        let val = (v.clamp(0.0, 1.0) * 255.0) as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a raster, choosing format from file extension (TIFF by default).
pub fn save_image(raster: &Raster, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(raster, path),
        _ => save_tiff(raster, path),
    }
}

/// Save a raster after stretching its value range onto `[0, 1]`.
///
/// Summed or warped frames rarely stay inside the unit range.
pub fn save_image_stretched(raster: &Raster, path: &Path) -> Result<()> {
    save_image(&stretch(raster), path)
}

/// Linear min-max stretch to `[0, 1]`. A flat raster maps to zeros.
pub fn stretch(raster: &Raster) -> Raster {
    let (min, max) = raster
        .data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if !(range > 0.0) {
        return Raster::zeros(raster.shape());
    }
    Raster::from_array(raster.data.mapv(|v| (v - min) / range))
}

/// Load an image file as a grayscale raster with values in `[0, 1]`.
pub fn load_image(path: &Path) -> Result<Raster> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return Err(MocorrError::InvalidDimensions {
            width: w as usize,
            height: h as usize,
        });
    }

    let data = Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / 65535.0
    });
    Ok(Raster::from_array(data))
}
