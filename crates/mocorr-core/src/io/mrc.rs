use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use num_traits::AsPrimitive;
use tracing::debug;

use crate::consts::MRC_HEADER_SIZE;
use crate::error::{MocorrError, Result};
use crate::raster::Raster;

const MAP_TAG: &[u8; 4] = b"MAP ";
const MACHINE_STAMP_LE: [u8; 4] = [0x44, 0x44, 0x00, 0x00];
const MACHINE_STAMP_BE: u8 = 0x11;
const FORMAT_VERSION: i32 = 20140;
const LABEL_SIZE: usize = 80;
const LABEL_COUNT: usize = 10;

/// Sample encodings understood by the reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MrcMode {
    Int8,
    Int16,
    Float32,
    UInt16,
}

impl MrcMode {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Int8),
            1 => Ok(Self::Int16),
            2 => Ok(Self::Float32),
            6 => Ok(Self::UInt16),
            other => Err(MocorrError::InvalidMrc(format!("unsupported mode {other}"))),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Int8 => 0,
            Self::Int16 => 1,
            Self::Float32 => 2,
            Self::UInt16 => 6,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Float32 => 4,
        }
    }
}

/// The fields of the 1024-byte main header this crate reads or writes.
#[derive(Clone, Debug, PartialEq)]
pub struct MrcHeader {
    /// Columns.
    pub nx: u32,
    /// Rows.
    pub ny: u32,
    /// Sections (frames of a stack).
    pub nz: u32,
    pub mode: MrcMode,
    /// Extended header length in bytes.
    pub nsymbt: u32,
    pub dmin: f32,
    pub dmax: f32,
    pub dmean: f32,
    pub rms: f32,
    pub little_endian: bool,
}

impl MrcHeader {
    pub fn section_byte_size(&self) -> usize {
        self.nx as usize * self.ny as usize * self.mode.bytes_per_sample()
    }

    pub fn data_offset(&self) -> usize {
        MRC_HEADER_SIZE + self.nsymbt as usize
    }

    /// Bytes the header claims the file holds, extended header included.
    /// `None` when the declared sizes overflow `usize`.
    pub fn file_byte_size(&self) -> Option<usize> {
        (self.nx as usize)
            .checked_mul(self.ny as usize)?
            .checked_mul(self.mode.bytes_per_sample())?
            .checked_mul(self.nz as usize)?
            .checked_add(self.data_offset())
    }

    /// `(height, width)` of one section.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny as usize, self.nx as usize)
    }
}

/// Memory-mapped MRC stack reader.
pub struct MrcReader {
    mmap: Mmap,
    pub header: MrcHeader,
}

impl MrcReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < MRC_HEADER_SIZE {
            return Err(MocorrError::InvalidMrc("file too small for MRC header".into()));
        }
        let header = if mmap[212] == MACHINE_STAMP_BE {
            parse_header::<BigEndian>(&mmap[..MRC_HEADER_SIZE], false)?
        } else {
            parse_header::<LittleEndian>(&mmap[..MRC_HEADER_SIZE], true)?
        };

        let expected = header.file_byte_size().ok_or_else(|| {
            MocorrError::InvalidMrc(format!(
                "declared size {}x{}x{} overflows",
                header.nx, header.ny, header.nz
            ))
        })?;
        if mmap.len() < expected {
            return Err(MocorrError::InvalidMrc(format!(
                "file truncated: expected at least {} bytes, got {}",
                expected,
                mmap.len()
            )));
        }

        debug!(
            nx = header.nx,
            ny = header.ny,
            nz = header.nz,
            mode = header.mode.code(),
            "opened MRC file"
        );
        Ok(Self { mmap, header })
    }

    pub fn section_count(&self) -> usize {
        self.header.nz as usize
    }

    /// Decode one section to a raster. Rows run along `ny`, columns along `nx`.
    pub fn read_section(&self, index: usize) -> Result<Raster> {
        if index >= self.section_count() {
            return Err(MocorrError::InvalidMrc(format!(
                "section {index} out of range (file has {})",
                self.section_count()
            )));
        }
        let size = self.header.section_byte_size();
        let offset = self.header.data_offset() + index * size;
        let raw = &self.mmap[offset..offset + size];

        let samples = if self.header.little_endian {
            decode_samples::<LittleEndian>(raw, self.header.mode)
        } else {
            decode_samples::<BigEndian>(raw, self.header.mode)
        };
        let data = Array2::from_shape_vec(self.header.shape(), samples)
            .map_err(|e| MocorrError::InvalidMrc(e.to_string()))?;
        Ok(Raster::from_array(data))
    }

    pub fn sections(&self) -> impl Iterator<Item = Result<Raster>> + '_ {
        (0..self.section_count()).map(move |i| self.read_section(i))
    }
}

fn parse_header<B: ByteOrder>(buf: &[u8], little_endian: bool) -> Result<MrcHeader> {
    let mut cursor = Cursor::new(buf);

    let nx = cursor.read_i32::<B>()?;
    let ny = cursor.read_i32::<B>()?;
    let nz = cursor.read_i32::<B>()?;
    let mode = MrcMode::from_code(cursor.read_i32::<B>()?)?;
    if nx <= 0 || ny <= 0 || nz < 0 {
        return Err(MocorrError::InvalidMrc(format!("bad dimensions {nx}x{ny}x{nz}")));
    }

    cursor.set_position(76);
    let dmin = cursor.read_f32::<B>()?;
    let dmax = cursor.read_f32::<B>()?;
    let dmean = cursor.read_f32::<B>()?;
    let _ispg = cursor.read_i32::<B>()?;
    let nsymbt = cursor.read_i32::<B>()?;
    if nsymbt < 0 {
        return Err(MocorrError::InvalidMrc(format!("negative extended header size {nsymbt}")));
    }

    cursor.set_position(216);
    let rms = cursor.read_f32::<B>()?;

    Ok(MrcHeader {
        nx: nx as u32,
        ny: ny as u32,
        nz: nz as u32,
        mode,
        nsymbt: nsymbt as u32,
        dmin,
        dmax,
        dmean,
        rms,
        little_endian,
    })
}

fn decode_samples<B: ByteOrder>(raw: &[u8], mode: MrcMode) -> Vec<f32> {
    let n = raw.len() / mode.bytes_per_sample();
    match mode {
        MrcMode::Int8 => widen(raw.iter().map(|&b| b as i8)),
        MrcMode::Int16 => {
            let mut buf = vec![0i16; n];
            B::read_i16_into(raw, &mut buf);
            widen(buf)
        }
        MrcMode::UInt16 => {
            let mut buf = vec![0u16; n];
            B::read_u16_into(raw, &mut buf);
            widen(buf)
        }
        MrcMode::Float32 => {
            let mut buf = vec![0f32; n];
            B::read_f32_into(raw, &mut buf);
            buf
        }
    }
}

fn widen<T: AsPrimitive<f32>>(samples: impl IntoIterator<Item = T>) -> Vec<f32> {
    samples.into_iter().map(|s| s.as_()).collect()
}

/// Writes a float32 (mode 2) little-endian MRC stack.
pub struct MrcWriter {
    writer: BufWriter<File>,
    header: MrcHeader,
    sections_written: u32,
}

impl MrcWriter {
    /// Create the file and write the header. Statistics in `header` are
    /// written as given.
    pub fn create(path: &Path, header: &MrcHeader) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&encode_header(header)?)?;
        Ok(Self {
            writer,
            header: header.clone(),
            sections_written: 0,
        })
    }

    pub fn write_section(&mut self, raster: &Raster) -> Result<()> {
        let expected = self.header.shape();
        if raster.shape() != expected {
            return Err(MocorrError::ShapeMismatch {
                expected,
                actual: raster.shape(),
            });
        }
        for &v in raster.data.iter() {
            self.writer.write_f32::<LittleEndian>(v)?;
        }
        self.sections_written += 1;
        Ok(())
    }

    pub fn finalize(mut self) -> Result<()> {
        if self.sections_written != self.header.nz {
            return Err(MocorrError::InvalidMrc(format!(
                "header announces {} sections, {} written",
                self.header.nz, self.sections_written
            )));
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Header for a float32 stack of `rasters`, with data statistics filled in.
pub fn stack_header(rasters: &[&Raster]) -> Result<MrcHeader> {
    let first = rasters.first().ok_or(MocorrError::EmptySequence)?;
    let (h, w) = first.shape();
    if h == 0 || w == 0 {
        return Err(MocorrError::InvalidDimensions { width: w, height: h });
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;
    for raster in rasters {
        for &v in raster.data.iter() {
            let v = v as f64;
            min = min.min(v);
            max = max.max(v);
            sum += v;
            sum_sq += v * v;
            count += 1;
        }
    }
    let mean = sum / count as f64;
    let rms = (sum_sq / count as f64 - mean * mean).max(0.0).sqrt();

    Ok(MrcHeader {
        nx: w as u32,
        ny: h as u32,
        nz: rasters.len() as u32,
        mode: MrcMode::Float32,
        nsymbt: 0,
        dmin: min as f32,
        dmax: max as f32,
        dmean: mean as f32,
        rms: rms as f32,
        little_endian: true,
    })
}

/// Write `rasters` as one float32 MRC stack, one section per raster.
pub fn write_stack(path: &Path, rasters: &[&Raster]) -> Result<()> {
    let header = stack_header(rasters)?;
    let mut writer = MrcWriter::create(path, &header)?;
    for raster in rasters {
        writer.write_section(raster)?;
    }
    writer.finalize()
}

/// Read every section of an MRC file.
pub fn read_stack(path: &Path) -> Result<Vec<Raster>> {
    MrcReader::open(path)?.sections().collect()
}

fn encode_header(header: &MrcHeader) -> Result<Vec<u8>> {
    if header.mode != MrcMode::Float32 || !header.little_endian {
        return Err(MocorrError::InvalidMrc(
            "only little-endian float32 stacks can be written".into(),
        ));
    }
    let mut buf = vec![0u8; MRC_HEADER_SIZE];
    let mut c = Cursor::new(&mut buf[..]);
    type E = LittleEndian;

    let (nx, ny, nz) = (header.nx as i32, header.ny as i32, header.nz as i32);
    for v in [nx, ny, nz, header.mode.code(), 0, 0, 0, nx, ny, nz] {
        c.write_i32::<E>(v)?;
    }
    // cell dimensions at one unit per pixel, then angles
    for v in [nx as f32, ny as f32, nz as f32, 90.0, 90.0, 90.0] {
        c.write_f32::<E>(v)?;
    }
    for v in [1, 2, 3] {
        c.write_i32::<E>(v)?;
    }
    for v in [header.dmin, header.dmax, header.dmean] {
        c.write_f32::<E>(v)?;
    }
    c.write_i32::<E>(0)?; // ispg: image stack
    c.write_i32::<E>(header.nsymbt as i32)?;

    c.set_position(108);
    c.write_i32::<E>(FORMAT_VERSION)?;

    c.set_position(208);
    c.write_all(MAP_TAG)?;
    c.write_all(&MACHINE_STAMP_LE)?;
    c.write_f32::<E>(header.rms)?;
    c.write_i32::<E>(1)?;

    let label = b"mocorr";
    c.write_all(label)?;
    debug_assert_eq!(224 + LABEL_SIZE * LABEL_COUNT, MRC_HEADER_SIZE);

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_codes() {
        for mode in [MrcMode::Int8, MrcMode::Int16, MrcMode::Float32, MrcMode::UInt16] {
            assert_eq!(MrcMode::from_code(mode.code()).unwrap(), mode);
        }
        assert!(MrcMode::from_code(4).is_err());
    }

    #[test]
    fn decodes_integer_modes() {
        assert_eq!(decode_samples::<LittleEndian>(&[0xff, 0x05], MrcMode::Int8), vec![-1.0, 5.0]);
        assert_eq!(
            decode_samples::<LittleEndian>(&[0xfe, 0xff, 0x00, 0x01], MrcMode::Int16),
            vec![-2.0, 256.0]
        );
        assert_eq!(
            decode_samples::<BigEndian>(&[0xff, 0xfe, 0x01, 0x00], MrcMode::UInt16),
            vec![65534.0, 256.0]
        );
    }

    #[test]
    fn header_round_trips() {
        let header = MrcHeader {
            nx: 7,
            ny: 5,
            nz: 3,
            mode: MrcMode::Float32,
            nsymbt: 0,
            dmin: -1.0,
            dmax: 2.0,
            dmean: 0.5,
            rms: 0.25,
            little_endian: true,
        };
        let bytes = encode_header(&header).unwrap();
        assert_eq!(bytes.len(), MRC_HEADER_SIZE);
        assert_eq!(&bytes[208..212], MAP_TAG);
        assert_eq!(parse_header::<LittleEndian>(&bytes, true).unwrap(), header);
    }

    #[test]
    fn stack_header_statistics() {
        let a = Raster::from_array(Array2::from_elem((2, 2), 1.0));
        let b = Raster::from_array(Array2::from_elem((2, 2), 3.0));
        let header = stack_header(&[&a, &b]).unwrap();
        assert_eq!((header.nx, header.ny, header.nz), (2, 2, 2));
        assert_eq!((header.dmin, header.dmax, header.dmean), (1.0, 3.0, 2.0));
        assert!((header.rms - 1.0).abs() < 1e-6);
    }
}
