//! Conversion between bitmap entries and Windows bitmap images.
//!
//! A bitmap entry is a 4 byte prefix holding the width and height as little endian `u16`,
//! followed by one palette index per pixel without any row padding. Decoding produces an
//! 8 bit paletted `.BMP` image whose rows are padded to 4 bytes.

use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use tracing::warn;

use crate::error::{narrow, Error, Result};
use crate::palette::{Palette, PALETTE_COLORS};

/// Size of the dimension prefix of a bitmap entry
pub const DIMENSIONS_SIZE: usize = 4;

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const PALETTE_BYTES: u32 = PALETTE_COLORS as u32 * 4;

/// Offset of the pixel data in a decoded image
pub const PIXEL_DATA_OFFSET: u32 = FILE_HEADER_SIZE + INFO_HEADER_SIZE + PALETTE_BYTES;

/// How row padding is handled when turning an image back into an entry
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum RowPadding {
    /// Copy the pixel data as found in the image, padding included, as existing packing tools
    /// do. Entries with widths not divisible by 4 keep the padding.
    #[default]
    Keep,

    /// Remove the padding from every row
    Strip,
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little, magic = b"BM")]
struct BitmapFileHeader {
    size: u32,
    reserved: u32,
    data_offset: u32,
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq)]
#[brw(little)]
struct BitmapInfoHeader {
    header_size: u32,
    width: i32,
    height: i32,
    planes: u16,
    bits_per_pixel: u16,
    compression: u32,
    image_size: u32,
    x_pixels_per_meter: i32,
    y_pixels_per_meter: i32,
    colors_used: u32,
    colors_important: u32,
}

/// Bytes per row once padded to a multiple of 4
pub const fn row_stride(width: usize) -> usize {
    (width + 3) & !3
}

/// Read the width and height of a bitmap entry
pub fn dimensions(payload: &[u8]) -> Result<(u16, u16)> {
    if payload.len() < DIMENSIONS_SIZE {
        return Err(Error::TruncatedInput {
            expected: DIMENSIONS_SIZE,
            available: payload.len(),
        });
    }
    let width = u16::from_le_bytes([payload[0], payload[1]]);
    let height = u16::from_le_bytes([payload[2], payload[3]]);
    Ok((width, height))
}

/// Spread unpadded rows of `width` bytes over rows of [`row_stride`] bytes.
///
/// Rows missing from `pixels` are left zeroed, bytes past `width * height` are dropped.
pub fn pad_rows(pixels: &[u8], width: usize, height: usize) -> Vec<u8> {
    let stride = row_stride(width);
    let mut out = vec![0u8; stride * height];
    if width == 0 {
        return out;
    }

    for (row, source) in out.chunks_exact_mut(stride).zip(pixels.chunks(width)) {
        row[..source.len()].copy_from_slice(source);
    }
    out
}

/// Remove the padding added by [`pad_rows`].
pub fn strip_rows(pixels: &[u8], width: usize, height: usize) -> Vec<u8> {
    let stride = row_stride(width);
    let mut out = Vec::with_capacity(width * height);
    if stride == 0 {
        return out;
    }

    for row in pixels.chunks(stride).take(height) {
        out.extend_from_slice(&row[..width.min(row.len())]);
    }
    out
}

/// Turn a bitmap entry into a `.BMP` image coloured with `palette`.
///
/// Entries holding fewer than `width * height` pixel bytes are rejected, extra bytes are ignored.
pub fn decode(payload: &[u8], palette: &Palette) -> Result<Vec<u8>> {
    let (width, height) = dimensions(payload)?;
    let pixels = &payload[DIMENSIONS_SIZE..];

    let expected = width as usize * height as usize;
    if pixels.len() < expected {
        return Err(Error::TruncatedInput {
            expected: DIMENSIONS_SIZE + expected,
            available: payload.len(),
        });
    }
    if pixels.len() > expected {
        warn!(
            "bitmap {}x{} holds {} pixel bytes, expected {}",
            width,
            height,
            pixels.len(),
            expected
        );
    }

    let total = PIXEL_DATA_OFFSET as usize + row_stride(width as usize) * height as usize;
    let size = narrow("bitmap size", total)?;
    let padded = pad_rows(pixels, width as usize, height as usize);

    let file_header = BitmapFileHeader {
        size,
        reserved: 0,
        data_offset: PIXEL_DATA_OFFSET,
    };
    let info_header = BitmapInfoHeader {
        header_size: INFO_HEADER_SIZE,
        width: width as i32,
        height: height as i32,
        planes: 1,
        bits_per_pixel: 8,
        ..Default::default()
    };

    let mut out = Cursor::new(Vec::with_capacity(total));
    file_header.write(&mut out)?;
    info_header.write(&mut out)?;

    let mut image = out.into_inner();
    for color in palette.colors() {
        image.extend_from_slice(&color.to_bgra());
    }
    image.extend_from_slice(&padded);

    Ok(image)
}

/// Turn a `.BMP` image back into a bitmap entry.
///
/// The palette of the image is discarded, pixels are expected to already be indices into the
/// archive palette.
pub fn encode(image: &[u8], padding: RowPadding) -> Result<Vec<u8>> {
    let mut reader = Cursor::new(image);
    let file_header = BitmapFileHeader::read(&mut reader)
        .map_err(|e| Error::InvalidBitmap(e.to_string()))?;
    let info_header = BitmapInfoHeader::read(&mut reader)
        .map_err(|e| Error::InvalidBitmap(e.to_string()))?;

    if info_header.bits_per_pixel != 8 {
        return Err(Error::InvalidBitmap(format!(
            "expected 8 bits per pixel, found {}",
            info_header.bits_per_pixel
        )));
    }
    if info_header.compression != 0 {
        return Err(Error::InvalidBitmap(format!(
            "compressed bitmaps are not supported (method {})",
            info_header.compression
        )));
    }

    let width: u16 = info_header
        .width
        .try_into()
        .map_err(|_| Error::InvalidBitmap(format!("width {} out of range", info_header.width)))?;
    let height: u16 = info_header
        .height
        .try_into()
        .map_err(|_| Error::InvalidBitmap(format!("height {} out of range", info_header.height)))?;

    let offset = file_header.data_offset as usize;
    let pixels = image.get(offset..).ok_or(Error::TruncatedInput {
        expected: offset,
        available: image.len(),
    })?;

    let pixels = match padding {
        RowPadding::Keep => pixels.to_vec(),
        RowPadding::Strip => strip_rows(pixels, width as usize, height as usize),
    };

    let mut payload = Vec::with_capacity(DIMENSIONS_SIZE + pixels.len());
    payload.extend_from_slice(&width.to_le_bytes());
    payload.extend_from_slice(&height.to_le_bytes());
    payload.extend_from_slice(&pixels);
    Ok(payload)
}
