//! Colour palettes stored in the `PAL` directory of an archive.

use std::io::{Read, Seek};

use tracing::debug;

use crate::error::{Error, Result};
use crate::read::read_exact_at;
use crate::types::{DirectoryEntry, FileEntry};

/// Tag of the directory holding palettes
pub const PALETTE_DIRECTORY: &str = "PAL";

/// Number of colours in a palette
pub const PALETTE_COLORS: usize = 256;

/// Size in bytes of a stored palette
pub const PALETTE_SIZE: usize = PALETTE_COLORS * 3;

/// One palette colour, channels in storage order with 6 bits per channel
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// The colour as a bitmap palette entry.
    ///
    /// Channels are widened to 8 bits and emitted blue first, which puts stored channel 2
    /// in front and stored channel 0 last.
    pub fn to_bgra(self) -> [u8; 4] {
        [
            self.b.wrapping_mul(4),
            self.g.wrapping_mul(4),
            self.r.wrapping_mul(4),
            0,
        ]
    }
}

/// A 256 colour lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PALETTE_COLORS],
}

impl Palette {
    /// Decode a stored palette. Only the first [`PALETTE_SIZE`] bytes are used.
    pub fn from_raw(bytes: &[u8]) -> Result<Palette> {
        if bytes.len() < PALETTE_SIZE {
            return Err(Error::TruncatedInput {
                expected: PALETTE_SIZE,
                available: bytes.len(),
            });
        }

        let mut colors = [Rgb::default(); PALETTE_COLORS];
        for (color, triple) in colors.iter_mut().zip(bytes.chunks_exact(3)) {
            *color = Rgb {
                r: triple[0],
                g: triple[1],
                b: triple[2],
            };
        }

        Ok(Palette { colors })
    }

    /// Look up a palette by name in the archive's `PAL` directory and load it from `reader`.
    pub fn find<R: Read + Seek>(
        directories: &[DirectoryEntry],
        files: &[FileEntry],
        reader: &mut R,
        name: &str,
    ) -> Result<Palette> {
        let entry = directories
            .iter()
            .filter(|d| d.name == PALETTE_DIRECTORY)
            .flat_map(|d| files.get(d.range()).unwrap_or_default())
            .find(|f| f.name == name)
            .ok_or_else(|| Error::PaletteNotFound(name.to_owned()))?;

        debug!("loading palette {} from {:#x}", entry.name, entry.start);

        let raw = read_exact_at(reader, entry.start as u64, PALETTE_SIZE)?;
        Palette::from_raw(&raw)
    }

    /// All colours, index 0 first
    pub fn colors(&self) -> &[Rgb; PALETTE_COLORS] {
        &self.colors
    }

    /// Colour at a palette index
    pub fn get(&self, index: u8) -> Rgb {
        self.colors[index as usize]
    }
}
