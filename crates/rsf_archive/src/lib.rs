//! This library handles reading from and creating **RSF** game asset archives.
//!
//! # RSF Archive Format Documentation
//!
//! An RSF file bundles the assets of a game into a single container. Files are grouped into
//! named directories and each file carries a type tag describing how its payload is encoded:
//! raw bytes, palette indexed bitmaps or obfuscated text.
//!
//! ## File Structure
//!
//! An RSF file consists of a header, a directory table, a file table and the payloads.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | License                | 100 bytes: License text, the first byte identifies format  |
//! | 0x0064         | Name                   | 12 bytes: Name of the archive                              |
//! | 0x0070         | Version                | 8 bytes: Version of the authoring tool                     |
//! | 0x0078         | Timestamp              | 42 bytes: Creation time as text                            |
//! | 0x00A2         | File Size              | 4 bytes: Total size of the archive                         |
//! | 0x00A6         | Directory Count        | 2 bytes: Number of directory records                       |
//! | 0x00A8         | File Count             | 2 bytes: Number of file records                            |
//! | 0x00AA         | Reserved               | 10 bytes: Five unidentified 16 bit values                  |
//!
//! ### Header
//!
//! - **License**: Text padded with NUL. Its first byte is `0x41` (`A`) for archives this crate
//!   supports. Old-style archives start with `0x6C` and are rejected.
//! - **Name**, **Version**, **Timestamp**: Text padded with NUL or `x`. All text fields hold one
//!   byte per character and are read as Latin-1.
//! - **File Size**: The size of the whole archive in bytes.
//! - **Directory Count**, **File Count**: Number of records in the two tables.
//! - **Reserved**: Unidentified values, preserved when re-encoding a header.
//!
//! ### Directory Table
//!
//! Directly follows the header. Each record has the following structure:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Tag                    | 4 bytes: Directory name, first 3 bytes significant      |
//! | 0x0004         | Count                  | 2 bytes: Number of file records in the directory        |
//! | 0x0006         | Start                  | 2 bytes: Index of the first file record                 |
//!
//! The file records of different directories do not overlap. The directory tagged `PAL`
//! holds the colour palettes used by bitmaps.
//!
//! ### File Table
//!
//! Directly follows the directory table. Each record has the following structure:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name                   | 12 bytes: File name padded with NUL or `x`              |
//! | 0x000C         | Type                   | 2 bytes: `0x0000` raw, `0x0200` bitmap, `0x1000` text   |
//! | 0x000E         | Size                   | 4 bytes: Size of the payload                            |
//! | 0x0012         | Start                  | 4 bytes: Offset of the payload from the start of file   |
//! | 0x0016         | End                    | 4 bytes: Offset one past the payload                    |
//!
//! ### Payloads
//!
//! - **Raw**: Stored as it is.
//! - **Bitmap**: `u16` width and height followed by one palette index per pixel, see
//!   [`bitmap`].
//! - **Text**: Line indexed, XOR obfuscated text, see [`text`].
//!
//! A palette is 256 RGB triples with 6 bits per channel, see [`palette`].
//!
//! ## Additional Information
//!
//! - **File Extension**: `.rsf`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod bitmap;
pub mod error;
pub mod palette;
pub mod read;
pub mod text;
pub mod types;
pub mod write;

pub use bitmap::RowPadding;
pub use palette::Palette;
pub use read::RsfArchive;
pub use types::EntryKind;
pub use write::RsfWriter;
