//! Base types for structure of RSF file.

use std::fmt;
use std::io::Cursor;
use std::ops::Range;
use std::path::Path;

use binrw::{BinRead, BinWrite, Endian};

use crate::error::{Error, Result};

/// Marker byte for archives this library understands
pub const CURRENT_FORMAT_MARKER: u8 = 0x41;

/// Marker byte for old-style archives
pub const LEGACY_FORMAT_MARKER: u8 = 0x6C;

/// Byte used to fill fixed-width names by the original packing tool
const NAME_PAD: u8 = b'x';

/// Layout variant identified by the first byte of an archive
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Archives starting with `0x41`
    Current,
}

impl ArchiveFormat {
    /// Identify the archive layout from its leading bytes.
    pub fn detect(bytes: &[u8]) -> Result<ArchiveFormat> {
        match bytes.first() {
            Some(&CURRENT_FORMAT_MARKER) => Ok(ArchiveFormat::Current),
            Some(&LEGACY_FORMAT_MARKER) => Err(Error::UnsupportedLegacyFormat),
            Some(&other) => Err(Error::UnrecognizedFormat(other)),
            None => Err(Error::TruncatedInput {
                expected: 1,
                available: 0,
            }),
        }
    }

    /// Size of the archive header for this layout
    pub const fn header_size(self) -> usize {
        match self {
            ArchiveFormat::Current => Header::SIZE,
        }
    }
}

/// A structure with a fixed on-disk width
pub trait FixedLayout:
    Sized + for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()>
{
    /// Number of bytes the structure occupies
    const SIZE: usize;

    /// Decode the structure from the start of `bytes`, consuming exactly [`Self::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::TruncatedInput {
                expected: Self::SIZE,
                available: bytes.len(),
            });
        }

        let mut reader = Cursor::new(&bytes[..Self::SIZE]);
        Ok(Self::read_options(&mut reader, Endian::Little, ())?)
    }

    /// Encode the structure into exactly [`Self::SIZE`] bytes.
    fn encode(&self) -> Result<Vec<u8>> {
        let mut writer = Cursor::new(Vec::with_capacity(Self::SIZE));
        self.write_options(&mut writer, Endian::Little, ())?;
        Ok(writer.into_inner())
    }
}

/// Read a fixed-width text field.
///
/// The field ends at the first NUL. Fields without a terminator are trimmed of the trailing
/// `x` characters the packing tool fills them with. Bytes are taken as Latin-1, so every
/// stored byte maps to exactly one `char`.
pub fn trim_padding(raw: &[u8]) -> String {
    let text = match raw.iter().position(|&b| b == 0) {
        Some(end) => &raw[..end],
        None => {
            let end = raw
                .iter()
                .rposition(|&b| b != NAME_PAD)
                .map_or(0, |p| p + 1);
            &raw[..end]
        }
    };
    text.iter().map(|&b| char::from(b)).collect()
}

/// Write a fixed-width text field as Latin-1, NUL padded. Anything past `N` characters is
/// cut off and characters outside of Latin-1 become `?`.
pub fn pad_field<const N: usize>(value: &str) -> [u8; N] {
    let mut out = [0u8; N];
    for (byte, c) in out.iter_mut().zip(value.chars()) {
        *byte = u8::try_from(c).unwrap_or(b'?');
    }
    out
}

/// Check that `value` can be stored in a field of `max` bytes without loss.
pub fn check_field(value: &str, max: usize) -> Result<()> {
    if value.chars().any(|c| u8::try_from(c).is_err()) {
        return Err(Error::UnencodableName(value.to_owned()));
    }
    if value.chars().count() > max {
        return Err(Error::NameTooLong {
            name: value.to_owned(),
            max,
        });
    }
    Ok(())
}

/// RSF file header
///
/// The first byte of the license text doubles as the format marker (see [`ArchiveFormat`]).
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct Header {
    /// License text of the authoring tool
    #[br(map = |raw: [u8; 100]| trim_padding(&raw))]
    #[bw(map = |s: &String| pad_field::<100>(s))]
    pub license: String,

    /// Name of the archive
    #[br(map = |raw: [u8; 12]| trim_padding(&raw))]
    #[bw(map = |s: &String| pad_field::<12>(s))]
    pub name: String,

    /// Version of the authoring tool
    #[br(map = |raw: [u8; 8]| trim_padding(&raw))]
    #[bw(map = |s: &String| pad_field::<8>(s))]
    pub version: String,

    /// Creation time, as free-form text
    #[br(map = |raw: [u8; 42]| trim_padding(&raw))]
    #[bw(map = |s: &String| pad_field::<42>(s))]
    pub timestamp: String,

    /// Total size of the archive in bytes
    pub file_size: u32,

    /// Number of entries in the directory table
    pub directory_count: u16,

    /// Number of entries in the file table
    pub file_count: u16,

    /// Unidentified fields, kept as they were read
    pub reserved: [u16; 5],
}

impl FixedLayout for Header {
    const SIZE: usize = 0xB4;
}

impl Header {
    /// Width of the license field
    pub const LICENSE_LEN: usize = 100;
    /// Width of the name field
    pub const NAME_LEN: usize = 12;
    /// Width of the version field
    pub const VERSION_LEN: usize = 8;
    /// Width of the timestamp field
    pub const TIMESTAMP_LEN: usize = 42;

    /// Byte size of the header and both tables
    pub fn tables_size(&self) -> usize {
        Self::SIZE
            + self.directory_count as usize * DirectoryEntry::SIZE
            + self.file_count as usize * FileEntry::SIZE
    }
}

/// RSF directory record
///
/// Groups a contiguous run of entries in the file table
#[derive(BinRead, BinWrite, Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct DirectoryEntry {
    /// Directory tag, only the first three bytes are significant
    #[br(map = |raw: [u8; 4]| trim_padding(&raw[..3]))]
    #[bw(map = |s: &String| pad_field::<4>(s))]
    pub name: String,

    /// Number of file table entries in this directory
    pub count: u16,

    /// Index of the first file table entry of this directory
    pub start: u16,
}

impl FixedLayout for DirectoryEntry {
    const SIZE: usize = 8;
}

impl DirectoryEntry {
    /// Widest tag that survives a round trip, the fourth stored byte is ignored on read
    pub const NAME_LEN: usize = 3;

    /// The half-open range of file table indices owned by this directory
    pub fn range(&self) -> Range<usize> {
        let start = self.start as usize;
        start..start + self.count as usize
    }
}

/// Type tag of a file entry
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Stored as it is
    #[default]
    Raw,
    /// Palette indexed pixels with a dimension prefix
    Bitmap,
    /// Obfuscated, line indexed text
    Text,
    /// Any other tag, handled like [`EntryKind::Raw`]
    Unknown(u16),
}

impl EntryKind {
    pub const RAW_TAG: u16 = 0;
    pub const BITMAP_TAG: u16 = 0x200;
    pub const TEXT_TAG: u16 = 0x1000;

    /// Pick the kind for a file on disk from its extension
    pub fn from_extension(path: impl AsRef<Path>) -> EntryKind {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bmp") => EntryKind::Bitmap,
            Some(ext) if ext.eq_ignore_ascii_case("txt") => EntryKind::Text,
            _ => EntryKind::Raw,
        }
    }
}

impl From<u16> for EntryKind {
    fn from(value: u16) -> Self {
        match value {
            Self::RAW_TAG => EntryKind::Raw,
            Self::BITMAP_TAG => EntryKind::Bitmap,
            Self::TEXT_TAG => EntryKind::Text,
            other => EntryKind::Unknown(other),
        }
    }
}

impl From<EntryKind> for u16 {
    fn from(value: EntryKind) -> Self {
        match value {
            EntryKind::Raw => EntryKind::RAW_TAG,
            EntryKind::Bitmap => EntryKind::BITMAP_TAG,
            EntryKind::Text => EntryKind::TEXT_TAG,
            EntryKind::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Raw => write!(f, "raw"),
            EntryKind::Bitmap => write!(f, "bitmap"),
            EntryKind::Text => write!(f, "text"),
            EntryKind::Unknown(tag) => write!(f, "unknown ({tag:#06x})"),
        }
    }
}

/// RSF file record
///
/// Defines an entry in the RSF file
#[derive(BinRead, BinWrite, Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct FileEntry {
    /// Name of the file
    #[br(map = |raw: [u8; 12]| trim_padding(&raw))]
    #[bw(map = |s: &String| pad_field::<12>(s))]
    pub name: String,

    /// How the payload is encoded
    #[br(map = |tag: u16| EntryKind::from(tag))]
    #[bw(map = |kind: &EntryKind| u16::from(*kind))]
    pub kind: EntryKind,

    /// Size of the payload in bytes
    pub size: u32,

    /// Offset of the payload from the start of the archive
    pub start: u32,

    /// Offset one past the payload. Only informational when reading.
    pub end: u32,
}

impl FixedLayout for FileEntry {
    const SIZE: usize = 26;
}

impl FileEntry {
    /// Widest name that can be stored
    pub const NAME_LEN: usize = 12;

    /// Byte range of the payload inside the archive
    pub fn data_range(&self) -> Range<u64> {
        let start = self.start as u64;
        start..start + self.size as u64
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::types::{
        check_field, pad_field, trim_padding, ArchiveFormat, DirectoryEntry, EntryKind, FileEntry,
        FixedLayout, Header,
    };

    #[test]
    fn detect_formats() {
        assert_eq!(
            ArchiveFormat::detect(&[0x41, 0x00]).ok(),
            Some(ArchiveFormat::Current)
        );
        assert!(matches!(
            ArchiveFormat::detect(&[0x6C]),
            Err(Error::UnsupportedLegacyFormat)
        ));
        assert!(matches!(
            ArchiveFormat::detect(&[0x42]),
            Err(Error::UnrecognizedFormat(0x42))
        ));
        assert!(matches!(
            ArchiveFormat::detect(&[]),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn trims_name_padding() {
        assert_eq!(trim_padding(b"TRUERGB.PAL\0"), "TRUERGB.PAL");
        assert_eq!(trim_padding(b"L23.PAL\0xxxx"), "L23.PAL");
        assert_eq!(trim_padding(b"HELP.TXTxxxx"), "HELP.TXT");
        assert_eq!(trim_padding(b"\0\0\0\0"), "");
    }

    #[test]
    fn fields_keep_latin1_bytes() -> Result<()> {
        let raw = *b"A \xA9 1997 Softworks\0";
        let text = trim_padding(&raw);
        assert_eq!(text, "A \u{a9} 1997 Softworks");
        assert_eq!(pad_field::<19>(&text), raw);

        let header = Header {
            license: text,
            name: "\u{c9}T\u{c9}".into(),
            ..Default::default()
        };
        let bytes = header.encode()?;
        assert_eq!(&bytes[..19], &raw);
        assert_eq!(&bytes[100..104], &[0xC9, b'T', 0xC9, 0x00]);
        assert_eq!(Header::decode(&bytes)?, header);

        Ok(())
    }

    #[test]
    fn field_checks() {
        assert!(check_field("TRUERGB.PAL", 12).is_ok());
        assert!(check_field("\u{e9}t\u{e9}", 3).is_ok());
        assert!(matches!(
            check_field("DATA", 3),
            Err(Error::NameTooLong { max: 3, .. })
        ));
        assert!(matches!(
            check_field("\u{263a}.TXT", 12),
            Err(Error::UnencodableName(_))
        ));
    }

    #[test]
    fn read_directory_entry() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x50, 0x41, 0x4C, 0x00,
            0x03, 0x00,
            0x05, 0x00,
        ];

        let expected = DirectoryEntry {
            name: "PAL".into(),
            count: 3,
            start: 5,
        };

        let entry = DirectoryEntry::decode(&input)?;
        assert_eq!(entry, expected);
        assert_eq!(entry.range(), 5..8);

        Ok(())
    }

    #[test]
    fn directory_tag_ignores_fourth_byte() -> Result<()> {
        let input = [0x42, 0x4D, 0x50, 0x7F, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(DirectoryEntry::decode(&input)?.name, "BMP");
        Ok(())
    }

    #[test]
    fn write_directory_entry() -> Result<()> {
        let entry = DirectoryEntry {
            name: "TXT".into(),
            count: 0x102,
            start: 7,
        };

        assert_eq!(
            entry.encode()?,
            vec![0x54, 0x58, 0x54, 0x00, 0x02, 0x01, 0x07, 0x00]
        );

        Ok(())
    }

    #[test]
    fn read_file_entry() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            // Name
            0x48, 0x45, 0x4C, 0x50, 0x2E, 0x54, 0x58, 0x54, 0x00, 0x78, 0x78, 0x78,
            // Kind
            0x00, 0x10,
            // Size
            0x0B, 0x00, 0x00, 0x00,
            // Start
            0xD0, 0x00, 0x00, 0x00,
            // End
            0xDB, 0x00, 0x00, 0x00,
        ];

        let expected = FileEntry {
            name: "HELP.TXT".into(),
            kind: EntryKind::Text,
            size: 11,
            start: 0xD0,
            end: 0xDB,
        };

        let entry = FileEntry::decode(&input)?;
        assert_eq!(entry, expected);
        assert_eq!(entry.data_range(), 0xD0..0xDB);

        Ok(())
    }

    #[test]
    fn write_file_entry() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x41, 0x2E, 0x42, 0x4D, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x02,
            0x08, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00,
            0x08, 0x01, 0x00, 0x00,
        ];

        let entry = FileEntry {
            name: "A.BMP".into(),
            kind: EntryKind::Bitmap,
            size: 8,
            start: 0x100,
            end: 0x108,
        };

        assert_eq!(entry.encode()?, expected);

        Ok(())
    }

    #[test]
    fn unknown_kind_is_preserved() -> Result<()> {
        let entry = FileEntry {
            name: "ODD.DAT".into(),
            kind: EntryKind::Unknown(0x0300),
            ..Default::default()
        };

        let decoded = FileEntry::decode(&entry.encode()?)?;
        assert_eq!(decoded.kind, EntryKind::Unknown(0x0300));
        assert_eq!(u16::from(decoded.kind), 0x0300);

        Ok(())
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(EntryKind::from_extension("PICS/TITLE.BMP"), EntryKind::Bitmap);
        assert_eq!(EntryKind::from_extension("help.txt"), EntryKind::Text);
        assert_eq!(EntryKind::from_extension("TRUERGB.PAL"), EntryKind::Raw);
        assert_eq!(EntryKind::from_extension("README"), EntryKind::Raw);
    }

    #[test]
    fn header_layout() -> Result<()> {
        let header = Header {
            license: "A license".into(),
            name: "GAME".into(),
            version: "1.2".into(),
            timestamp: "Mon Jan 01".into(),
            file_size: 0x01020304,
            directory_count: 2,
            file_count: 8,
            reserved: [0x0008, 0x001A, 0x0006, 0x1A64, 0xA26B],
        };

        let bytes = header.encode()?;
        assert_eq!(bytes.len(), 0xB4);
        assert_eq!(bytes[0], 0x41);
        assert_eq!(&bytes[100..104], b"GAME");
        assert_eq!(&bytes[112..115], b"1.2");
        assert_eq!(&bytes[162..166], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[166..170], &[0x02, 0x00, 0x08, 0x00]);
        assert_eq!(&bytes[170..172], &[0x08, 0x00]);
        assert_eq!(&bytes[178..180], &[0x6B, 0xA2]);

        assert_eq!(Header::decode(&bytes)?, header);
        assert_eq!(header.tables_size(), 0xB4 + 2 * 8 + 8 * 26);

        Ok(())
    }

    #[test]
    fn truncated_structures() {
        assert!(matches!(
            Header::decode(&[0x41; 0xB3]),
            Err(Error::TruncatedInput {
                expected: 0xB4,
                available: 0xB3
            })
        ));
        assert!(matches!(
            DirectoryEntry::decode(&[0; 7]),
            Err(Error::TruncatedInput { expected: 8, .. })
        ));
        assert!(matches!(
            FileEntry::decode(&[0; 25]),
            Err(Error::TruncatedInput { expected: 26, .. })
        ));
    }
}
