//! Types for reading RSF archives
//!

use indexmap::IndexMap;
use std::{
    fmt::{self, Debug},
    io::{self, Cursor, Read, Seek, SeekFrom},
};
use tracing::{debug, warn};

use crate::{
    bitmap,
    error::{Error, FileNotFoundError, Result},
    palette::Palette,
    text,
    types::{ArchiveFormat, DirectoryEntry, EntryKind, FileEntry, FixedLayout, Header},
};

/// Read `len` bytes starting at `start`, failing if the reader ends early.
pub(crate) fn read_exact_at<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    len: usize,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(start))?;

    let mut buffer = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buffer)?;
    if buffer.len() < len {
        return Err(Error::TruncatedInput {
            expected: len,
            available: buffer.len(),
        });
    }
    Ok(buffer)
}

/// A struct for reading an entry from a RSF file
pub struct RsfFile<'a> {
    directory: &'a DirectoryEntry,
    entry: &'a FileEntry,
    data: Cursor<Vec<u8>>,
}

impl Debug for RsfFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RsfFile({:#?})", self.entry)
    }
}

/// Methods for retrieving information on RSF file entries
impl RsfFile<'_> {
    /// Get the name of the file
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Get the tag of the directory holding the file
    pub fn directory(&self) -> &str {
        &self.directory.name
    }

    /// Get the `DIR/NAME` path of the file
    ///
    /// # Warnings
    ///
    /// Names come straight from the archive. Check them before using the path to create
    /// files outside of a directory you control.
    pub fn path(&self) -> String {
        entry_path(self.directory, self.entry)
    }

    /// Get how the payload is encoded
    pub fn kind(&self) -> EntryKind {
        self.entry.kind
    }

    /// Get the size of the payload, in bytes, in the archive
    pub fn size(&self) -> u64 {
        self.entry.size as u64
    }

    /// Get the starting offset of the payload
    pub fn data_start(&self) -> u64 {
        self.entry.start as u64
    }

    /// Get the file table record of the file
    pub fn entry(&self) -> &FileEntry {
        self.entry
    }

    /// Get the payload as stored in the archive
    pub fn raw(&self) -> &[u8] {
        self.data.get_ref()
    }

    /// Convert the payload into its extracted form.
    ///
    /// Bitmaps become `.BMP` images and need the archive palette, text is de-obfuscated and
    /// everything else is returned as stored.
    pub fn decode(&self, palette: Option<&Palette>) -> Result<Vec<u8>> {
        let raw = self.raw();
        match self.kind() {
            EntryKind::Bitmap => {
                let palette = palette.ok_or_else(|| {
                    Error::PaletteNotFound(format!("for bitmap {}", self.path()))
                })?;
                bitmap::decode(raw, palette)
            }
            EntryKind::Text => text::decode(raw),
            EntryKind::Raw => Ok(raw.to_vec()),
            EntryKind::Unknown(tag) => {
                warn!(
                    "unexpected entry type {:#x} for {}, extracting as raw",
                    tag,
                    self.path()
                );
                Ok(raw.to_vec())
            }
        }
    }
}

impl Read for RsfFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

fn entry_path(directory: &DirectoryEntry, file: &FileEntry) -> String {
    format!("{}/{}", directory.name, file.name)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct EntryIndex {
    directory: usize,
    file: usize,
}

#[derive(Debug)]
struct Shared {
    format: ArchiveFormat,
    header: Header,
    directories: Vec<DirectoryEntry>,
    files: Vec<FileEntry>,
    entries: IndexMap<Box<str>, EntryIndex>,
}

/// Check the directory ranges against the file table and list the entries in directory order.
fn index_entries(
    directories: &[DirectoryEntry],
    files: &[FileEntry],
) -> Result<IndexMap<Box<str>, EntryIndex>> {
    let mut owner: Vec<Option<usize>> = vec![None; files.len()];
    let mut entries = IndexMap::with_capacity(files.len());

    for (directory_index, directory) in directories.iter().enumerate() {
        let range = directory.range();
        if range.end > files.len() {
            return Err(Error::DirectoryOutOfBounds {
                name: directory.name.clone(),
                start: range.start,
                end: range.end,
                files: files.len(),
            });
        }

        for file_index in range {
            if let Some(other) = owner[file_index].replace(directory_index) {
                return Err(Error::OverlappingDirectories {
                    first: directories[other].name.clone(),
                    second: directory.name.clone(),
                });
            }

            let path = entry_path(directory, &files[file_index]);
            let index = EntryIndex {
                directory: directory_index,
                file: file_index,
            };
            if entries.insert(path.clone().into_boxed_str(), index).is_some() {
                warn!("duplicate entry {}, only the last one is kept", path);
            }
        }
    }

    let orphans = owner.iter().filter(|o| o.is_none()).count();
    if orphans > 0 {
        warn!("{} file entries are not part of any directory", orphans);
    }

    Ok(entries)
}

/// RSF archive reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_rsf_contents(reader: impl Read + Seek) -> rsf_archive::error::Result<()> {
///     let mut rsf = rsf_archive::RsfArchive::new(reader)?;
///
///     for i in 0..rsf.len() {
///         let file = rsf.by_index(i)?;
///         println!("{}: {} ({} bytes)", file.path(), file.kind(), file.size());
///     }
///
///     Ok(())
/// }
/// ```
pub struct RsfArchive<R> {
    reader: R,
    shared: Shared,
}

impl<R> RsfArchive<R> {
    /// Total size of the payloads in the archive, if it can be known. Doesn't include the
    /// header or tables.
    pub fn payload_size(&self) -> Option<u64> {
        let mut total = 0u64;
        for entry in self.shared.entries.values() {
            total = total.checked_add(self.shared.files[entry.file].size as u64)?;
        }
        Some(total)
    }
}

impl<R: Read + Seek> RsfArchive<R> {
    /// Read a RSF archive collecting the files it contains.
    pub fn new(mut reader: R) -> Result<RsfArchive<R>> {
        let shared = Self::get_metadata(&mut reader)?;
        Ok(RsfArchive { reader, shared })
    }

    /// Number of entries reachable through the directory table.
    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    /// Whether this RSF archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The layout variant of the archive
    pub fn format(&self) -> ArchiveFormat {
        self.shared.format
    }

    /// The archive header
    pub fn header(&self) -> &Header {
        &self.shared.header
    }

    /// The directory table, in stored order
    pub fn directories(&self) -> &[DirectoryEntry] {
        &self.shared.directories
    }

    /// The file table, in stored order
    pub fn files(&self) -> &[FileEntry] {
        &self.shared.files
    }

    /// The file table entries belonging to `directory`
    pub fn files_in(&self, directory: &DirectoryEntry) -> &[FileEntry] {
        self.shared.files.get(directory.range()).unwrap_or_default()
    }

    /// Returns an iterator over the `DIR/NAME` paths of all entries, in directory order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.shared.entries.keys().map(|s| s.as_ref())
    }

    /// Get the index of a file entry by path, if it's present.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.shared.entries.get_index_of(name)
    }

    /// Get the path of a file entry, if it's present.
    #[inline(always)]
    pub fn name_for_index(&self, index: usize) -> Option<&str> {
        self.shared
            .entries
            .get_index(index)
            .map(|(name, _)| name.as_ref())
    }

    /// Search for a file entry by its `DIR/NAME` path
    pub fn by_name(&mut self, name: &str) -> Result<RsfFile<'_>> {
        let Some(index) = self.shared.entries.get_index_of(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a contained file by index
    pub fn by_index(&mut self, file_number: usize) -> Result<RsfFile<'_>> {
        let (_, index) = self
            .shared
            .entries
            .get_index(file_number)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(file_number)))?;

        let directory = &self.shared.directories[index.directory];
        let entry = &self.shared.files[index.file];
        let data = read_exact_at(&mut self.reader, entry.start as u64, entry.size as usize)?;

        Ok(RsfFile {
            directory,
            entry,
            data: Cursor::new(data),
        })
    }

    /// Load a palette from the `PAL` directory
    pub fn palette(&mut self, name: &str) -> Result<Palette> {
        Palette::find(
            &self.shared.directories,
            &self.shared.files,
            &mut self.reader,
            name,
        )
    }

    /// Decode every entry in directory order and hand it to `sink`.
    ///
    /// The palette called `palette_name` is loaded on the first bitmap, archives without
    /// bitmaps do not need one.
    pub fn extract_with<F>(&mut self, palette_name: &str, mut sink: F) -> Result<()>
    where
        F: FnMut(&RsfFile<'_>, &[u8]) -> Result<()>,
    {
        let mut palette = None;
        for i in 0..self.len() {
            let needs_palette = self
                .shared
                .entries
                .get_index(i)
                .is_some_and(|(_, index)| self.shared.files[index.file].kind == EntryKind::Bitmap);
            if needs_palette && palette.is_none() {
                palette = Some(self.palette(palette_name)?);
            }

            let file = self.by_index(i)?;
            let decoded = file.decode(palette.as_ref())?;
            sink(&file, &decoded)?;
        }
        Ok(())
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn get_table<T: FixedLayout>(reader: &mut R, start: u64, count: usize) -> Result<Vec<T>> {
        let bytes = read_exact_at(reader, start, count * T::SIZE)?;
        bytes.chunks_exact(T::SIZE).map(T::decode).collect()
    }

    fn get_metadata(reader: &mut R) -> Result<Shared> {
        let format = ArchiveFormat::detect(&read_exact_at(reader, 0, 1)?)?;
        let header = Header::decode(&read_exact_at(reader, 0, format.header_size())?)?;
        debug!(
            "{} holds {} directories and {} files",
            header.name, header.directory_count, header.file_count
        );

        let directories = Self::get_table::<DirectoryEntry>(
            reader,
            format.header_size() as u64,
            header.directory_count as usize,
        )?;
        let files = Self::get_table::<FileEntry>(
            reader,
            (format.header_size() + directories.len() * DirectoryEntry::SIZE) as u64,
            header.file_count as usize,
        )?;
        let entries = index_entries(&directories, &files)?;

        Ok(Shared {
            format,
            header,
            directories,
            files,
            entries,
        })
    }
}
