//! Types for writing RSF archives
//!

use bon::Builder;
use std::io::{self, Write};
use tracing::{debug, instrument, Level};

use crate::bitmap::{self, RowPadding};
use crate::error::{narrow, Error, Result};
use crate::text;
use crate::types::{
    check_field, DirectoryEntry, EntryKind, FileEntry, FixedLayout, Header, CURRENT_FORMAT_MARKER,
};

/// Options for how the RSF file should be written
#[derive(Debug, Clone, Builder)]
pub struct RsfWriterOptions {
    /// License text stored in the header. Its first byte must be `A` for readers to accept
    /// the archive.
    #[builder(into, default = String::from("All rights reserved"))]
    pub license: String,

    /// Archive name stored in the header
    #[builder(into, default)]
    pub name: String,

    /// Version text stored in the header
    #[builder(into, default)]
    pub version: String,

    /// Timestamp text stored in the header
    #[builder(into, default)]
    pub timestamp: String,

    /// Values for the unidentified header fields
    #[builder(default)]
    pub reserved: [u16; 5],

    /// How bitmap row padding is treated when converting images
    #[builder(default)]
    pub row_padding: RowPadding,
}

#[derive(Debug)]
struct PendingFile {
    name: String,
    kind: EntryKind,
    data: Vec<u8>,
}

/// RSF archive generator
///
/// ```
/// # fn doit() -> rsf_archive::error::Result<()>
/// # {
/// # use rsf_archive::RsfWriter;
/// use std::io::Write;
/// use rsf_archive::{write::RsfWriterOptions, EntryKind};
///
/// // We use a buffer here, though you'd normally use a `File`
/// let mut rsf = RsfWriter::new(
///     Vec::new(),
///     RsfWriterOptions::builder().name("GAME").build(),
/// );
///
/// rsf.start_directory("TXT")?;
/// rsf.start_file("HELLO.TXT", EntryKind::Text)?;
/// rsf.write_all(b"Hello, World!\n")?;
///
/// // Apply the changes you've made.
/// rsf.finish()?;
///
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct RsfWriter<W: Write> {
    inner: W,
    row_padding: RowPadding,
    header: Header,
    directories: Vec<DirectoryEntry>,
    files: Vec<FileEntry>,
    data_block: Vec<u8>,
    current_file: Option<PendingFile>,
}

impl<W: Write> RsfWriter<W> {
    /// Initializes the archive.
    ///
    /// Files are grouped into directories: call [`RsfWriter::start_directory`] first, then
    /// [`RsfWriter::start_file`] for every file and write its content through [`Write`].
    pub fn new(inner: W, options: RsfWriterOptions) -> RsfWriter<W> {
        RsfWriter {
            inner,
            row_padding: options.row_padding,
            header: Header {
                license: options.license,
                name: options.name,
                version: options.version,
                timestamp: options.timestamp,
                reserved: options.reserved,
                ..Default::default()
            },
            directories: Vec::new(),
            files: Vec::new(),
            data_block: Vec::new(),
            current_file: None,
        }
    }

    /// Returns true if a file is currently open for writing.
    pub const fn is_writing_file(&self) -> bool {
        self.current_file.is_some()
    }

    /// Start a new directory. Files started afterwards belong to it.
    #[instrument(skip(self), err)]
    pub fn start_directory(&mut self, name: &str) -> Result<()> {
        self.finish_file()?;
        check_field(name, DirectoryEntry::NAME_LEN)?;

        self.directories.push(DirectoryEntry {
            name: name.to_owned(),
            count: 0,
            start: narrow("directory start", self.files.len())?,
        });

        Ok(())
    }

    /// Start a new file in the current directory, stored as `kind`.
    ///
    /// Bitmap content must be a `.BMP` image and text content plain text, both are converted
    /// when the file is finished.
    #[instrument(skip(self), err)]
    pub fn start_file(&mut self, name: &str, kind: EntryKind) -> Result<()> {
        if self.directories.is_empty() {
            return Err(Error::NoDirectoryStarted);
        }

        self.finish_file()?;
        check_field(name, FileEntry::NAME_LEN)?;

        self.current_file = Some(PendingFile {
            name: name.to_owned(),
            kind,
            data: Vec::new(),
        });

        Ok(())
    }

    #[instrument(skip(self), err)]
    fn finish_file(&mut self) -> Result<()> {
        let Some(file) = self.current_file.take() else {
            return Ok(());
        };

        let payload = match file.kind {
            EntryKind::Bitmap => bitmap::encode(&file.data, self.row_padding)?,
            EntryKind::Text => text::encode(&file.data)?,
            EntryKind::Raw | EntryKind::Unknown(_) => file.data,
        };

        // Relative to the data block until the table sizes are known
        let start = self.data_block.len();
        let end = start + payload.len();
        debug!("{} ({}) takes {} bytes", file.name, file.kind, payload.len());

        self.files.push(FileEntry {
            name: file.name,
            kind: file.kind,
            size: narrow("file size", payload.len())?,
            start: narrow("file start", start)?,
            end: narrow("file end", end)?,
        });

        if let Some(directory) = self.directories.last_mut() {
            directory.count = narrow("directory size", directory.count as usize + 1)?;
        }

        self.data_block.extend_from_slice(&payload);

        Ok(())
    }

    /// Finish the last file and write all other RSF file structures
    ///
    /// This will return the writer, but one should normally not append any data to the end of the file.
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        self.finish_file()?;

        if !self.header.license.starts_with(char::from(CURRENT_FORMAT_MARKER)) {
            return Err(Error::InvalidLicense(self.header.license.clone()));
        }
        check_field(&self.header.license, Header::LICENSE_LEN)?;
        check_field(&self.header.name, Header::NAME_LEN)?;
        check_field(&self.header.version, Header::VERSION_LEN)?;
        check_field(&self.header.timestamp, Header::TIMESTAMP_LEN)?;

        self.header.directory_count = narrow("directory count", self.directories.len())?;
        self.header.file_count = narrow("file count", self.files.len())?;

        let tables = self.header.tables_size();
        for file in &mut self.files {
            file.start = narrow("file start", tables + file.start as usize)?;
            file.end = narrow("file end", tables + file.end as usize)?;
        }
        self.header.file_size = narrow("archive size", tables + self.data_block.len())?;

        self.inner.write_all(&self.header.encode()?)?;
        for directory in &self.directories {
            self.inner.write_all(&directory.encode()?)?;
        }
        for file in &self.files {
            self.inner.write_all(&file.encode()?)?;
        }
        self.inner.write_all(&self.data_block)?;
        self.inner.flush()?;

        Ok(self.inner)
    }
}

impl<W: Write> Write for RsfWriter<W> {
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size=buf.len()) )]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(file) = self.current_file.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "No file has been started",
            ));
        };
        file.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    #[instrument(skip(self), err)]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
