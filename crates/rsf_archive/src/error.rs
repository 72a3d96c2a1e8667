//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Fewer bytes were available than a fixed-width field requires
    #[error("truncated input: expected {expected} bytes, found {available}")]
    TruncatedInput { expected: usize, available: usize },

    /// The first byte of the archive is not a known format marker
    #[error("unrecognized archive format (marker byte {0:#04x})")]
    UnrecognizedFormat(u8),

    /// The archive uses the old-style layout
    #[error("cannot handle old-style rsf archives")]
    #[diagnostic(help("only archives starting with 0x41 are supported"))]
    UnsupportedLegacyFormat,

    /// No palette with the requested name exists in the `PAL` directory
    #[error("unable to find palette {0}")]
    PaletteNotFound(String),

    /// A directory references entries past the end of the file table
    #[error("directory {name} references entries {start}..{end} but the file table has {files}")]
    DirectoryOutOfBounds {
        name: String,
        start: usize,
        end: usize,
        files: usize,
    },

    /// Two directories claim the same file table entry
    #[error("directories {first} and {second} overlap in the file table")]
    OverlappingDirectories { first: String, second: String },

    /// A text line descriptor points outside of the text data
    #[error("text line {line} ({start}..{end}) is outside of the {len} byte data region")]
    LineOutOfBounds {
        line: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    /// Image is not a bitmap this library can convert
    #[error("invalid bitmap: {0}")]
    InvalidBitmap(String),

    /// Text contains bytes that cannot be stored in a text entry
    #[error("invalid text: {0}")]
    InvalidText(String),

    /// A name does not fit in its fixed-width field
    #[error("name {name} is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },

    /// A name holds characters that cannot be stored as single bytes
    #[error("name {0} holds characters outside of Latin-1")]
    UnencodableName(String),

    /// The license text does not start with the format marker
    #[error("license {0:?} does not start with the format marker")]
    #[diagnostic(help("readers identify archives by the first byte of the license, start it with `A`"))]
    InvalidLicense(String),

    /// A value does not fit in the integer field it is stored in
    #[error("{field} value {value} does not fit in its field")]
    FieldOverflow { field: &'static str, value: usize },

    /// A file was started before any directory
    #[error("a directory must be started before adding files")]
    NoDirectoryStarted,

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

/// Convert a length into a narrower integer field, reporting which field overflowed
pub(crate) fn narrow<T: TryFrom<usize>>(field: &'static str, value: usize) -> Result<T> {
    T::try_from(value).map_err(|_| Error::FieldOverflow { field, value })
}
