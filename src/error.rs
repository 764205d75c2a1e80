use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

/// The fatal-to-the-document error classes from the design's error model.
///
/// Parser-level anomalies (overlong control word, parameter overflow, an
/// empty-stack pop, a magic mismatch in `\objdata`) are *not* represented
/// here: those are logged and recovered in place, never surfaced as an
/// `Err`. Only conditions that abort the current document reach this type.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// `EMEM`, allocation failure anywhere in the stack or extractor.
    Mem,
    /// `ETMPDIR`, the scan's temp directory could not be created.
    TempDir,
    /// `EWRITE`, a write to the extractor's temp object file was short or
    /// failed outright.
    Write,
    /// `EUNLINK`, removing a temp file after a clean scan failed. Reported,
    /// but never masks a threat verdict already produced by the scan.
    Unlink,
    /// The object's decoded size exceeded [`crate::ScanConfig::max_object_size`].
    TooLarge,
    /// A downstream scanner (`scan_ole10native` / `scan_generic`) returned a
    /// non-clean, fatal result.
    Scan,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mem => write!(f, "allocation failure"),
            Self::TempDir => write!(f, "could not create temp directory"),
            Self::Write => write!(f, "short or failed write to temp object file"),
            Self::Unlink => write!(f, "could not remove temp object file"),
            Self::TooLarge => write!(f, "decoded object exceeds configured size limit"),
            Self::Scan => write!(f, "downstream scan reported a fatal result"),
        }
    }
}

/// An error returned while extracting embedded objects from an RTF stream.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    /// Creates an error of the given kind, wrapping an arbitrary source.
    pub fn new<E>(kind: ErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            kind,
            source: Some(source.into()),
        }
    }

    /// Wraps a fatal error from a [`crate::ScanSink`] implementation as
    /// [`ErrorKind::Scan`]. `ScanSink::scan_ole10native`/`scan_generic`
    /// already return `crate::Result<ScanOutcome>`, so a host whose own
    /// downstream scanner reports a non-clean, fatal result (§7) uses this
    /// to fold that failure into the same error type this crate returns,
    /// rather than inventing its own `ErrorKind`.
    pub fn scan<E>(source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::new(ErrorKind::Scan, source)
    }

    /// Returns the [`ErrorKind`] for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Self::new(ErrorKind::Write, source)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
