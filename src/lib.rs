//! Streaming extraction of embedded objects (`\object`/`\objdata` groups)
//! from RTF documents.
//!
//! This crate does the parsing and materialisation only: it walks an RTF
//! document's group structure and control words looking for embedded
//! objects, hex-decodes and classifies each one (OLE2 vs. OLE10Native), and
//! hands the result off as a temp file to a host-supplied [`ScanSink`].
//! Deciding *what to do* with a decoded object (signature matching,
//! unpacking further container formats, whatever the containing engine
//! does) is explicitly the host's job.
//!
//! The entry point is [`RtfObjectScanner`]; [`ScanConfig`] tunes its limits
//! and [`host`] defines the collaborator traits a caller implements.

mod actions;
mod config;
mod dispatch;
mod error;
mod group_stack;
mod host;
mod lexer;
mod objdata;
mod scanner;

pub use config::ScanConfig;
pub use error::{Error, ErrorKind, Result};
pub use host::{ChunkSource, MmapChunkSource, NullScanSink, ScanOutcome, ScanSink, SlicedChunkSource};
pub use scanner::RtfObjectScanner;
