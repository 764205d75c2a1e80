//! The surface this crate consumes from its containing scan engine.
//!
//! `spec.md` §6 describes these as external collaborators supplied by the
//! host (`cli_ctx`): a chunked view over the input bytes, and the two
//! downstream dispatchers that inspect a decoded object once it's been
//! materialised to a temp file. Both are out of scope to *implement* here,
//! this module only defines the traits and ships the one concrete
//! `ChunkSource` a standalone crate needs to be runnable on its own.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::Result;

/// A chunked view over the bytes of a single RTF document.
///
/// Mirrors the host's `fetch(offset, max_len) -> (ptr, len)` interface from
/// §6: repeated calls walk the document left to right, any chunk length is
/// valid, and an empty return signals end of input. Chunk boundaries carry
/// no semantic meaning: the lexer and objdata extractor are both built to
/// resume mid-token and mid-nibble across them (§8, scenario 6).
pub trait ChunkSource {
    /// Returns the next chunk of at most `max_len` bytes, or an empty slice
    /// once the input is exhausted.
    fn next_chunk(&mut self, max_len: usize) -> &[u8];
}

/// Walks a memory-mapped file in fixed-size chunks.
///
/// The real scan engine already holds the whole input mapped; this is the
/// concrete stand-in so the crate has a usable, self-contained entry point
/// (`RtfObjectScanner::scan_path`) instead of only an abstract trait.
pub struct MmapChunkSource {
    map: Mmap,
    offset: usize,
}

impl MmapChunkSource {
    /// Memory-maps `path` for reading.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only and this struct owns the mapping for
        // as long as any slice handed out from it can be observed; the
        // caller is expected not to mutate the underlying file concurrently,
        // the same assumption the host's own memory-mapped view makes.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map, offset: 0 })
    }
}

impl ChunkSource for MmapChunkSource {
    fn next_chunk(&mut self, max_len: usize) -> &[u8] {
        let end = (self.offset + max_len).min(self.map.len());
        let chunk = &self.map[self.offset..end];
        self.offset = end;
        chunk
    }
}

/// An in-memory [`ChunkSource`] that serves a buffer in caller-chosen chunk
/// sizes, used to exercise chunk-boundary behaviour in tests without
/// touching the filesystem.
pub struct SlicedChunkSource {
    data: Vec<u8>,
    offset: usize,
    sizes: std::vec::IntoIter<usize>,
}

impl SlicedChunkSource {
    /// Serves `data` using the given sequence of chunk lengths; once the
    /// sequence is exhausted, remaining data (if any) is served in one
    /// final chunk.
    pub fn new(data: Vec<u8>, sizes: Vec<usize>) -> Self {
        Self {
            data,
            offset: 0,
            sizes: sizes.into_iter(),
        }
    }

    /// Serves the whole buffer as a single chunk.
    pub fn whole(data: Vec<u8>) -> Self {
        let len = data.len();
        Self::new(data, vec![len])
    }
}

impl ChunkSource for SlicedChunkSource {
    fn next_chunk(&mut self, max_len: usize) -> &[u8] {
        if self.offset >= self.data.len() {
            return &[];
        }
        let want = self.sizes.next().unwrap_or(max_len).min(max_len);
        let end = (self.offset + want).min(self.data.len());
        let chunk = &self.data[self.offset..end];
        self.offset = end;
        chunk
    }
}

/// The result of handing a decoded embedded object to the outer scanner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Nothing actionable was found.
    Clean,
    /// The downstream scanner flagged the object; `detail` is an opaque,
    /// host-defined description (e.g. a signature name).
    Flagged {
        /// Host-defined description of what was flagged.
        detail: String,
    },
}

impl ScanOutcome {
    /// True if this outcome is [`ScanOutcome::Clean`].
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanOutcome::Clean)
    }
}

/// Downstream dispatchers for a decoded embedded object (§4.5.1, §6).
///
/// A non-clean result is the ordinary, expected way to report a threat:
/// return `Ok(ScanOutcome::Flagged { .. })`. Reserve `Err` for a scanner
/// failure severe enough to abort the document (§7 "host scanner's own
/// codes, propagated verbatim"); wrap it with [`crate::Error::scan`] if the
/// downstream scanner's own error type isn't already this crate's `Error`.
pub trait ScanSink {
    /// Scans a decoded OLE10Native blob.
    fn scan_ole10native(&mut self, object: &mut File) -> Result<ScanOutcome>;

    /// Scans a decoded object of unknown or OLE2 type, given a path hint
    /// (the temp file's own path) for diagnostics.
    fn scan_generic(&mut self, object: &mut File, path_hint: &Path) -> Result<ScanOutcome>;
}

/// A [`ScanSink`] that never flags anything, logging what it saw.
///
/// Stands in for the real scan engine's dispatch tree, which is explicitly
/// out of scope (§1): this crate's job ends at "materialise and hand off".
#[derive(Default)]
pub struct NullScanSink;

impl ScanSink for NullScanSink {
    fn scan_ole10native(&mut self, _object: &mut File) -> Result<ScanOutcome> {
        log::debug!("scan_ole10native: no downstream scanner configured, treating as clean");
        Ok(ScanOutcome::Clean)
    }

    fn scan_generic(&mut self, _object: &mut File, path_hint: &Path) -> Result<ScanOutcome> {
        log::debug!(
            "scan_generic({}): no downstream scanner configured, treating as clean",
            path_hint.display()
        );
        Ok(ScanOutcome::Clean)
    }
}
