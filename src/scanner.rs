//! Component F: the top-level driver (§4.6).
//!
//! Owns the per-document temp directory, the group stack, and the working
//! frame, and pumps chunks from the host through the lexer until the input
//! is exhausted, a fatal error occurs, or the scan sink flags something.

use std::path::Path;

use crate::config::ScanConfig;
use crate::error::{Error, ErrorKind};
use crate::group_stack::{Frame, GroupStack};
use crate::host::{ChunkSource, MmapChunkSource, ScanOutcome, ScanSink};
use crate::lexer;
use crate::objdata::ScanAggregate;
use crate::Result;

/// Scans a single RTF document for embedded objects, handing each decoded
/// payload to a [`ScanSink`].
pub struct RtfObjectScanner {
    config: ScanConfig,
}

impl RtfObjectScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scans `path`, memory-mapping it for the duration of the call.
    pub fn scan_path(&self, path: &Path, sink: &mut dyn ScanSink) -> Result<ScanOutcome> {
        let mut source = MmapChunkSource::open(path)
            .map_err(|e| Error::new(ErrorKind::Mem, e))?;
        self.scan(&mut source, sink)
    }

    /// Scans a document pulled from `chunks`.
    pub fn scan(&self, chunks: &mut dyn ChunkSource, sink: &mut dyn ScanSink) -> Result<ScanOutcome> {
        let temp_dir = tempfile::Builder::new()
            .prefix("rtfobj-")
            .tempdir_in(&self.config.temp_root)
            .map_err(|e| Error::new(ErrorKind::TempDir, e))?;

        #[cfg(unix)]
        {
            use std::fs;
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            if let Err(e) = fs::set_permissions(temp_dir.path(), perms) {
                log::warn!("failed to restrict temp dir permissions: {e}");
            }
        }

        let mut object_config = self.config.clone();
        object_config.temp_root = temp_dir.path().to_path_buf();

        let mut stack = GroupStack::new(self.config.stack_growth);
        let mut frame = Frame::default();
        let mut agg = ScanAggregate::default();

        let result = self.pump(chunks, &mut frame, &mut stack, &object_config, sink, &mut agg);

        // Every exit path (success, error, or early flag) releases the
        // frame's bound callback and anything left on the stack (§5).
        let cleanup = self.cleanup(&mut frame, &mut stack, sink, &mut agg);

        if self.config.keep_temp_files {
            let _ = temp_dir.into_path();
        }

        result?;
        cleanup?;
        Ok(agg.into_outcome())
    }

    fn pump(
        &self,
        chunks: &mut dyn ChunkSource,
        frame: &mut Frame,
        stack: &mut GroupStack,
        object_config: &ScanConfig,
        sink: &mut dyn ScanSink,
        agg: &mut ScanAggregate,
    ) -> Result<()> {
        loop {
            if agg.is_flagged() {
                return Ok(());
            }
            let chunk = chunks.next_chunk(self.config.chunk_size);
            if chunk.is_empty() {
                return Ok(());
            }
            lexer::feed(chunk, frame, stack, object_config, sink, agg)?;
        }
    }

    fn cleanup(
        &self,
        frame: &mut Frame,
        stack: &mut GroupStack,
        sink: &mut dyn ScanSink,
        agg: &mut ScanAggregate,
    ) -> Result<()> {
        if frame.callback.is_bound() {
            frame.callback.end(sink, agg)?;
        }
        stack.drain(sink, agg)
    }
}
