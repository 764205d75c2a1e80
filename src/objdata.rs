//! Component E: the `\objdata` hex-decoder and embedded-object state
//! machine (§4.5).
//!
//! Two state machines are layered here: a tiny one that turns ASCII hex
//! (optionally interleaved with whitespace or other junk) into bytes while
//! carrying a half-decoded nibble across calls, and the seven-state object
//! machine that walks the decoded byte stream looking for an OLE10Native
//! header, a description, a reserved block, and finally the payload itself.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use crate::config::ScanConfig;
use crate::error::{Error, ErrorKind};
use crate::host::{ScanOutcome, ScanSink};
use crate::Result;

/// `01 05 00 00 02 00 00 00`, the fixed OLE10Native object header magic
/// (§4.5, state 1).
const MAGIC: [u8; 8] = [0x01, 0x05, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];

/// Maximum bytes of the description string actually copied into
/// `desc_name`; declared lengths beyond this are still skipped over in
/// full, just not retained (§9 Open Questions).
const MAX_DESC_NAME: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ObjState {
    WaitMagic,
    WaitDescLen,
    WaitDesc,
    WaitZero,
    WaitDataSize,
    DumpData,
    /// Terminal sink for an object whose temp file could not be created:
    /// the declared payload is consumed and dropped so the hex stream
    /// stays aligned for a possible next object, but nothing is written
    /// or handed to a scanner (§4.5 state 7).
    DumpDiscard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flavour {
    Ole2,
    Ole10Native,
}

/// Accumulates the document-wide scan verdict. The first non-clean result
/// observed wins and is treated as terminal for the document (§7: a
/// host-scanner result is "considered fatal to the document if non-clean",
/// i.e. there is nothing further worth extracting once something's already
/// been flagged).
#[derive(Debug, Default)]
pub struct ScanAggregate {
    outcome: Option<ScanOutcome>,
}

impl ScanAggregate {
    /// Records an outcome, keeping the first non-clean one seen.
    pub fn record(&mut self, outcome: ScanOutcome) {
        if self.outcome.is_none() || self.outcome.as_ref().map(ScanOutcome::is_clean) == Some(true)
        {
            self.outcome = Some(outcome);
        }
    }

    /// True once a non-clean outcome has been recorded.
    pub fn is_flagged(&self) -> bool {
        matches!(&self.outcome, Some(o) if !o.is_clean())
    }

    /// Consumes the aggregate, defaulting to [`ScanOutcome::Clean`] if
    /// nothing was ever recorded.
    pub fn into_outcome(self) -> ScanOutcome {
        self.outcome.unwrap_or(ScanOutcome::Clean)
    }
}

/// Per-frame extraction context (§3's "objdata context").
pub struct ObjdataExtractor {
    config: ScanConfig,
    state: ObjState,
    bytes_read: usize,
    partial_nibble: Option<u8>,
    magic_mismatch_logged: bool,
    desc_len: u32,
    desc_name: Option<Vec<u8>>,
    declared_data_len: u32,
    remaining: u32,
    classify_buf: Vec<u8>,
    flavour: Option<Flavour>,
    out_file: Option<File>,
    out_path: Option<PathBuf>,
}

impl ObjdataExtractor {
    /// Creates a fresh extractor, ready to receive hex text from the first
    /// byte after `\objdata`.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            state: ObjState::WaitMagic,
            bytes_read: 0,
            partial_nibble: None,
            magic_mismatch_logged: false,
            desc_len: 0,
            desc_name: None,
            declared_data_len: 0,
            remaining: 0,
            classify_buf: Vec::with_capacity(2),
            flavour: None,
            out_file: None,
            out_path: None,
        }
    }

    /// No-op hook kept for symmetry with a future callback kind; this
    /// extractor needs no setup beyond construction.
    pub fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// Feeds a run of raw (possibly non-hex-interleaved) bytes from the
    /// lexer's `MAIN` state to the hex decoder.
    pub fn process(
        &mut self,
        raw: &[u8],
        sink: &mut dyn ScanSink,
        agg: &mut ScanAggregate,
    ) -> Result<()> {
        let cap = self.config.scratch_decode_size.max(1);
        let mut scratch = Vec::with_capacity(cap.min(raw.len() / 2 + 1));
        for &byte in raw {
            if !byte.is_ascii_hexdigit() {
                continue;
            }
            let nibble = hex_value(byte);
            match self.partial_nibble.take() {
                None => self.partial_nibble = Some(nibble),
                Some(hi) => {
                    scratch.push((hi << 4) | nibble);
                    if scratch.len() == cap {
                        self.feed_decoded(&scratch, sink, agg)?;
                        scratch.clear();
                    }
                }
            }
        }
        if !scratch.is_empty() {
            self.feed_decoded(&scratch, sink, agg)?;
        }
        Ok(())
    }

    /// Called when the bound frame closes (`}`) or a sibling `\objdata`
    /// restarts extraction (§4.4). Any object still mid-flight is flushed
    /// and handed to the scanner as-is: a truncated payload is still worth
    /// inspecting, not silently dropped.
    pub fn end(&mut self, sink: &mut dyn ScanSink, agg: &mut ScanAggregate) -> Result<()> {
        if self.out_file.is_some() {
            // Flush whatever was buffered for classification but never
            // written because the object never reached its declared length.
            if self.flavour.is_none() && !self.classify_buf.is_empty() {
                let buf = std::mem::take(&mut self.classify_buf);
                self.classify_and_write(&buf)?;
            }
            let outcome = self.finish(sink)?;
            agg.record(outcome);
        }
        self.desc_name = None;
        Ok(())
    }

    fn feed_decoded(
        &mut self,
        mut data: &[u8],
        sink: &mut dyn ScanSink,
        agg: &mut ScanAggregate,
    ) -> Result<()> {
        while !data.is_empty() {
            match self.state {
                ObjState::WaitMagic => data = self.step_wait_magic(data),
                ObjState::WaitDescLen => data = self.step_wait_desc_len(data),
                ObjState::WaitDesc => data = self.step_wait_desc(data),
                ObjState::WaitZero => data = self.step_wait_zero(data),
                ObjState::WaitDataSize => data = self.step_wait_data_size(data)?,
                ObjState::DumpData => data = self.step_dump_data(data, sink, agg)?,
                ObjState::DumpDiscard => data = self.step_dump_discard(data),
            }
        }
        Ok(())
    }

    fn step_wait_magic<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let take = (8 - self.bytes_read).min(data.len());
        for &b in &data[..take] {
            if b != MAGIC[self.bytes_read] && !self.magic_mismatch_logged {
                log::warn!("objdata: OLE10Native magic mismatch, treating input as malformed but continuing");
                self.magic_mismatch_logged = true;
            }
            self.bytes_read += 1;
        }
        if self.bytes_read == 8 {
            self.state = ObjState::WaitDescLen;
            self.bytes_read = 0;
            self.magic_mismatch_logged = false;
        }
        &data[take..]
    }

    fn step_wait_desc_len<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let take = (4 - self.bytes_read).min(data.len());
        for &b in &data[..take] {
            self.desc_len |= (b as u32) << (8 * self.bytes_read);
            self.bytes_read += 1;
        }
        if self.bytes_read == 4 {
            let cap = (self.desc_len as usize).min(MAX_DESC_NAME);
            self.desc_name = Some(Vec::with_capacity(cap + 1));
            self.state = ObjState::WaitDesc;
            self.bytes_read = 0;
        }
        &data[take..]
    }

    fn step_wait_desc<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let total = self.desc_len as usize;
        let take = (total - self.bytes_read).min(data.len());
        for &b in &data[..take] {
            if self.bytes_read < MAX_DESC_NAME {
                if let Some(name) = self.desc_name.as_mut() {
                    name.push(b);
                }
            }
            self.bytes_read += 1;
        }
        if self.bytes_read == total {
            self.state = ObjState::WaitZero;
            self.bytes_read = 0;
        }
        &data[take..]
    }

    fn step_wait_zero<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        // Consume min(remaining-in-chunk, 8 - bytes_read) and advance both
        // counters by that same amount (§9 Open Questions).
        let take = (8 - self.bytes_read).min(data.len());
        self.bytes_read += take;
        if self.bytes_read == 8 {
            self.state = ObjState::WaitDataSize;
            self.bytes_read = 0;
        }
        &data[take..]
    }

    fn step_wait_data_size<'a>(&mut self, data: &'a [u8]) -> Result<&'a [u8]> {
        let take = (4 - self.bytes_read).min(data.len());
        for &b in &data[..take] {
            self.declared_data_len |= (b as u32) << (8 * self.bytes_read);
            self.bytes_read += 1;
        }
        let rest = &data[take..];
        if self.bytes_read == 4 {
            if let Some(max) = self.config.max_object_size {
                if u64::from(self.declared_data_len) > max {
                    return Err(Error::from(ErrorKind::TooLarge));
                }
            }
            // §4.5 state 5 creates the temp file unconditionally, even for
            // a declared length of zero: the object still gets handed to
            // decode_and_scan as an empty file rather than being skipped.
            self.remaining = self.declared_data_len;
            self.bytes_read = 0;
            match self.open_temp_file() {
                Ok(()) => self.state = ObjState::DumpData,
                Err(e) => {
                    log::warn!("objdata: could not create temp file, discarding object payload: {e}");
                    self.state = ObjState::DumpDiscard;
                }
            }
        }
        Ok(rest)
    }

    fn step_dump_discard<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let take = (self.remaining as usize).min(data.len());
        self.remaining -= take as u32;
        let rest = &data[take..];
        if self.remaining == 0 {
            self.state = ObjState::WaitMagic;
            self.bytes_read = 0;
            self.desc_len = 0;
            self.declared_data_len = 0;
            self.desc_name = None;
        }
        rest
    }

    fn step_dump_data<'a>(
        &mut self,
        mut data: &'a [u8],
        sink: &mut dyn ScanSink,
        agg: &mut ScanAggregate,
    ) -> Result<&'a [u8]> {
        if self.flavour.is_none() && self.declared_data_len == 0 {
            // Nothing to classify or write for a zero-length payload; the
            // temp file still exists (opened unconditionally in
            // step_wait_data_size) and still goes to decode_and_scan, just
            // as an empty file.
            let outcome = self.finish(sink)?;
            agg.record(outcome);
            if agg.is_flagged() {
                return Ok(&[]);
            }
            self.state = ObjState::WaitMagic;
            self.bytes_read = 0;
            self.desc_len = 0;
            self.declared_data_len = 0;
            self.desc_name = None;
            return Ok(data);
        }

        if self.flavour.is_none() {
            while self.classify_buf.len() < 2
                && self.classify_buf.len() < self.declared_data_len as usize
                && !data.is_empty()
            {
                self.classify_buf.push(data[0]);
                data = &data[1..];
            }
            let have_enough = self.classify_buf.len() == 2
                || self.classify_buf.len() >= self.declared_data_len as usize;
            if have_enough {
                let buf = std::mem::take(&mut self.classify_buf);
                self.classify_and_write(&buf)?;
            }
        }

        if self.flavour.is_some() {
            let take = (self.remaining as usize).min(data.len());
            if take > 0 {
                self.write_all(&data[..take])?;
                self.remaining -= take as u32;
                data = &data[take..];
            }
            if self.remaining == 0 {
                let outcome = self.finish(sink)?;
                agg.record(outcome);
                if agg.is_flagged() {
                    return Ok(&[]);
                }
                self.state = ObjState::WaitMagic;
                self.bytes_read = 0;
                self.desc_len = 0;
                self.declared_data_len = 0;
                self.desc_name = None;
            }
        }
        Ok(data)
    }

    fn classify_and_write(&mut self, buf: &[u8]) -> Result<()> {
        let flavour = if buf.len() >= 2 && buf[0] == 0xD0 && buf[1] == 0xCF {
            Flavour::Ole2
        } else {
            Flavour::Ole10Native
        };
        if flavour == Flavour::Ole10Native {
            log::debug!("objdata: classified as OLE10Native");
            self.write_all(&self.declared_data_len.to_le_bytes())?;
        } else {
            log::debug!("objdata: classified as OLE2");
        }
        self.flavour = Some(flavour);
        self.remaining = self.remaining.saturating_sub(buf.len() as u32);
        self.write_all(buf)
    }

    fn open_temp_file(&mut self) -> Result<()> {
        let named = tempfile::Builder::new()
            .prefix("rtfobj-")
            .tempfile_in(&self.config.temp_root)
            .map_err(|e| Error::new(ErrorKind::TempDir, e))?;
        let (file, path) = named.keep().map_err(|e| Error::new(ErrorKind::Write, e.error))?;
        self.out_file = Some(file);
        self.out_path = Some(path);
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self.out_file.as_mut() {
            Some(file) => file.write_all(buf).map_err(Error::from),
            None => Ok(()),
        }
    }

    /// §4.5.1: hand the completed temp file to the right scanner, then
    /// clean it up.
    fn finish(&mut self, sink: &mut dyn ScanSink) -> Result<ScanOutcome> {
        let mut file = self.out_file.take();
        let path = self.out_path.take();

        if let Some(file) = file.as_mut() {
            file.flush().map_err(Error::from)?;
        }

        let outcome = match (self.flavour, file.as_mut()) {
            (Some(Flavour::Ole10Native), Some(f)) => sink.scan_ole10native(f)?,
            (_, Some(f)) => {
                let hint = path.clone().unwrap_or_default();
                sink.scan_generic(f, &hint)?
            }
            (_, None) => ScanOutcome::Clean,
        };

        drop(file);
        self.flavour = None;

        if let Some(path) = path {
            if !self.config.keep_temp_files {
                if let Err(e) = std::fs::remove_file(&path) {
                    // Reported, not returned: per §7 precedence, EUNLINK
                    // never masks a threat verdict the scan already
                    // produced, so it's logged rather than propagated.
                    let unlink_err = Error::new(ErrorKind::Unlink, e);
                    log::error!("objdata: could not remove {}: {unlink_err}", path.display());
                }
            }
        }

        Ok(outcome)
    }
}

/// 256-entry ASCII-hex-digit → nibble table; non-hex bytes map to 0 and are
/// filtered out by the `is_ascii_hexdigit` gate before lookup.
const fn build_hex_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as u8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'a' as usize + i] = 10 + i as u8;
        table[b'A' as usize + i] = 10 + i as u8;
        i += 1;
    }
    table
}

const HEX_TABLE: [u8; 256] = build_hex_table();

fn hex_value(byte: u8) -> u8 {
    HEX_TABLE[byte as usize]
}
