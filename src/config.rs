use std::path::PathBuf;

/// Tunables for [`crate::RtfObjectScanner`].
///
/// Every constant the design calls out as fixed (the 32-letter control-word
/// bound, the 8 KiB scratch decode buffer, the 128-frame stack growth
/// increment) is exposed here so a host can tighten them without touching
/// the parser itself.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Maximum number of ASCII letters accumulated for a control word
    /// before the parser gives up on it and returns to `MAIN`. Default 32.
    pub max_control_word_len: usize,
    /// Preferred chunk size when pulling bytes from a [`crate::ChunkSource`].
    /// Advisory only, any chunk length the source returns is accepted.
    /// Default 8 KiB.
    pub chunk_size: usize,
    /// Size of the transient scratch buffer the objdata extractor de-hexes
    /// into before feeding its own state machine. Default 8 KiB.
    pub scratch_decode_size: usize,
    /// Number of frames the group stack's backing storage grows by when it
    /// fills up. Default 128.
    pub stack_growth: usize,
    /// Optional ceiling on the total decoded size of a single embedded
    /// object. `None` preserves the original unbounded behaviour; `Some(n)`
    /// aborts the document with [`crate::ErrorKind::TooLarge`] once more
    /// than `n` bytes have been written to the temp object file.
    pub max_object_size: Option<u64>,
    /// Keep temp files around after scanning instead of unlinking them.
    pub keep_temp_files: bool,
    /// Root directory under which per-document temp directories are
    /// created. Defaults to the platform temp directory.
    pub temp_root: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_control_word_len: 32,
            chunk_size: 8 * 1024,
            scratch_decode_size: 8 * 1024,
            stack_growth: 128,
            max_object_size: None,
            keep_temp_files: false,
            temp_root: std::env::temp_dir(),
        }
    }
}
