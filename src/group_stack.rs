//! Component A: the group stack (§4.1).
//!
//! RTF documents nest `{ … }` groups many levels deep, almost all of which
//! carry only formatting state this crate doesn't care about. Storing a
//! frame per brace would be O(depth) memory for no benefit, so runs of
//! "nothing interesting happened here" frames are compressed into a single
//! counter (`default_elements`) instead of being pushed individually.

use crate::actions::EncounteredFlags;
use crate::host::ScanSink;
use crate::objdata::{ObjdataExtractor, ScanAggregate};
use crate::Result;

/// The lexer's own state (§3, §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseState {
    Main,
    Control,
    ControlWord,
    ControlSymbol,
    ControlWordParam,
    InterpretControlWord,
}

impl Default for ParseState {
    fn default() -> Self {
        ParseState::Main
    }
}

/// The callback triple from §3, re-architected per §9's design note as a
/// tagged variant over typed state instead of three correlated function
/// pointers plus an opaque `callback_data`. There is currently exactly one
/// kind of callback a frame can carry.
pub enum FrameCallback {
    None,
    ObjectExtractor(Box<ObjdataExtractor>),
}

impl Default for FrameCallback {
    fn default() -> Self {
        FrameCallback::None
    }
}

impl FrameCallback {
    pub fn is_bound(&self) -> bool {
        !matches!(self, FrameCallback::None)
    }

    pub fn begin(&mut self) -> Result<()> {
        match self {
            FrameCallback::None => Ok(()),
            FrameCallback::ObjectExtractor(e) => e.begin(),
        }
    }

    pub fn process(
        &mut self,
        data: &[u8],
        sink: &mut dyn ScanSink,
        agg: &mut ScanAggregate,
    ) -> Result<()> {
        match self {
            FrameCallback::None => Ok(()),
            FrameCallback::ObjectExtractor(e) => e.process(data, sink, agg),
        }
    }

    /// Ends this callback, if any is bound, tearing down its state and
    /// unbinding it unconditionally: regardless of success or failure, a
    /// frame never keeps a callback alive past its `end`.
    pub fn end(&mut self, sink: &mut dyn ScanSink, agg: &mut ScanAggregate) -> Result<()> {
        let mut taken = std::mem::replace(self, FrameCallback::None);
        match &mut taken {
            FrameCallback::None => Ok(()),
            FrameCallback::ObjectExtractor(e) => e.end(sink, agg),
        }
    }
}

impl std::fmt::Debug for FrameCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameCallback::None => f.write_str("FrameCallback::None"),
            FrameCallback::ObjectExtractor(_) => f.write_str("FrameCallback::ObjectExtractor(..)"),
        }
    }
}

/// One parser frame (§3's `State`).
#[derive(Default)]
pub struct Frame {
    pub parse_state: ParseState,
    pub control_word: String,
    pub control_word_param: i64,
    pub param_sign: i64,
    /// Action codes seen at or above this frame; inherited across push/pop.
    pub encountered_top_level: EncounteredFlags,
    pub callback: FrameCallback,
    /// Number of compressed default frames this working value currently
    /// represents.
    pub default_elements: usize,
}

impl Frame {
    fn is_default(&self) -> bool {
        matches!(self.parse_state, ParseState::Main) && !self.callback.is_bound()
    }

    /// Resets the lexer-local fields back to a fresh `MAIN` frame, keeping
    /// `encountered_top_level` and `default_elements` as the caller wants
    /// them (callers decide whether to preserve or zero `default_elements`).
    fn reset_lexer_fields(&mut self) {
        self.parse_state = ParseState::Main;
        self.control_word.clear();
        self.control_word_param = 0;
        self.param_sign = 1;
        self.callback = FrameCallback::None;
    }
}

/// The group stack itself: an ordered sequence of non-default frames plus a
/// running count of logical pushes (§3).
#[derive(Default)]
pub struct GroupStack {
    frames: Vec<Frame>,
    elements: usize,
    growth: usize,
    popped_empty_once: bool,
}

impl GroupStack {
    pub fn new(growth: usize) -> Self {
        Self {
            frames: Vec::with_capacity(16),
            elements: 0,
            growth: growth.max(1),
            popped_empty_once: false,
        }
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    /// Non-default frames currently materialised on the stack, the memory
    /// actually consumed, as opposed to `elements()` which also counts
    /// compressed default pushes (§8 "bounded memory").
    pub fn stored_frames(&self) -> usize {
        self.frames.len()
    }

    /// Push (`{`): §4.1.
    pub fn push(&mut self, state: &mut Frame) {
        self.elements += 1;
        if state.is_default() {
            state.default_elements += 1;
            state.reset_lexer_fields();
            // encountered_top_level and default_elements are preserved.
        } else {
            if self.frames.len() == self.frames.capacity() {
                self.frames.reserve(self.growth);
            }
            let encountered = state.encountered_top_level;
            let pushed = std::mem::take(state);
            self.frames.push(pushed);
            state.encountered_top_level = encountered;
            state.default_elements = 0;
        }
    }

    /// Pop (`}`): §4.1. Popping an empty stack is logged once and is
    /// otherwise non-fatal.
    pub fn pop(&mut self, state: &mut Frame) {
        self.elements = self.elements.saturating_sub(1);
        if state.default_elements > 0 {
            state.default_elements -= 1;
            state.reset_lexer_fields();
            return;
        }
        match self.frames.pop() {
            Some(frame) => *state = frame,
            None => {
                if !self.popped_empty_once {
                    log::warn!("group stack: unbalanced '}}' with an empty stack, ignoring");
                    self.popped_empty_once = true;
                }
                let encountered = state.encountered_top_level;
                *state = Frame::default();
                state.encountered_top_level = encountered;
            }
        }
    }

    /// Drains every remaining stored frame, invoking `end` on any bound
    /// callback, for use on abort/EOF cleanup (§4.6, §5).
    pub fn drain(&mut self, sink: &mut dyn ScanSink, agg: &mut ScanAggregate) -> Result<()> {
        while let Some(mut frame) = self.frames.pop() {
            if frame.callback.is_bound() {
                frame.callback.end(sink, agg)?;
            }
        }
        Ok(())
    }
}
