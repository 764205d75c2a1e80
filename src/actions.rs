//! Component B: the control-word action table.
//!
//! A fixed, tiny vocabulary (currently `\object` and `\objdata`), so a
//! linearly-scanned slice is the right data structure; there is no removal
//! and no iteration need that would justify a hash map.

use bitflags::bitflags;

bitflags! {
    /// Bitset of action codes whose control words have been seen at or
    /// above a given group-stack frame (`State::encountered_top_level` in
    /// §3). Persisted across push/pop so nested `\objdata` still binds to
    /// an enclosing `\object` (§4.4).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EncounteredFlags: u32 {
        /// `\object` has been seen.
        const OBJECT = 0b01;
    }
}

/// Action codes the dispatcher (§4.4) reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// `\object`, marks the frame (and its descendants) as being inside an
    /// object group.
    Object,
    /// `\objdata `, note the trailing space baked into the lookup key: the
    /// action table key is the control word *including* the terminating
    /// whitespace byte the lexer accumulates (§4.2).
    ObjectData,
}

/// Linearly-scanned control-word -> action mapping (§4.2).
const TABLE: &[(&str, Action)] = &[("object", Action::Object), ("objdata ", Action::ObjectData)];

/// Looks up a control word (as accumulated by the lexer, terminator
/// included for `objdata `) in the action table.
///
/// Matched as a prefix, not exact equality: `\object` can be terminated by
/// any whitespace byte (space, tab, CR, ...), not just the literal single
/// space baked into the `"object"` key, so the accumulated control word is
/// `"object "`, `"object\t"`, etc. Table order doesn't matter here:
/// `"objdata "` is not a prefix of any accumulated `\object` word and vice
/// versa, so the two keys never collide.
pub fn lookup(control_word: &str) -> Option<Action> {
    TABLE
        .iter()
        .find(|(key, _)| control_word.starts_with(key))
        .map(|(_, action)| *action)
}
