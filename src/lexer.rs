//! Component C: the RTF tokenizer (§3, §4.2, §4.3).
//!
//! Runs byte at a time (or in runs, for plain text) across however the host
//! chooses to chunk the document, driving the group stack and the action
//! dispatcher as it goes. There is no lookahead beyond the current byte:
//! every state transition below either consumes exactly one byte or decides
//! it needs to see the *next* byte fresh in a different state, which is why
//! several branches below don't advance the cursor.

use crate::actions;
use crate::config::ScanConfig;
use crate::dispatch;
use crate::group_stack::{Frame, GroupStack, ParseState};
use crate::host::ScanSink;
use crate::objdata::ScanAggregate;
use crate::Result;

fn is_control_terminator(b: u8) -> bool {
    b == b'{' || b == b'}' || b == b'\\'
}

/// Feeds one chunk of raw document bytes through the tokenizer.
///
/// `frame` is the lexer's current working frame and `stack` the group stack
/// it pushes/pops against; both persist across calls so a control word, a
/// hex nibble, or a multi-byte object payload can resume cleanly no matter
/// where the host happened to cut the chunk (§8, scenario 6).
pub fn feed(
    chunk: &[u8],
    frame: &mut Frame,
    stack: &mut GroupStack,
    config: &ScanConfig,
    sink: &mut dyn ScanSink,
    agg: &mut ScanAggregate,
) -> Result<()> {
    let mut i = 0;
    while i < chunk.len() {
        if agg.is_flagged() {
            return Ok(());
        }
        match frame.parse_state {
            ParseState::Main => {
                match chunk[i] {
                    b'{' => {
                        stack.push(frame);
                        i += 1;
                    }
                    b'}' => {
                        if frame.callback.is_bound() {
                            frame.callback.end(sink, agg)?;
                        }
                        stack.pop(frame);
                        i += 1;
                    }
                    b'\\' => {
                        frame.parse_state = ParseState::Control;
                        i += 1;
                    }
                    _ => {
                        let start = i;
                        while i < chunk.len() && !is_control_terminator(chunk[i]) {
                            i += 1;
                        }
                        if frame.callback.is_bound() {
                            frame.callback.process(&chunk[start..i], sink, agg)?;
                        }
                    }
                }
            }
            ParseState::Control => {
                if chunk[i].is_ascii_alphabetic() {
                    frame.control_word.clear();
                    frame.parse_state = ParseState::ControlWord;
                    // Re-examine this same byte in CONTROL_WORD.
                } else {
                    frame.parse_state = ParseState::ControlSymbol;
                    // Re-examine this same byte in CONTROL_SYMBOL.
                }
            }
            ParseState::ControlSymbol => {
                // A control symbol is exactly one byte, whatever it is
                // (`\{`, `\}`, `\\`, `\~`, ...); none of them are actions
                // this crate cares about, so the byte is simply consumed.
                frame.parse_state = ParseState::Main;
                i += 1;
            }
            ParseState::ControlWord => {
                let b = chunk[i];
                if b.is_ascii_alphabetic() {
                    if frame.control_word.len() == config.max_control_word_len {
                        log::warn!(
                            "control word exceeded {} letters, discarding",
                            config.max_control_word_len
                        );
                        frame.parse_state = ParseState::Main;
                        // Don't consume: the byte still needs MAIN's look.
                    } else {
                        frame.control_word.push(b as char);
                        i += 1;
                    }
                } else if b.is_ascii_whitespace() {
                    frame.control_word.push(b as char);
                    i += 1;
                    frame.parse_state = ParseState::InterpretControlWord;
                } else if b.is_ascii_digit() {
                    frame.control_word_param = 0;
                    frame.param_sign = 1;
                    frame.parse_state = ParseState::ControlWordParam;
                    // Don't consume: re-read this digit in CONTROL_WORD_PARAM.
                } else if b == b'-' {
                    frame.control_word_param = 0;
                    frame.param_sign = -1;
                    frame.parse_state = ParseState::ControlWordParam;
                    i += 1;
                } else {
                    frame.parse_state = ParseState::InterpretControlWord;
                    // Don't consume: no delimiter byte to eat here.
                }
            }
            ParseState::ControlWordParam => {
                let b = chunk[i];
                if b.is_ascii_digit() {
                    let digit = i64::from(b - b'0');
                    match frame
                        .control_word_param
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(digit))
                    {
                        Some(v) => {
                            frame.control_word_param = v;
                            i += 1;
                        }
                        None => {
                            log::warn!(
                                "control word parameter overflowed i64, discarding"
                            );
                            frame.parse_state = ParseState::Main;
                            // Consume the overflowing digit so the parser
                            // always makes forward progress.
                            i += 1;
                        }
                    }
                } else if b.is_ascii_alphabetic() {
                    // Stray letters inside a numeral are swallowed as part
                    // of the malformed parameter, same as the overflow path.
                    i += 1;
                } else {
                    frame.control_word_param *= frame.param_sign;
                    frame.parse_state = ParseState::InterpretControlWord;
                    // Don't consume: the delimiter gets MAIN's look.
                }
            }
            ParseState::InterpretControlWord => {
                if let Some(action) = actions::lookup(&frame.control_word) {
                    dispatch::apply(action, frame, config, sink, agg)?;
                }
                frame.control_word.clear();
                frame.parse_state = ParseState::Main;
                // No byte consumed; whatever is at `chunk[i]` (if anything)
                // gets reprocessed fresh in MAIN next iteration.
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullScanSink;

    fn run(input: &[u8]) -> (Frame, GroupStack) {
        let config = ScanConfig::default();
        let mut frame = Frame::default();
        let mut stack = GroupStack::new(config.stack_growth);
        let mut sink = NullScanSink::default();
        let mut agg = ScanAggregate::default();
        feed(input, &mut frame, &mut stack, &config, &mut sink, &mut agg).unwrap();
        (frame, stack)
    }

    #[test]
    fn balanced_groups_leave_an_empty_stack() {
        let (_, stack) = run(b"{\\rtf1 {\\b hi} there}");
        assert_eq!(stack.stored_frames(), 0);
        assert_eq!(stack.elements(), 0);
    }

    #[test]
    fn object_marks_frame_without_binding_a_callback() {
        let (frame, _) = run(b"{\\object");
        assert!(frame
            .encountered_top_level
            .contains(crate::actions::EncounteredFlags::OBJECT));
        assert!(!frame.callback.is_bound());
    }

    #[test]
    fn objdata_without_object_is_ignored() {
        let (frame, _) = run(b"{\\objdata 01020304}");
        assert!(!frame.callback.is_bound());
    }

    #[test]
    fn objdata_after_object_binds_a_callback_and_consumes_hex() {
        let (frame, _) = run(b"{\\object{\\objdata 0105");
        assert!(frame.callback.is_bound());
    }

    #[test]
    fn object_terminated_by_a_space_still_sets_the_flag() {
        // Spec scenario 2 terminates `\object` with a space, not `{`/`\`;
        // the accumulated control word is "object " and must still match.
        let (frame, _) = run(b"{\\object \\objdata 0105");
        assert!(frame
            .encountered_top_level
            .contains(crate::actions::EncounteredFlags::OBJECT));
        assert!(frame.callback.is_bound());
    }

    #[test]
    fn overlong_control_word_returns_to_main_without_consuming_terminator() {
        let long = "a".repeat(40);
        let input = format!("\\{} {{}}", long);
        let (frame, stack) = run(input.as_bytes());
        assert_eq!(stack.elements(), 0);
        assert!(matches!(frame.parse_state, ParseState::Main));
    }

    #[test]
    fn exactly_max_length_word_can_still_terminate_normally() {
        let word = "a".repeat(32);
        let input = format!("\\{} x", word);
        let (frame, _) = run(input.as_bytes());
        assert!(matches!(frame.parse_state, ParseState::Main));
    }

    #[test]
    fn control_word_parameter_overflow_does_not_hang() {
        let input = b"\\object99999999999999999999999999 {}";
        let (_, stack) = run(input);
        assert_eq!(stack.elements(), 0);
    }
}
