//! Component D: translates a recognised action code into a per-frame
//! callback binding (§4.4).

use crate::actions::{Action, EncounteredFlags};
use crate::config::ScanConfig;
use crate::group_stack::{Frame, FrameCallback};
use crate::host::ScanSink;
use crate::objdata::{ObjdataExtractor, ScanAggregate};
use crate::Result;

/// Applies a recognised action to the active frame.
pub fn apply(
    action: Action,
    frame: &mut Frame,
    config: &ScanConfig,
    sink: &mut dyn ScanSink,
    agg: &mut ScanAggregate,
) -> Result<()> {
    match action {
        Action::Object => {
            frame.encountered_top_level |= EncounteredFlags::OBJECT;
            Ok(())
        }
        Action::ObjectData => {
            if !frame.encountered_top_level.contains(EncounteredFlags::OBJECT) {
                log::debug!("objdata seen with no enclosing \\object, ignoring");
                return Ok(());
            }
            if frame.callback.is_bound() {
                // A sibling `\objdata` restarts extraction (§4.4): finish
                // whatever the previous one had in flight before rebinding.
                frame.callback.end(sink, agg)?;
            }
            let mut extractor = Box::new(ObjdataExtractor::new(config.clone()));
            extractor.begin()?;
            frame.callback = FrameCallback::ObjectExtractor(extractor);
            Ok(())
        }
    }
}
