//! End-to-end scenarios driving [`rtfobj::RtfObjectScanner`] over whole
//! documents, exercising the scan sink and the chunk boundary behaviour a
//! single in-process module can't (the sink is a trait object boundary
//! here, same as the real host would cross).

use std::cell::RefCell;
use std::fs::File;
use std::path::Path;

use rtfobj::{RtfObjectScanner, ScanConfig, ScanOutcome, ScanSink, SlicedChunkSource};

/// Records every call it receives instead of always answering clean, so
/// tests can assert on what actually reached the sink.
#[derive(Default)]
struct RecordingSink {
    ole10native_calls: RefCell<usize>,
    generic_calls: RefCell<usize>,
    flag_ole10native: bool,
}

impl ScanSink for RecordingSink {
    fn scan_ole10native(&mut self, _object: &mut File) -> rtfobj::Result<ScanOutcome> {
        *self.ole10native_calls.borrow_mut() += 1;
        if self.flag_ole10native {
            Ok(ScanOutcome::Flagged {
                detail: "test signature".into(),
            })
        } else {
            Ok(ScanOutcome::Clean)
        }
    }

    fn scan_generic(&mut self, _object: &mut File, _path_hint: &Path) -> rtfobj::Result<ScanOutcome> {
        *self.generic_calls.borrow_mut() += 1;
        Ok(ScanOutcome::Clean)
    }
}

fn hexlify(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().flat_map(|b| format!("{b:02x}").into_bytes()).collect()
}

const MAGIC: [u8; 8] = [0x01, 0x05, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];

fn ole10native_object(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&0u32.to_le_bytes()); // empty description
    out.extend_from_slice(&[0u8; 8]); // reserved block
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn ole2_object(payload_tail: &[u8]) -> Vec<u8> {
    let mut payload = vec![0xD0, 0xCF];
    payload.extend_from_slice(payload_tail);
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

fn rtf_with_object(hex: &[u8]) -> Vec<u8> {
    let mut doc = Vec::new();
    doc.extend_from_slice(b"{\\rtf1\\object{\\objdata ");
    doc.extend_from_slice(hex);
    doc.extend_from_slice(b"}}");
    doc
}

fn scan_whole(doc: Vec<u8>, sink: &mut dyn ScanSink) -> rtfobj::Result<ScanOutcome> {
    let scanner = RtfObjectScanner::new(ScanConfig::default());
    let mut source = SlicedChunkSource::whole(doc);
    scanner.scan(&mut source, sink)
}

#[test]
fn single_ole10native_object_reaches_the_sink() {
    let hex = hexlify(&ole10native_object(b"hello world"));
    let mut sink = RecordingSink::default();
    let outcome = scan_whole(rtf_with_object(&hex), &mut sink).unwrap();
    assert_eq!(outcome, ScanOutcome::Clean);
    assert_eq!(*sink.ole10native_calls.borrow(), 1);
    assert_eq!(*sink.generic_calls.borrow(), 0);
}

#[test]
fn ole2_payload_routes_to_generic_scan() {
    let hex = hexlify(&ole2_object(&[0x01, 0x02, 0x03]));
    let mut sink = RecordingSink::default();
    scan_whole(rtf_with_object(&hex), &mut sink).unwrap();
    assert_eq!(*sink.generic_calls.borrow(), 1);
    assert_eq!(*sink.ole10native_calls.borrow(), 0);
}

#[test]
fn object_terminated_by_space_before_objdata_still_binds() {
    // Literal shape of spec §8 scenario 2: `\object` is followed by a
    // space, not `{`, before the nested `\objdata` group.
    let hex = hexlify(&ole2_object(&[]));
    let mut doc = Vec::new();
    doc.extend_from_slice(b"{\\rtf1 {\\object \\objdata ");
    doc.extend_from_slice(&hex);
    doc.extend_from_slice(b"}}");

    let mut sink = RecordingSink::default();
    let outcome = scan_whole(doc, &mut sink).unwrap();
    assert_eq!(outcome, ScanOutcome::Clean);
    assert_eq!(*sink.generic_calls.borrow(), 1);
}

#[test]
fn objdata_outside_any_object_group_is_never_extracted() {
    let hex = hexlify(&ole10native_object(b"should not run"));
    let mut doc = Vec::new();
    doc.extend_from_slice(b"{\\rtf1{\\objdata ");
    doc.extend_from_slice(&hex);
    doc.extend_from_slice(b"}}");
    let mut sink = RecordingSink::default();
    scan_whole(doc, &mut sink).unwrap();
    assert_eq!(*sink.ole10native_calls.borrow(), 0);
    assert_eq!(*sink.generic_calls.borrow(), 0);
}

#[test]
fn flagged_object_short_circuits_the_rest_of_the_document() {
    let flagged_hex = hexlify(&ole10native_object(b"bad"));
    let clean_hex = hexlify(&ole10native_object(b"good"));
    let mut doc = Vec::new();
    doc.extend_from_slice(b"{\\rtf1");
    doc.extend_from_slice(&rtf_with_object(&flagged_hex));
    doc.extend_from_slice(&rtf_with_object(&clean_hex));
    doc.extend_from_slice(b"}");

    let mut sink = RecordingSink {
        flag_ole10native: true,
        ..RecordingSink::default()
    };
    let outcome = scan_whole(doc, &mut sink).unwrap();
    assert_eq!(
        outcome,
        ScanOutcome::Flagged {
            detail: "test signature".into()
        }
    );
    assert_eq!(*sink.ole10native_calls.borrow(), 1);
}

#[test]
fn sibling_objdata_restarts_extraction_mid_group() {
    // Two `\objdata` runs inside the same `\object` group: the second one
    // must end the first extractor (even though its group never closed)
    // and bind a fresh one (§4.4).
    let first = hexlify(&ole10native_object(b"first"));
    let second = hexlify(&ole10native_object(b"second"));
    let mut doc = Vec::new();
    doc.extend_from_slice(b"{\\rtf1\\object{\\objdata ");
    doc.extend_from_slice(&first);
    doc.extend_from_slice(b"}{\\objdata ");
    doc.extend_from_slice(&second);
    doc.extend_from_slice(b"}}");

    let mut sink = RecordingSink::default();
    let outcome = scan_whole(doc, &mut sink).unwrap();
    assert_eq!(outcome, ScanOutcome::Clean);
    assert_eq!(*sink.ole10native_calls.borrow(), 2);
}

#[test]
fn nested_object_inherits_an_ancestors_object_marker() {
    let hex = hexlify(&ole10native_object(b"nested"));
    let mut doc = Vec::new();
    doc.extend_from_slice(b"{\\rtf1\\object{\\pict{\\objdata ");
    doc.extend_from_slice(&hex);
    doc.extend_from_slice(b"}}}");

    let mut sink = RecordingSink::default();
    scan_whole(doc, &mut sink).unwrap();
    assert_eq!(*sink.ole10native_calls.borrow(), 1);
}

#[test]
fn arbitrary_chunk_boundaries_never_lose_or_duplicate_the_object() {
    let hex = hexlify(&ole10native_object(b"chunked payload across many cuts"));
    let doc = rtf_with_object(&hex);

    // Exercise a spread of cut points, including ones that land inside a
    // hex pair and inside the OLE10Native magic.
    for chunk_len in [1usize, 2, 3, 7, 13] {
        let sizes = vec![chunk_len; doc.len()];
        let scanner = RtfObjectScanner::new(ScanConfig::default());
        let mut source = SlicedChunkSource::new(doc.clone(), sizes);
        let mut sink = RecordingSink::default();
        let outcome = scanner.scan(&mut source, &mut sink).unwrap();
        assert_eq!(outcome, ScanOutcome::Clean, "chunk_len={chunk_len}");
        assert_eq!(*sink.ole10native_calls.borrow(), 1, "chunk_len={chunk_len}");
    }
}

#[test]
fn unbalanced_closing_brace_does_not_abort_the_scan() {
    let hex = hexlify(&ole10native_object(b"ok"));
    let mut doc = Vec::new();
    doc.extend_from_slice(b"}}}{\\rtf1\\object{\\objdata ");
    doc.extend_from_slice(&hex);
    doc.extend_from_slice(b"}}");

    let mut sink = RecordingSink::default();
    let outcome = scan_whole(doc, &mut sink).unwrap();
    assert_eq!(outcome, ScanOutcome::Clean);
    assert_eq!(*sink.ole10native_calls.borrow(), 1);
}

#[test]
fn max_object_size_aborts_oversized_objects() {
    let hex = hexlify(&ole10native_object(&vec![0x41; 64]));
    let mut config = ScanConfig::default();
    config.max_object_size = Some(8);
    let scanner = RtfObjectScanner::new(config);
    let mut source = SlicedChunkSource::whole(rtf_with_object(&hex));
    let mut sink = RecordingSink::default();
    let err = scanner.scan(&mut source, &mut sink).unwrap_err();
    assert_eq!(err.kind(), rtfobj::ErrorKind::TooLarge);
}
