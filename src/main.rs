use std::env;
use std::path::Path;
use std::process::ExitCode;

use rtfobj::{NullScanSink, RtfObjectScanner, ScanConfig, ScanOutcome};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: {} FILE", args[0]);
        return ExitCode::FAILURE;
    }

    let scanner = RtfObjectScanner::new(ScanConfig::default());
    let mut sink = NullScanSink::default();

    match scanner.scan_path(Path::new(&args[1]), &mut sink) {
        Ok(ScanOutcome::Clean) => {
            println!("clean");
            ExitCode::SUCCESS
        }
        Ok(ScanOutcome::Flagged { detail }) => {
            println!("flagged: {detail}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("scan failed: {e}");
            ExitCode::FAILURE
        }
    }
}
