// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! cgp-triage - delegation diagnostic consolidator.
//!
//! Reads cargo/rustc NDJSON from stdin. Non-diagnostic events (artifact
//! notifications, build-script output, build-finished markers) are printed
//! to stdout unchanged so machine consumers downstream keep working.
//! Diagnostics are buffered for the whole compilation and the consolidated
//! human report is printed to stderr on EOF.

mod output;

use std::io::{self, BufRead};
use std::process;

use triage_engine::Session;
use triage_wire::{ingest_line, IngestEvent, Level};

fn main() {
    output::init();

    match run() {
        Ok(errors_seen) => {
            if errors_seen {
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("cgp-triage: {}", err);
            process::exit(2);
        }
    }
}

fn run() -> io::Result<bool> {
    let stdin = io::stdin();
    let mut session = Session::new();
    let mut errors_seen = false;

    for line in stdin.lock().lines() {
        let line = line?;
        match ingest_line(&line) {
            IngestEvent::Diagnostic(record) => {
                if record.level == Level::Error || record.level == Level::Ice {
                    errors_seen = true;
                }
                session.push_record(record);
            }
            // Machine-readable events stream through untouched
            IngestEvent::Forward(raw) => println!("{}", raw),
            // Damaged input still reaches the report via the session
            IngestEvent::Unparsed(raw) => {
                session.push_line(&raw);
            }
        }
    }

    let report = session.finish_batch();
    eprint!("{}", report.to_ansi());

    Ok(errors_seen)
}
