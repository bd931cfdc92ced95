#![no_main]

use libfuzzer_sys::fuzz_target;
use scop::output::Output;
use scop::run_project;
use std::io;
use std::io::{BufReader, Cursor, Write};

fuzz_target!(|data: &[u8]| {
    let _run = run_project(BufReader::new(Cursor::new(data)), DiscardingOutput);
});

/// Throws away everything written to it, but still asks for the bin trace and metrics to be
/// written.
#[derive(Debug, Default)]
pub struct DiscardingOutput;

impl Output for DiscardingOutput {
    fn writer_for_location_key(
        &self,
        _location_key: &str,
        _file_extension: &str,
    ) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        false
    }
}
