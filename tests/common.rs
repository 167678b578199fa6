//! Common test utilities shared between integration tests

use std::io::Write;
use std::sync::{Arc, Mutex};

use wati::runtime::Config;

/// Captured writer that stores output for testing
#[derive(Clone, Default)]
pub struct CapturedWriter(pub Arc<Mutex<Vec<u8>>>);

impl CapturedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A config whose `$log` output goes to the returned writer.
#[allow(dead_code)]
pub fn captured_config() -> (Config, CapturedWriter) {
    let log = CapturedWriter::new();
    let config = Config::new().with_log(log.clone()).with_trace_sink(std::io::sink());
    (config, log)
}
