//! Always-on panic sink.

use std::io::Write;

/// Receives panic reports synchronously, independent of logging setup.
pub trait PanicSink: Send + Sync {
    fn notify(&self, report: &str);
}

/// Writes reports to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl PanicSink for StderrSink {
    fn notify(&self, report: &str) {
        let mut stderr = std::io::stderr().lock();
        // Nothing left to report a failed stderr write to.
        let _ = writeln!(stderr, "[switchyard] {report}");
    }
}
