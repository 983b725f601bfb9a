//! diagnostics.rs — sink for human-readable driver trace lines

/// Destination for human-readable trace lines emitted while debug tracing is on.
pub trait DiagnosticsSink {
    fn log(&mut self, message: &str);
}

/// Sink that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl DiagnosticsSink for NoDiagnostics {
    fn log(&mut self, _message: &str) {}
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut T {
    fn log(&mut self, message: &str) {
        (**self).log(message);
    }
}
