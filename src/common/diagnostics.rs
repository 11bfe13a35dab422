//! Diagnostics contract between the chat room engine and its host.
//!
//! The engine reports `(sender, level, message)` triples and leaves
//! presentation to the host. Per-session events use the sender name
//! `Session #<id>`; plugin-wide errors use the empty sender.

/// Diagnostic levels, following the host convention: 0-1 informational,
/// 2 warning, 3 error.
pub mod levels {
    pub const DEBUG: usize = 0;
    pub const INFO: usize = 1;
    pub const WARNING: usize = 2;
    pub const ERROR: usize = 3;
}

/// Receiver of diagnostic messages produced by the engine.
pub trait DiagnosticsSink: Send + Sync {
    /// Deliver one diagnostic message.
    fn diagnostic(&self, sender: &str, level: usize, message: &str);
}

/// Forwards engine diagnostics to `tracing`.
#[derive(Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn diagnostic(&self, sender: &str, level: usize, message: &str) {
        match level {
            levels::DEBUG => tracing::debug!(sender, "{message}"),
            levels::INFO => tracing::info!(sender, "{message}"),
            levels::WARNING => tracing::warn!(sender, "{message}"),
            _ => tracing::error!(sender, "{message}"),
        }
    }
}
