//! Sink for non-fatal problems noticed by the core.
//!
//! Decode anomalies and per-file save failures do not abort anything; they
//! are handed to a [`Diagnostics`] implementation so the front end can show
//! or log them.

use std::path::Path;

use crate::codec::DecodeAnomaly;

#[derive(Debug, Clone, Copy)]
pub enum Diagnostic<'a> {
    /// A tag value was decoded lossily.
    DecodeAnomaly {
        path: &'a Path,
        key: &'a str,
        anomaly: &'a DecodeAnomaly,
    },
    /// Saving one file of a batch failed; the batch went on.
    SaveFailed { path: &'a Path, error: &'a str },
}

pub trait Diagnostics: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic<'_>);
}

/// Forwards every diagnostic to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, diagnostic: &Diagnostic<'_>) {
        match diagnostic {
            Diagnostic::DecodeAnomaly { path, key, anomaly } => {
                log::warn!("{}: {key}: {anomaly}", path.display());
            }
            Diagnostic::SaveFailed { path, error } => {
                log::warn!("Failed to save {}: {error}", path.display());
            }
        }
    }
}
