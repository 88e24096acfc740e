use std::sync::Arc;

use crate::codec::TagCodec;
use crate::config::EditorConfig;
use crate::diagnostics::{Diagnostics, LogDiagnostics};

/// Configuration and diagnostics sink shared by every image of a batch.
#[derive(Clone)]
pub struct EditorContext {
    pub config: Arc<EditorConfig>,
    pub diagnostics: Arc<dyn Diagnostics>,
}

impl EditorContext {
    pub fn new(config: EditorConfig, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            config: Arc::new(config),
            diagnostics,
        }
    }

    /// Context with the given config and the `log` sink.
    pub fn with_config(config: EditorConfig) -> Self {
        Self::new(config, Arc::new(LogDiagnostics))
    }

    pub fn codec(&self) -> TagCodec {
        TagCodec::new(self.config.fallback_charset)
    }
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::with_config(EditorConfig::default())
    }
}

impl std::fmt::Debug for EditorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
