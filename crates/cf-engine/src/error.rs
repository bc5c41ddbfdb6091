use std::path::PathBuf;

use cf_core::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to read filter list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Page session failed: {0}")]
    Session(#[from] SessionError),
}
