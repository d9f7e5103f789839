//! Decode session configuration.
//!
//! [`DecodeOptions`] is a builder that threads progress callbacks and
//! reporting cadence through [`Manager::decode_with_options`](crate::Manager::decode_with_options)
//! without growing the handler signature.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mediakit::{DecodeOptions, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }
//! }
//!
//! let options = DecodeOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_batch_size(100);
//! assert_eq!(options.batch_size(), 100);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use crate::progress::{OperationType, ProgressCallback, ProgressTracker, Silent};

/// Packets between progress reports when no batch size is configured.
const DEFAULT_BATCH_SIZE: u64 = 256;

/// Options for a decode session.
#[derive(Clone)]
pub struct DecodeOptions {
    progress: Arc<dyn ProgressCallback>,
    batch_size: u64,
}

impl DecodeOptions {
    /// Options with no progress reporting.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Silent),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Report progress to `callback`.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Report progress every `batch_size` dispatched packets. Zero is
    /// treated as one.
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Packets between progress reports.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub(crate) fn tracker(&self, operation: OperationType) -> ProgressTracker {
        ProgressTracker::new(self.progress.clone(), operation, None, self.batch_size)
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for DecodeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DecodeOptions")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}
