//! Progress reporting for downloads

use std::sync::Arc;

/// Progress of a streamed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes received so far
    pub done: u64,
    /// Expected size from `Content-Length`, when the server sent one
    pub total: Option<u64>,
}

impl TransferProgress {
    pub fn new(done: u64, total: Option<u64>) -> Self {
        Self { done, total }
    }

    /// Progress as a percentage (0.0 to 100.0); 0.0 when the size is unknown
    pub fn percent(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => (self.done as f64 / total as f64) * 100.0,
            _ => 0.0,
        }
    }

    /// Whether every expected byte has arrived
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.done >= total)
    }
}

/// Callback invoked once per received chunk
pub type ProgressCallback = Arc<dyn Fn(&TransferProgress) + Send + Sync>;
