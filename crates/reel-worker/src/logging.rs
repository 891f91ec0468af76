//! Structured logging for pipeline items.
//!
//! Every import request, processing run and publish attempt logs its
//! lifecycle through a [`JobLogger`] so lines share the same fields.

use tracing::{error, info, warn, Span};

#[derive(Debug, Clone)]
pub struct JobLogger {
    item_id: String,
    operation: &'static str,
}

impl JobLogger {
    /// `operation` names the pipeline stage, e.g. `"ingest"` or `"publish"`.
    pub fn new(item_id: impl Into<String>, operation: &'static str) -> Self {
        Self {
            item_id: item_id.into(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(item_id = %self.item_id, operation = self.operation, "Started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(item_id = %self.item_id, operation = self.operation, "Progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(item_id = %self.item_id, operation = self.operation, "Warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(item_id = %self.item_id, operation = self.operation, "Failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(item_id = %self.item_id, operation = self.operation, "Completed: {}", message);
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("pipeline_item", item_id = %self.item_id, operation = self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_fields() {
        let logger = JobLogger::new("imp-123", "ingest");
        assert_eq!(logger.item_id(), "imp-123");
        assert_eq!(logger.operation(), "ingest");
    }
}
