use std::fmt;

use crate::target::TargetId;

/// Logger bound to one call target.
///
/// Every event carries a `call_target` field so paging decisions can be
/// traced back to the method they were made for.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PagingLog<'a> {
    target: &'a TargetId,
}

impl<'a> PagingLog<'a> {
    pub(crate) fn new(target: &'a TargetId) -> Self {
        Self { target }
    }

    /// Logs an info-level message.
    pub(crate) fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(call_target = %self.target, "{}", args);
    }

    /// Logs a warning-level message.
    pub(crate) fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(call_target = %self.target, "{}", args);
    }

    /// Logs a debug-level message.
    pub(crate) fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(call_target = %self.target, "{}", args);
    }
}
