//! Dispatch reports - per-listener outcomes of one publish.

use crate::capability::CapabilityKey;
use crate::error::DispatchError;

/// A listener that failed during dispatch.
#[derive(Debug)]
pub struct ListenerFailure {
    /// Index of the listener in the delivered snapshot (subscription order).
    pub position: usize,
    pub error: DispatchError,
}

/// Outcome of delivering one message to a snapshot of listeners.
///
/// Failures are collected, never propagated: every listener in the snapshot
/// has been invoked by the time a report exists.
#[derive(Debug)]
#[must_use = "dispatch reports carry listener failures; use `EventBus::publish` to log them instead"]
pub struct DispatchReport {
    capability: CapabilityKey,
    attempted: usize,
    delivered: usize,
    failures: Vec<ListenerFailure>,
}

impl DispatchReport {
    pub(crate) fn new(capability: CapabilityKey, attempted: usize) -> Self {
        Self {
            capability,
            attempted,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    /// Report for a publish that found no listeners.
    pub(crate) fn empty(capability: CapabilityKey) -> Self {
        Self::new(capability, 0)
    }

    pub(crate) fn record(&mut self, position: usize, outcome: Result<(), DispatchError>) {
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(error) => self.failures.push(ListenerFailure { position, error }),
        }
    }

    pub fn capability(&self) -> CapabilityKey {
        self.capability
    }

    /// Listeners in the snapshot, i.e. invocations performed.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Invocations that completed without error or panic.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn failures(&self) -> &[ListenerFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ListenerFailure> {
        self.failures
    }

    /// Whether any listener was subscribed at publish time.
    pub fn had_listeners(&self) -> bool {
        self.attempted > 0
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Log every failure at error level.
    pub fn log_failures(&self) {
        for failure in &self.failures {
            tracing::error!(
                capability = %self.capability,
                position = failure.position,
                error = %failure.error,
                "Listener failed during publish"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IncorrectAnswer;

    #[test]
    fn record_separates_deliveries_from_failures() {
        let mut report = DispatchReport::new(CapabilityKey::of::<IncorrectAnswer>(), 3);
        report.record(0, Ok(()));
        report.record(1, Err(DispatchError::Panicked("boom".to_string())));
        report.record(2, Ok(()));

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.delivered(), 2);
        assert!(!report.is_clean());
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].position, 1);
        report.log_failures();
    }

    #[test]
    fn empty_report_has_no_listeners() {
        let report = DispatchReport::empty(CapabilityKey::of::<IncorrectAnswer>());

        assert!(!report.had_listeners());
        assert!(report.is_clean());
        assert!(report.into_failures().is_empty());
    }
}
