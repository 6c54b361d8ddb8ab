// src/sync/budget.rs - Wall-clock budget and cooperative cancellation for one batch
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag a caller can flip to stop a running batch between items.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SyncBudget {
    deadline: Option<Instant>,
    cancel: CancelHandle,
}

impl SyncBudget {
    pub fn new(limit: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + limit),
            cancel: CancelHandle::default(),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Reason to stop before starting the next item, if any.
    pub fn exhausted(&self) -> Option<&'static str> {
        if self.cancel.is_cancelled() {
            return Some("cancelled");
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some("time budget exceeded"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let budget = SyncBudget::unlimited();
        let handle = budget.cancel_handle();
        assert_eq!(budget.exhausted(), None);
        handle.cancel();
        assert_eq!(budget.exhausted(), Some("cancelled"));
    }

    #[test]
    fn test_zero_budget_is_exhausted() {
        let budget = SyncBudget::new(Duration::ZERO);
        assert_eq!(budget.exhausted(), Some("time budget exceeded"));
        assert_eq!(SyncBudget::new(Duration::from_secs(60)).exhausted(), None);
    }
}
