// src/utils/logging.rs - Logging helpers shared by the batch operations
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sync,
    DuplicateScan,
    Merge,
    Delete,
}

#[derive(Clone)]
pub struct OperationLogger {
    name: &'static str,
    emoji: &'static str,
    start_time: Instant,
}

impl OperationLogger {
    pub fn new(operation: Operation) -> Self {
        let (name, emoji) = match operation {
            Operation::Sync => ("SYNC", "🔁"),
            Operation::DuplicateScan => ("DUPLICATES", "🔍"),
            Operation::Merge => ("MERGE", "🧬"),
            Operation::Delete => ("DELETE", "🗑️"),
        };
        Self {
            name,
            emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, details: &str) {
        info!("[{}] {} 🚀 Starting: {}", self.name, self.emoji, details);
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.elapsed().as_secs_f32();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.name, self.emoji, phase, details, elapsed
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.name, self.emoji, phase, elapsed
            ),
        }
    }

    pub fn log_item_failed(&self, entity: &str, id: &str, reason: &str) {
        warn!(
            "[{}] {} ⚠️  {} {} failed: {}",
            self.name, self.emoji, entity, id, reason
        );
    }

    pub fn log_item_skipped(&self, entity: &str, id: &str, reason: &str) {
        info!(
            "[{}] {} ⏭️  {} {} skipped: {}",
            self.name, self.emoji, entity, id, reason
        );
    }

    pub fn log_completion(&self, summary: &str, errors: usize) {
        let elapsed = self.elapsed().as_secs_f32();
        if errors > 0 {
            warn!(
                "[{}] {} ✅ Completed with {} item errors in {:.2}s: {}",
                self.name, self.emoji, errors, elapsed, summary
            );
        } else {
            info!(
                "[{}] {} ✅ Completed in {:.2}s: {}",
                self.name, self.emoji, elapsed, summary
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.name, self.emoji, message);
    }

    pub fn log_error(&self, message: &str) {
        error!("[{}] {} ❌ {}", self.name, self.emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.name, self.emoji, message);
    }

    fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_tracks_time_since_creation() {
        let logger = OperationLogger::new(Operation::Sync);
        std::thread::sleep(Duration::from_millis(5));
        assert!(logger.elapsed() >= Duration::from_millis(5));
        logger.log_phase("Venues", None);
        logger.log_completion("done", 0);
    }
}
