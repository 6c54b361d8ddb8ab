pub mod budget;
pub mod orchestrator;
pub mod selection;

pub use budget::{CancelHandle, SyncBudget};
pub use orchestrator::SyncOrchestrator;
pub use selection::SyncSelection;
