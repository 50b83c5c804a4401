//! Application services: the queue façade, prescribed pipelines, the
//! progress tracker and its persistence reporter, repository status
//! aggregation, and the trackable resolver.

pub mod pipelines;
pub mod queue;
pub mod reporter;
pub mod status_summary;
pub mod trackable;
pub mod tracker;

pub use queue::QueueService;
pub use reporter::PersistenceReporter;
pub use tracker::{ProgressReporter, ProgressTracker};
