pub mod queue;
pub mod scheduler;

pub use queue::QueueService;
