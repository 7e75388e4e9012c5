// Crate implementing blocking access to plain sequential FIFO queues.

pub mod blocking;
pub mod error;
pub mod sequential;

pub use blocking::BlockingQueue;
pub use error::{QueueError, Result};
pub use sequential::SequentialQueue;
