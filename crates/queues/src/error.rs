use std::time::Duration;

use thiserror::Error;

pub type Result<T> = anyhow::Result<T, QueueError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Blocked operation was interrupted while waiting")]
    Interrupted,

    #[error("Blocked operation gave up waiting after {0:?}")]
    TimedOut(Duration),

    #[error("Bounded queue requires a non-zero capacity that can hold the wrapped queue")]
    InvalidCapacity,
}
