#[allow(clippy::module_inception)]
pub mod error;
pub mod worker;

pub use error::{CoordinationError, ErrorKind};
pub use worker::WorkerError;
