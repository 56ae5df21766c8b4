//! Worker runtime: handler registration and the dispatch loop that pops
//! tasks, runs them, and publishes terminal results.

pub mod handler;
pub mod pool;

pub use handler::{BlockingFnHandler, FnHandler, Handler, HandlerRegistry};
pub use pool::WorkerPool;
