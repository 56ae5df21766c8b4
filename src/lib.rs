//! `taskrunner`: a distributed task-execution substrate.
//!
//! Clients [`submit`] a task's `kind` and payload; it is appended to a
//! [`Queue`](queue::Queue); a [`worker::WorkerPool`] pops it, dispatches
//! it to the [`worker::Handler`] registered for its kind, and publishes
//! the terminal result to a TTL-bound [`store::ResultStore`], from which
//! clients later [`retrieve::get`] it.
//!
//! Both the queue and the result store have an in-process implementation
//! ([`queue::memory::MemoryQueue`], [`store::memory::MemoryResultStore`])
//! and, behind the `redis-backend` feature, a Redis-backed one
//! ([`queue::remote::RedisQueue`], [`store::remote::RedisResultStore`])
//! for multi-process deployments. HTTP routing, a settings-file-loading
//! CLI launcher, and a full outer service binary are deliberately left
//! to the embedding application -- this crate is the substrate, not the
//! service.

pub mod config;
pub mod error;
pub mod queue;
pub mod retrieve;
pub mod store;
pub mod submit;
pub mod task;
pub mod worker;

pub use config::Config;
pub use error::TaskRunnerError;
pub use task::{Task, TaskStatus};
