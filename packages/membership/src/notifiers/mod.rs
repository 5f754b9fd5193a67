//! Notifier implementations.

pub mod log;

pub use log::TracingNotifier;
