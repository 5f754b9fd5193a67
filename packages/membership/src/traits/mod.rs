//! Capability boundaries the engine is injected with.
//!
//! Concrete directory and notification backends implement these traits.

pub mod directory;
pub mod notifier;
