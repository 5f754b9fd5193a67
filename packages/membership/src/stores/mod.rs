//! Directory implementations.

pub mod memory;

pub use memory::{DirectoryCall, DirectoryOp, MemoryDirectory};
