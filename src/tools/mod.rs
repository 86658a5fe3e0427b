//! Built-in tool bindings.
//!
//! - Calculator: arithmetic expression evaluation
//! - File: reading and writing files on the local filesystem

pub mod calculator;
pub mod file;

pub use calculator::CalculateTool;
pub use file::{ReadFileTool, WriteFileTool};
