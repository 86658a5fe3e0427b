use crate::tool::ToolRegistry;
use crate::tools::{CalculateTool, ReadFileTool, WriteFileTool};

/// Registry with bindings for every tool in [`crate::default_catalog`].
pub fn builtin_toolkit() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CalculateTool);
    registry.register(ReadFileTool);
    registry.register(WriteFileTool);
    registry
}
