//! Tools registered at startup before the process-wide [`super::ToolRegistry`]
//! accepts any `mcp__`-prefixed dynamic registrations.

mod bash;
mod fleet_tools;
mod file_edit;
mod mcp_tools;
mod memory_tools;

pub use bash::BashTool;
pub use file_edit::FileEditTool;
pub use fleet_tools::{FleetHealthTool, FleetQueryTool, FleetRestartTool, FleetUpgradeTool};
pub use mcp_tools::{McpAddServerTool, McpListServersTool, McpRemoveServerTool};
pub use memory_tools::{
    MemoryDeleteTool, MemoryReadTool, MemorySearchTool, MemoryUpdateTool, MemoryWriteTool,
};
