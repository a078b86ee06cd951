pub mod connection;
pub mod mcp_handler;
pub mod use_cases;

pub use mcp_handler::{MCPHandler, stdio};
pub use use_cases::{DrawUseCase, GeneratorUseCase, HistoryUseCase, SharedService};
