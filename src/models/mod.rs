pub mod config;
pub mod execution;
pub mod host_source;
pub mod remote_command;
pub mod target;

pub use execution::{ExecutionMode, ExecutionResult, ExecutionStatus, RunReport};
pub use host_source::{HostSource, InventoryQuery};
pub use remote_command::RemoteCommand;
pub use target::Target;
