mod run_model;
mod status;

pub use run_model::{
    Message, MessageRole, ModelCall, NewRun, Run, RunCursor, Step, ToolInvocation, ToolResult,
};
pub use status::{NextAction, RunStatus};
