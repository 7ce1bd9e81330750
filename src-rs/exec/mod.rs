pub mod channel;
pub mod handle;
pub mod request;
pub mod runner;

pub use channel::ExecutionChannel;
pub use handle::{
    ExecEvent, ExecutionHandle, ExecutionObserver, ExecutionOutcome, ExecutionState,
    CANCELLED_CODE, LAUNCH_FAILURE_CODE,
};
pub use request::ExecutionRequest;
pub use runner::FileRunner;
