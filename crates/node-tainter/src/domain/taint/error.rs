use core::error::Error;

/// Errors raised by the taint planner.
#[derive(Debug, derive_more::Display)]
pub enum PlanError {
    #[display("Invalid planner input: {message}")]
    InvalidInput { message: String },
    #[display("Invalid taint policy: {message}")]
    InvalidPolicy { message: String },
}

impl Error for PlanError {}
