pub mod args;
pub mod cli;
pub mod daemon;
pub mod plan;
pub mod policy;

pub use args::*;
pub use cli::*;
pub use daemon::*;
pub use plan::*;
pub use policy::*;
