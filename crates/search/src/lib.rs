pub mod orchestrator;
pub mod result;

pub use orchestrator::*;
pub use result::*;
