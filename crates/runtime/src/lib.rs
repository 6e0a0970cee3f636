pub mod event_bus;
pub mod retry;

pub use event_bus::*;
pub use retry::*;
