pub mod config;
pub mod map_session;
pub mod overlay;

pub use config::*;
pub use map_session::*;
pub use overlay::*;
