pub mod draw;
pub mod engine;
pub mod headless;
pub mod viewport;

pub use draw::*;
pub use engine::*;
pub use headless::*;
pub use viewport::*;
