pub mod color;
pub mod framing;
pub mod mercator;
pub mod screen;

pub use color::*;
pub use framing::*;
pub use mercator::*;
pub use screen::*;
