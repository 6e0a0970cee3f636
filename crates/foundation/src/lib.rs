pub mod bounds;
pub mod error;
pub mod geometry;
pub mod math;
pub mod viewport;

// Foundation crate: pure geo primitives only, no state.
pub use bounds::*;
pub use error::*;
pub use geometry::*;
pub use viewport::*;
