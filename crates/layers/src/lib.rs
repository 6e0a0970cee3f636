pub mod drawn;
pub mod layer;

pub use drawn::*;
pub use layer::*;
