pub mod extraction;
pub mod preprocessing;
pub mod simplification;

pub use extraction::*;
pub use preprocessing::*;
pub use simplification::*;
