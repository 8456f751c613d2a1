pub mod matcher;
pub mod model;
pub mod scoring;

pub use matcher::*;
pub use model::*;
pub use scoring::*;
