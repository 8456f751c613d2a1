pub mod audio;
pub mod pitch;
pub mod types;

pub use audio::*;
pub use pitch::*;
pub use types::*;
