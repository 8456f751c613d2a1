pub mod lyrics;
pub mod midi_decode;
pub mod midi_mute;
pub mod model;
pub mod search;
pub mod timebase;

pub use midi_decode::*;
pub use midi_mute::*;
pub use model::*;
pub use search::*;
