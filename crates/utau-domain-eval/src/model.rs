use serde::{Deserialize, Serialize};
use utau_ports::types::Micros;

/// One judged slice of the singer's performance. `tpos` and `duration` are
/// on the score timeline; `pitch` is the octave-corrected MIDI number and
/// may sit outside 0..=127 after transposition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformedNote {
    pub tpos: Micros,
    pub duration: Micros,
    pub pitch: i32,
    pub correct: bool,
}
