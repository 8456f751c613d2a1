//! Octave-correcting pitch matching.
//!
//! Singers routinely land an octave (or several) away from the written
//! melody, so a detected pitch is folded onto the octave of the reference
//! note before being judged. The fold picks the representative within six
//! semitones of the transposed reference, so the judged pitch is the one a
//! listener would call "the same note, wrong octave".

use utau_domain_score::Note;
use utau_ports::types::Micros;

/// Result of judging one pitch observation against the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Octave-corrected pitch, or the raw observation when no reference
    /// note precedes the timestamp.
    pub pitch: i32,
    /// True when the folded pitch lands exactly on the reference and the
    /// timestamp falls strictly inside the reference note's span.
    pub correct: bool,
}

/// Fold `observed` onto the octave of `reference` (shifted by `transpose`
/// semitones) and judge whether it counts as singing that note at `at`.
pub fn correct_octave(
    observed: i32,
    reference: Option<&Note>,
    transpose: i32,
    at: Micros,
) -> MatchOutcome {
    let Some(r) = reference else {
        return MatchOutcome {
            pitch: observed,
            correct: false,
        };
    };

    let biased = i32::from(r.pitch) + transpose;
    let mut gap = (observed - biased).rem_euclid(12);
    if gap > 6 {
        gap -= 12;
    }

    MatchOutcome {
        pitch: biased + gap,
        correct: gap == 0 && r.tpos < at && at < r.tpos + r.duration,
    }
}
