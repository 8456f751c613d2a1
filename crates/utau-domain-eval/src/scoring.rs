//! Performance scoring.
//!
//! Both figures walk the performed notes, charge each one to the reference
//! note whose span covers it, and weight by performed duration. The score
//! forgives near misses through a saturating loss curve; accuracy counts
//! exact pitch matches only.

use crate::model::PerformedNote;
use utau_domain_score::{last_starting_before, Note};

#[derive(Clone, Copy, Debug)]
pub struct ScoreConfig {
    /// Multiplier applied after the offset.
    pub scale: f64,
    /// Flat offset added to the raw percentage.
    pub geta: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            scale: 1.2,
            geta: 0.0,
        }
    }
}

/// Saturating loss weight: 0 at zero loss, asymptotically 1.
fn loss_weight(x: f64) -> f64 {
    x / (1.0 + x.abs())
}

/// The reference note covering a performed note, if any. A performed note
/// is covered by the last reference note starting strictly before it,
/// unless that note has already ended.
fn covering_note<'a>(reference: &'a [Note], performed: &PerformedNote) -> Option<&'a Note> {
    let g = &reference[last_starting_before(reference, performed.tpos)?];
    if g.tpos + g.duration < performed.tpos {
        return None;
    }
    Some(g)
}

/// Score in the 0..=120 ballpark with the default config. Duration-weighted
/// pitch closeness over the total reference duration, then offset and
/// scaled. Returns 0.0 when the reference is empty.
pub fn score(reference: &[Note], performed: &[PerformedNote], cfg: &ScoreConfig) -> f64 {
    let total: f64 = reference.iter().map(|g| g.duration as f64).sum();
    if total == 0.0 {
        return 0.0;
    }

    let earned: f64 = performed
        .iter()
        .filter_map(|u| {
            let g = covering_note(reference, u)?;
            let loss = (u.pitch - i32::from(g.pitch)).abs() as f64;
            Some(u.duration as f64 * (1.0 - loss_weight(loss)))
        })
        .sum();

    (earned / total * 100.0 + cfg.geta) * cfg.scale
}

/// Percentage of sung time spent exactly on the reference pitch. The
/// denominator is the whole performance, covered or not. Returns 0.0 when
/// nothing was performed.
pub fn accuracy(reference: &[Note], performed: &[PerformedNote]) -> f64 {
    let total: f64 = performed.iter().map(|u| u.duration as f64).sum();
    if total == 0.0 {
        return 0.0;
    }

    let on_pitch: f64 = performed
        .iter()
        .filter_map(|u| {
            let g = covering_note(reference, u)?;
            (u.pitch == i32::from(g.pitch)).then_some(u.duration as f64)
        })
        .sum();

    on_pitch / total * 100.0
}
