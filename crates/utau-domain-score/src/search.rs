use crate::model::Note;
use utau_ports::types::Micros;

/// Index of the last note starting strictly before `t`, or `None` when `t`
/// precedes every note. The timeline must be sorted by `tpos`.
pub fn last_starting_before(notes: &[Note], t: Micros) -> Option<usize> {
    notes.partition_point(|n| n.tpos < t).checked_sub(1)
}

/// Index of the last note starting at or before `t`. Used by lyric
/// assignment, which treats a fragment stamped exactly on a note onset as
/// belonging to that note.
pub fn last_starting_at_or_before(notes: &[Note], t: Micros) -> Option<usize> {
    notes.partition_point(|n| n.tpos <= t).checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> Vec<Note> {
        [0, 100, 200]
            .iter()
            .map(|&tpos| Note {
                tpos,
                duration: 50,
                pitch: 60,
                lyric: String::new(),
            })
            .collect()
    }

    #[test]
    fn strictly_before() {
        let notes = timeline();
        assert_eq!(last_starting_before(&notes, 0), None);
        assert_eq!(last_starting_before(&notes, 50), Some(0));
        assert_eq!(last_starting_before(&notes, 150), Some(1));
        assert_eq!(last_starting_before(&notes, 1000), Some(2));
    }

    #[test]
    fn at_or_before_includes_exact_onset() {
        let notes = timeline();
        assert_eq!(last_starting_at_or_before(&notes, 0), Some(0));
        assert_eq!(last_starting_at_or_before(&notes, 100), Some(1));
        assert_eq!(last_starting_at_or_before(&notes, -1), None);
    }

    #[test]
    fn repeated_queries_are_stable() {
        let notes = timeline();
        let first = last_starting_before(&notes, 150);
        for _ in 0..10 {
            assert_eq!(last_starting_before(&notes, 150), first);
        }
    }

    #[test]
    fn empty_timeline_has_no_answer() {
        assert_eq!(last_starting_before(&[], 100), None);
    }
}
