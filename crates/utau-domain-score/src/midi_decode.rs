//! SMF decoding into a note timeline.
//!
//! Karaoke SMFs usually interleave the melody with backing instrumentation
//! across several tracks, so the walker merges every track's events into
//! file order by absolute tick and filters by channel. Note pairing is
//! strict by default; the lyric entry point is permissive because merged
//! multi-track streams routinely carry stray note-offs.

use crate::lyrics::{decode_text, filter_markup, FilterState};
use crate::model::Note;
use crate::search::last_starting_at_or_before;
use crate::timebase::ticks_to_micros;
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use utau_ports::types::Micros;

/// Two lyric timestamps closer than this to a note onset count as "on" it.
const LYRIC_ONSET_EPSILON: Micros = 100;

const DEFAULT_US_PER_QUARTER: u32 = 500_000;

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("unsupported MIDI format (multi-sequence)")]
    UnsupportedFormat,
    #[error("file contains no tracks")]
    NoTracks,
    #[error("unsupported time division (SMPTE timecode)")]
    UnsupportedTimeDivision,
    #[error("note off without a matching note on (pitch {0})")]
    UnmatchedNoteOff(u8),
    #[error("unbalanced note on/off events")]
    UnbalancedNoteEvents,
    #[error("no tempo event found")]
    TempoNotFound,
    #[error("track index {0} out of range")]
    InvalidTrackIndex(usize),
    #[error("malformed SMF: {0}")]
    Malformed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pairing {
    /// A stray note-off is a decode failure.
    Strict,
    /// A stray note-off is silently discarded.
    Permissive,
}

/// Decode the melody on `channel` into a time-ordered note timeline.
/// Strict pairing; fails with `TempoNotFound` when the file carries no
/// tempo meta-event.
pub fn decode_timeline(data: &[u8], track: usize, channel: u8) -> Result<Vec<Note>, DecodeError> {
    decode(data, track, channel, Pairing::Strict)
}

/// Decode a lyric-bearing score. Unmatched note-offs are discarded and a
/// missing tempo falls back to the SMF default, since karaoke files often
/// omit both guarantees.
pub fn decode_lyric_timeline(
    data: &[u8],
    track: usize,
    channel: u8,
) -> Result<Vec<Note>, DecodeError> {
    decode(data, track, channel, Pairing::Permissive)
}

enum MergedKind<'a> {
    NoteOn { channel: u8, pitch: u8 },
    NoteOff { channel: u8, pitch: u8 },
    Tempo(u32),
    Lyric(&'a [u8]),
}

struct MergedEvent<'a> {
    tick: i64,
    kind: MergedKind<'a>,
}

fn decode(data: &[u8], track: usize, channel: u8, pairing: Pairing) -> Result<Vec<Note>, DecodeError> {
    let smf = Smf::parse(data).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if smf.header.format == Format::Sequential {
        return Err(DecodeError::UnsupportedFormat);
    }
    if smf.tracks.is_empty() {
        return Err(DecodeError::NoTracks);
    }
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int(),
        Timing::Timecode(..) => return Err(DecodeError::UnsupportedTimeDivision),
    };
    if track >= smf.tracks.len() {
        return Err(DecodeError::InvalidTrackIndex(track));
    }

    let events = merge_events(&smf);
    let tempo = TempoTrack::build(&events, ticks_per_beat, pairing)?;

    let mut notes = pair_notes(&events, channel, pairing, &tempo)?;
    if notes.is_empty() {
        return Ok(notes);
    }
    assign_lyrics(&mut notes, &events, &tempo);
    Ok(notes)
}

/// Merge every track's delta-timed events into one absolute-tick stream.
/// The sort is stable, so same-tick events keep file order.
fn merge_events<'a>(smf: &Smf<'a>) -> Vec<MergedEvent<'a>> {
    let mut events = Vec::new();
    for track in &smf.tracks {
        let mut tick: i64 = 0;
        for event in track {
            tick += event.delta.as_int() as i64;
            let kind = match &event.kind {
                TrackEventKind::Midi { channel, message } => match message {
                    // Velocity-0 note-ons stay note-begins here: the mute
                    // rewrite zeroes velocities and the muted file must
                    // still decode to the same timeline.
                    MidiMessage::NoteOn { key, .. } => MergedKind::NoteOn {
                        channel: channel.as_int(),
                        pitch: key.as_int(),
                    },
                    MidiMessage::NoteOff { key, .. } => MergedKind::NoteOff {
                        channel: channel.as_int(),
                        pitch: key.as_int(),
                    },
                    _ => continue,
                },
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    MergedKind::Tempo(us_per_quarter.as_int())
                }
                TrackEventKind::Meta(MetaMessage::Lyric(bytes)) => MergedKind::Lyric(*bytes),
                // .kar files carry lyrics as plain text events.
                TrackEventKind::Meta(MetaMessage::Text(bytes)) => MergedKind::Lyric(*bytes),
                _ => continue,
            };
            events.push(MergedEvent { tick, kind });
        }
    }
    events.sort_by_key(|e| e.tick);
    events
}

/// Tick-to-microsecond conversion using the tempo in effect at each tick.
struct TempoTrack {
    ticks_per_beat: u16,
    /// `(start_tick, start_us, us_per_quarter)`, sorted by tick.
    segments: Vec<(i64, Micros, u32)>,
}

impl TempoTrack {
    fn build(
        events: &[MergedEvent<'_>],
        ticks_per_beat: u16,
        pairing: Pairing,
    ) -> Result<Self, DecodeError> {
        let mut points: Vec<(i64, u32)> = events
            .iter()
            .filter_map(|e| match e.kind {
                MergedKind::Tempo(us_per_quarter) => Some((e.tick, us_per_quarter)),
                _ => None,
            })
            .collect();

        if points.is_empty() {
            match pairing {
                Pairing::Strict => return Err(DecodeError::TempoNotFound),
                Pairing::Permissive => points.push((0, DEFAULT_US_PER_QUARTER)),
            }
        }
        if points[0].0 != 0 {
            points.insert(0, (0, points[0].1));
        }

        let mut segments = Vec::with_capacity(points.len());
        let mut current_us: Micros = 0;
        for (idx, &(tick, us_per_quarter)) in points.iter().enumerate() {
            if idx > 0 {
                let (prev_tick, _, prev_uspq) = segments[idx - 1];
                current_us += ticks_to_micros(tick - prev_tick, prev_uspq, ticks_per_beat);
            }
            segments.push((tick, current_us, us_per_quarter));
        }

        Ok(Self {
            ticks_per_beat,
            segments,
        })
    }

    fn tick_to_micros(&self, tick: i64) -> Micros {
        let idx = self
            .segments
            .partition_point(|&(start, _, _)| start <= tick)
            .saturating_sub(1);
        let (start_tick, start_us, us_per_quarter) = self.segments[idx];
        start_us + ticks_to_micros(tick - start_tick, us_per_quarter, self.ticks_per_beat)
    }
}

fn pair_notes(
    events: &[MergedEvent<'_>],
    channel: u8,
    pairing: Pairing,
    tempo: &TempoTrack,
) -> Result<Vec<Note>, DecodeError> {
    let mut notes = Vec::new();
    let mut pending: Option<(i64, u8)> = None;

    for event in events {
        match event.kind {
            MergedKind::NoteOn { channel: ch, pitch } if ch == channel => {
                // A begin while another note is pending is dropped; this is
                // what keeps the timeline non-overlapping.
                if pending.is_none() {
                    pending = Some((event.tick, pitch));
                }
            }
            MergedKind::NoteOff { channel: ch, pitch } if ch == channel => match pending {
                Some((begin_tick, begin_pitch)) if begin_pitch == pitch => {
                    let tpos = tempo.tick_to_micros(begin_tick);
                    let duration = tempo.tick_to_micros(event.tick) - tpos;
                    notes.push(Note {
                        tpos,
                        duration,
                        pitch,
                        lyric: String::new(),
                    });
                    pending = None;
                }
                _ if pairing == Pairing::Strict => {
                    return Err(DecodeError::UnmatchedNoteOff(pitch));
                }
                // Permissive: discard the stray note-off, keep any pending
                // note open.
                _ => {}
            },
            _ => {}
        }
    }

    if pending.is_some() {
        return Err(DecodeError::UnbalancedNoteEvents);
    }
    Ok(notes)
}

fn assign_lyrics(notes: &mut [Note], events: &[MergedEvent<'_>], tempo: &TempoTrack) {
    let mut state = FilterState::default();
    for event in events {
        let MergedKind::Lyric(bytes) = event.kind else {
            continue;
        };
        let text = filter_markup(&decode_text(bytes), &mut state);
        if text.is_empty() {
            continue;
        }

        let tpos = tempo.tick_to_micros(event.tick);
        let idx = match lyric_target(notes, tpos) {
            Some(idx) => idx,
            None => continue,
        };
        notes[idx].lyric.push_str(&text);
    }
}

/// Pick the note a lyric fragment belongs to: an onset within epsilon on
/// either side wins, otherwise the preceding note if the timestamp falls
/// strictly inside it, otherwise nothing.
fn lyric_target(notes: &[Note], tpos: Micros) -> Option<usize> {
    let right = notes.partition_point(|n| n.tpos <= tpos);
    let left = last_starting_at_or_before(notes, tpos);

    if let Some(idx) = left {
        if (notes[idx].tpos - tpos).abs() < LYRIC_ONSET_EPSILON {
            return Some(idx);
        }
    }
    if let Some(note) = notes.get(right) {
        if (note.tpos - tpos).abs() < LYRIC_ONSET_EPSILON {
            return Some(right);
        }
    }
    if let Some(idx) = left {
        let note = &notes[idx];
        if note.tpos < tpos && tpos < note.tpos + note.duration {
            return Some(idx);
        }
    }
    None
}
