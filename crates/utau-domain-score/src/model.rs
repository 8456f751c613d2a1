use serde::{Deserialize, Serialize};
use utau_ports::types::Micros;

/// One melody note on the reference timeline. Positions are absolute
/// microseconds; a decoded timeline is sorted by `tpos` and non-overlapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub tpos: Micros,
    pub duration: Micros,
    pub pitch: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lyric: String,
}

/// The serialized reference-score interchange record: a note timeline as
/// `[tpos, duration, pitch]` triples plus the backing media id and a
/// millisecond playback offset. Lyrics do not survive the interchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gakufu {
    pub notes: Vec<[i64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_video_id: Option<String>,
    pub time_offset: i64,
}

impl Gakufu {
    pub fn from_notes(notes: &[Note], youtube_video_id: Option<String>, time_offset: i64) -> Self {
        Self {
            notes: notes
                .iter()
                .map(|n| [n.tpos, n.duration, n.pitch as i64])
                .collect(),
            youtube_video_id,
            time_offset,
        }
    }

    pub fn to_notes(&self) -> Vec<Note> {
        self.notes
            .iter()
            .map(|&[tpos, duration, pitch]| Note {
                tpos,
                duration,
                pitch: pitch.clamp(0, 127) as u8,
                lyric: String::new(),
            })
            .collect()
    }
}

/// Shift a timeline so its first note starts at `intro_time` and transpose
/// every pitch by `pitch_offset` semitones. Used when fitting a decoded
/// melody to external backing media.
pub fn normalize_timeline(notes: &[Note], intro_time: Micros, pitch_offset: i32) -> Vec<Note> {
    let Some(first) = notes.first() else {
        return Vec::new();
    };
    let epoch = first.tpos;
    notes
        .iter()
        .map(|n| Note {
            tpos: n.tpos - epoch + intro_time,
            duration: n.duration,
            pitch: (n.pitch as i32 + pitch_offset).clamp(0, 127) as u8,
            lyric: n.lyric.clone(),
        })
        .collect()
}
