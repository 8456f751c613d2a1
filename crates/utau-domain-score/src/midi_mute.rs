use crate::midi_decode::DecodeError;
use midly::num::u7;
use midly::{MidiMessage, Smf, TrackEventKind};

/// Rewrite every note-begin on `channel` within `track` to velocity zero,
/// silencing the melody voice while keeping all other events (and the
/// backing instrumentation) byte-for-byte intact, then re-serialize.
pub fn mute_channel(data: &[u8], track: usize, channel: u8) -> Result<Vec<u8>, DecodeError> {
    let mut smf = Smf::parse(data).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let events = smf
        .tracks
        .get_mut(track)
        .ok_or(DecodeError::InvalidTrackIndex(track))?;

    for event in events.iter_mut() {
        if let TrackEventKind::Midi {
            channel: ch,
            message: MidiMessage::NoteOn { vel, .. },
        } = &mut event.kind
        {
            if ch.as_int() == channel {
                *vel = u7::new(0);
            }
        }
    }

    let mut out = Vec::new();
    smf.write(&mut out)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    Ok(out)
}
