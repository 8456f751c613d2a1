//! Lyric text handling: byte decoding and the markup filter for control
//! sequences emitted by karaoke authoring tools.

use encoding_rs::SHIFT_JIS;

/// Decode lyric meta-event bytes to Unicode text. Karaoke SMFs are UTF-8 or
/// (very commonly) Shift-JIS; anything else comes through lossily.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (text, _, _) = SHIFT_JIS.decode(bytes);
            text.into_owned()
        }
    }
}

/// Filter state. Authoring-tool markup spans lyric fragment boundaries, so
/// the state persists across fragments of one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterState {
    #[default]
    Default,
    Escape,
    Bracket,
}

/// Transition for one character: `(next state, emit?)`.
fn step(state: FilterState, ch: char) -> (FilterState, bool) {
    match state {
        FilterState::Default => match ch {
            '\\' => (FilterState::Escape, false),
            '^' | '/' | '%' | '<' | '>' => (FilterState::Default, false),
            '[' | '(' => (FilterState::Bracket, false),
            _ => (FilterState::Default, true),
        },
        // No explicit rules: every character falls back to default-and-emit.
        FilterState::Escape => (FilterState::Default, true),
        FilterState::Bracket => match ch {
            ']' | ')' => (FilterState::Default, false),
            _ => (FilterState::Bracket, false),
        },
    }
}

/// Strip authoring-tool markup from one lyric fragment, carrying `state`
/// over to the next fragment.
pub fn filter_markup(input: &str, state: &mut FilterState) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let (next, emit) = step(*state, ch);
        if emit {
            out.push(ch);
        }
        *state = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(input: &str) -> String {
        let mut state = FilterState::default();
        filter_markup(input, &mut state)
    }

    #[test]
    fn escapes_and_controls_are_dropped() {
        assert_eq!(filter("\\abc^def"), "abcdef");
        assert_eq!(filter("a/b%c<d>e"), "abcde");
    }

    #[test]
    fn bracketed_runs_are_dropped() {
        assert_eq!(filter("[ruby]text"), "text");
        assert_eq!(filter("(x)y"), "y");
        assert_eq!(filter("a[bb(cc]d"), "ad");
    }

    #[test]
    fn escape_consumes_exactly_one_transition() {
        // '\' enters the escape state and is dropped; the following char
        // falls back to default and is emitted.
        assert_eq!(filter("\\\\x"), "\\x");
    }

    #[test]
    fn state_persists_across_fragments() {
        let mut state = FilterState::default();
        assert_eq!(filter_markup("a[b", &mut state), "a");
        assert_eq!(filter_markup("c]d", &mut state), "d");
    }

    #[test]
    fn decodes_utf8_and_shift_jis() {
        assert_eq!(decode_text("\u{3042}".as_bytes()), "\u{3042}");
        assert_eq!(decode_text(&[0x82, 0xA0]), "\u{3042}");
    }
}
