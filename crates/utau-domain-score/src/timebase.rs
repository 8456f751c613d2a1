use utau_ports::types::Micros;

/// Convert a tick count to microseconds under the given tempo.
/// `us_per_quarter` is the tempo meta-event value, `ticks_per_beat` the
/// header resolution. Widened to i128 so long files cannot overflow.
pub fn ticks_to_micros(ticks: i64, us_per_quarter: u32, ticks_per_beat: u16) -> Micros {
    let ticks = ticks as i128;
    let us_per_quarter = us_per_quarter as i128;
    let ticks_per_beat = ticks_per_beat.max(1) as i128;
    ((ticks * us_per_quarter) / ticks_per_beat) as Micros
}
