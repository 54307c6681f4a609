/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_time(milliseconds: u64) -> String {
    let total_secs = milliseconds / 1000;
    let (hours, rem) = (total_secs / 3600, total_secs % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Time left in the track, floored at zero.
pub fn remaining_ms(position_ms: u64, duration_ms: u64) -> u64 {
    duration_ms.saturating_sub(position_ms)
}

/// Parse `m:ss`, `h:mm:ss` or plain seconds into milliseconds.
pub fn parse_timestamp(input: &str) -> Option<u64> {
    let mut total: u64 = 0;
    for part in input.trim().split(':') {
        let value: u64 = part.trim().parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }
    total.checked_mul(1000)
}
