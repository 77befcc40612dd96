use tracing::warn;

/// Parsed form of [`User::time_zone`](crate::store::User::time_zone).
///
/// Fixed offsets (`UTC`, `GMT+2`, `UTC-03:30`) are resolved here. Anything
/// that looks like a region id is kept for the caller to look up; everything
/// else falls back to UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserTimeZone {
    /// Seconds east of UTC
    Fixed(i32),
    /// Region id such as `Europe/Berlin`
    Region(String),
}

impl UserTimeZone {
    pub const UTC: UserTimeZone = UserTimeZone::Fixed(0);

    const MAX_OFFSET_SECONDS: i32 = 18 * 60 * 60;

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::UTC;
        }

        for prefix in ["UTC", "GMT"] {
            if let Some(rest) = raw.strip_prefix(prefix) {
                if rest.is_empty() {
                    return Self::UTC;
                }
                return match parse_offset(rest) {
                    Some(seconds) => Self::Fixed(seconds),
                    None => Self::fallback(raw),
                };
            }
        }

        let is_region = raw.contains('/')
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'));
        if is_region {
            Self::Region(raw.to_string())
        } else {
            Self::fallback(raw)
        }
    }

    fn fallback(raw: &str) -> Self {
        warn!(time_zone = raw, "unknown time zone, using UTC");
        Self::UTC
    }

    pub fn offset_seconds(&self) -> Option<i32> {
        match self {
            Self::Fixed(seconds) => Some(*seconds),
            Self::Region(_) => None,
        }
    }
}

/// `+h`, `-hh`, `+hh:mm` or `+hhmm`
fn parse_offset(text: &str) -> Option<i32> {
    let (sign, digits) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if digits.len() > 2 => digits.split_at(digits.len() - 2),
        None => (digits, "0"),
    };
    if hours.is_empty() || hours.len() > 2 || minutes.len() > 2 {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }

    let seconds = sign * (hours * 60 + minutes) * 60;
    (seconds.abs() <= UserTimeZone::MAX_OFFSET_SECONDS).then_some(seconds)
}
