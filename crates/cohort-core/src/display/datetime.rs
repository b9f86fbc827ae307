//! Date, time and duration display helpers.

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

/// Formats a timestamp in the system timezone as `YYYY-MM-DD HH:MM:SS TZ`.
pub struct LocalDateTime<'a>(pub &'a Timestamp);

impl fmt::Display for LocalDateTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .to_zoned(TimeZone::system())
                .strftime("%Y-%m-%d %H:%M:%S %Z")
        )
    }
}

/// Formats a number of seconds as `2h 05m 09s`, `5m 09s` or `9s`.
pub struct Elapsed(pub i64);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.max(0);
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
        if hours > 0 {
            write!(f, "{hours}h {minutes:02}m {seconds:02}s")
        } else if minutes > 0 {
            write!(f, "{minutes}m {seconds:02}s")
        } else {
            write!(f, "{seconds}s")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed() {
        assert_eq!(Elapsed(9).to_string(), "9s");
        assert_eq!(Elapsed(309).to_string(), "5m 09s");
        assert_eq!(Elapsed(7509).to_string(), "2h 05m 09s");
        assert_eq!(Elapsed(-4).to_string(), "0s");
    }
}
