use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Guild activity is scheduled in Brasília time (UTC-03:00, no daylight saving).
const BRASILIA_WEST_SECS: i32 = 3 * 3600;

pub fn brasilia_offset() -> FixedOffset {
    FixedOffset::west_opt(BRASILIA_WEST_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn now_brasilia() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&brasilia_offset())
}

/// Machine-readable stamp stored in `timestamp`-style fields.
pub fn stamp(at: DateTime<FixedOffset>) -> String {
    at.to_rfc3339()
}

/// Human-readable companion stored next to each stamp.
pub fn display(at: DateTime<FixedOffset>) -> String {
    at.format("%d/%m/%Y às %H:%M:%S (Brasília)").to_string()
}

pub fn parse_stamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).ok()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{brasilia_offset, display, parse_stamp, stamp};

    #[test]
    fn display_uses_local_wall_clock() {
        let at = Utc
            .with_ymd_and_hms(2025, 3, 14, 23, 30, 5)
            .single()
            .expect("valid instant")
            .with_timezone(&brasilia_offset());

        assert_eq!(display(at), "14/03/2025 às 20:30:05 (Brasília)");
        assert!(stamp(at).ends_with("-03:00"));
    }

    #[test]
    fn stamps_round_trip() {
        let at = super::now_brasilia();
        let parsed = parse_stamp(&stamp(at)).expect("parse");
        assert_eq!(parsed, at);
        assert!(parse_stamp("yesterday").is_none());
    }
}
