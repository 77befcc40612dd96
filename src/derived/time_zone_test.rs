use tracing_test::traced_test;

use super::*;

#[test]
fn utc_spellings() {
    for raw in ["", "  ", "UTC", "GMT", "UTC+0", "GMT-00:00"] {
        assert_eq!(UserTimeZone::parse(raw), UserTimeZone::UTC, "{:?}", raw);
    }
}

#[test]
fn fixed_offsets() {
    assert_eq!(UserTimeZone::parse("GMT+2"), UserTimeZone::Fixed(2 * 3600));
    assert_eq!(UserTimeZone::parse("UTC-03:30"), UserTimeZone::Fixed(-(3 * 3600 + 30 * 60)));
    assert_eq!(UserTimeZone::parse("GMT+0545"), UserTimeZone::Fixed(5 * 3600 + 45 * 60));
    assert_eq!(UserTimeZone::parse("UTC+14").offset_seconds(), Some(14 * 3600));
}

#[test]
fn region_ids_are_kept() {
    let zone = UserTimeZone::parse(" America/Argentina/Buenos_Aires ");
    assert_eq!(zone, UserTimeZone::Region("America/Argentina/Buenos_Aires".to_string()));
    assert_eq!(zone.offset_seconds(), None);
    assert_eq!(UserTimeZone::parse("Etc/GMT+5"), UserTimeZone::Region("Etc/GMT+5".to_string()));
}

#[traced_test]
#[test]
fn garbage_falls_back_to_utc() {
    for raw in ["UTC+", "GMT+25", "UTC+1:75", "UTCfoo", "UTC--5", "not a zone", "Berlin"] {
        assert_eq!(UserTimeZone::parse(raw), UserTimeZone::UTC, "{:?}", raw);
    }
    assert!(logs_contain("unknown time zone"));
}
