//! Behaviour tests for session phase resolution.
//!
//! All instants are given in UTC; the exchange runs on IST (UTC+05:30).
//! 2025-08-14 is a Thursday, 2025-08-15 is Independence Day.

use marketpulse_core::{HolidayCalendar, MarketCalendar, SessionPhase, TradingHours};
use marketpulse_tests::at;

// =============================================================================
// Phase resolution
// =============================================================================

#[test]
fn when_it_is_saturday_every_time_of_day_resolves_to_weekend() {
    // Given: the NSE calendar
    let calendar = MarketCalendar::default();

    // When / Then: any Saturday instant, including what would be session hours
    for raw in [
        "2025-08-15T18:30:00Z", // Saturday 00:00 IST
        "2025-08-16T03:45:00Z", // Saturday 09:15 IST
        "2025-08-16T06:00:00Z",
        "2025-08-16T18:29:59Z", // Saturday 23:59:59 IST
    ] {
        assert_eq!(calendar.resolve_phase(at(raw)), SessionPhase::Weekend, "{raw}");
    }
}

#[test]
fn when_the_date_is_a_listed_holiday_the_phase_is_holiday_all_day() {
    let calendar = MarketCalendar::default();

    assert_eq!(calendar.resolve_phase(at("2025-08-15T06:30:00Z")), SessionPhase::Holiday);
    assert_eq!(calendar.resolve_phase(at("2025-08-15T03:35:00Z")), SessionPhase::Holiday);
    assert!(!calendar.is_open(at("2025-08-15T06:30:00Z")));
}

#[test]
fn when_a_holiday_falls_on_a_weekend_weekend_wins() {
    // Given: a custom holiday on Sunday 2025-08-17
    let holidays = HolidayCalendar::from_iso([("2025-08-17", "Sunday Holiday")]).expect("valid");
    let calendar = MarketCalendar::new(holidays, TradingHours::default());

    // Then: weekend is checked first
    assert_eq!(calendar.resolve_phase(at("2025-08-17T06:00:00Z")), SessionPhase::Weekend);
}

#[test]
fn session_windows_are_half_open_at_every_boundary() {
    let calendar = MarketCalendar::default();

    let cases = [
        ("2025-08-14T03:29:59Z", SessionPhase::Closed),  // 08:59:59
        ("2025-08-14T03:30:00Z", SessionPhase::PreOpen), // 09:00:00
        ("2025-08-14T03:37:59Z", SessionPhase::PreOpen), // 09:07:59
        ("2025-08-14T03:38:00Z", SessionPhase::Closed),  // 09:08:00
        ("2025-08-14T03:44:59Z", SessionPhase::Closed),  // 09:14:59
        ("2025-08-14T03:45:00Z", SessionPhase::Open),    // 09:15:00
        ("2025-08-14T09:59:59Z", SessionPhase::Open),    // 15:29:59
        ("2025-08-14T10:00:00Z", SessionPhase::Closed),  // 15:30:00
    ];
    for (raw, expected) in cases {
        assert_eq!(calendar.resolve_phase(at(raw)), expected, "{raw}");
    }
}

#[test]
fn closed_for_day_is_the_complement_of_open() {
    let calendar = MarketCalendar::default();

    for raw in [
        "2025-08-14T02:00:00Z",
        "2025-08-14T03:32:00Z",
        "2025-08-14T05:00:00Z",
        "2025-08-14T12:00:00Z",
        "2025-08-15T05:00:00Z",
        "2025-08-16T05:00:00Z",
    ] {
        let now = at(raw);
        assert_ne!(calendar.is_open(now), calendar.is_closed_for_day(now), "{raw}");
    }
    assert!(calendar.is_closed_for_day(at("2025-08-14T03:32:00Z")), "pre-open is not open");
}

#[test]
fn phase_is_stable_under_repeated_queries() {
    let calendar = MarketCalendar::default();
    let now = at("2025-08-14T05:00:00Z");

    let first = calendar.resolve_phase(now);
    assert!((0..100).all(|_| calendar.resolve_phase(now) == first));
}

// =============================================================================
// Next open and status text
// =============================================================================

#[test]
fn next_open_skips_the_holiday_and_the_weekend() {
    let calendar = MarketCalendar::default();

    // Thursday after close
    assert_eq!(
        calendar.next_trading_open(at("2025-08-14T11:00:00Z")),
        at("2025-08-18T03:45:00Z")
    );
    // Saturday
    assert_eq!(
        calendar.next_trading_open(at("2025-08-16T06:00:00Z")),
        at("2025-08-18T03:45:00Z")
    );
}

#[test]
fn status_headline_follows_the_phase() {
    let calendar = MarketCalendar::default();

    let open = calendar.status(at("2025-08-14T05:00:00Z"));
    assert_eq!(open.headline, "LIVE MARKET");
    assert_eq!(open.next_open, None);

    let pre_open = calendar.status(at("2025-08-14T03:32:00Z"));
    assert_eq!(pre_open.headline, "PRE-OPEN SESSION");
    assert_eq!(pre_open.next_open, Some(at("2025-08-14T03:45:00Z")));

    let early = calendar.status(at("2025-08-14T02:00:00Z"));
    assert_eq!(early.headline, "MARKET CLOSED");
    assert_eq!(early.description, "Opens today at 9:15 AM");

    let after_close = calendar.status(at("2025-08-14T11:00:00Z"));
    assert_eq!(after_close.description, "Opens 2025-08-18 at 9:15 AM");

    let weekend = calendar.status(at("2025-08-16T06:00:00Z"));
    assert_eq!(weekend.headline, "WEEKEND");
    assert_eq!(weekend.description, "Saturday • Next trading day: 2025-08-18 at 9:15 AM");
    assert_eq!(weekend.holiday, None);
}
