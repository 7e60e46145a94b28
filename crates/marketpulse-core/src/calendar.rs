//! Exchange calendar: classifies an instant into a [`SessionPhase`].
//!
//! Resolution order is fixed: weekend, then holiday, then time-of-day in
//! exchange-local time. Session windows are half-open `[start, end)`.
//! Everything here is pure and may be called from any task at any rate.

use std::collections::BTreeMap;

use serde::Serialize;
use time::macros::{date, offset, time};
use time::{Date, PrimitiveDateTime, Time, UtcOffset, Weekday};

use crate::{SessionPhase, UtcDateTime, ValidationError};

/// NSE local time (IST), no daylight saving.
pub const EXCHANGE_OFFSET: UtcOffset = offset!(+5:30);

/// Half-open intraday window in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: Time,
    pub end: Time,
}

impl SessionWindow {
    pub const fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    pub fn contains(self, at: Time) -> bool {
        at >= self.start && at < self.end
    }
}

/// Exchange-defined session windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingHours {
    pub pre_open: SessionWindow,
    pub continuous: SessionWindow,
}

impl Default for TradingHours {
    fn default() -> Self {
        Self {
            pre_open: SessionWindow::new(time!(9:00), time!(9:08)),
            continuous: SessionWindow::new(time!(9:15), time!(15:30)),
        }
    }
}

const NSE_HOLIDAYS: [(Date, &str); 35] = [
    (date!(2025 - 01 - 01), "New Year's Day"),
    (date!(2025 - 01 - 14), "Makar Sankranti"),
    (date!(2025 - 01 - 26), "Republic Day"),
    (date!(2025 - 03 - 14), "Maha Shivratri"),
    (date!(2025 - 03 - 29), "Holi"),
    (date!(2025 - 04 - 02), "Ram Navami"),
    (date!(2025 - 04 - 14), "Dr. Babasaheb Ambedkar Jayanti"),
    (date!(2025 - 04 - 18), "Good Friday"),
    (date!(2025 - 05 - 01), "Maharashtra Day"),
    (date!(2025 - 06 - 06), "Bakri Id"),
    (date!(2025 - 08 - 15), "Independence Day"),
    (date!(2025 - 09 - 05), "Ganesh Chaturthi"),
    (date!(2025 - 10 - 02), "Mahatma Gandhi Jayanti"),
    (date!(2025 - 10 - 23), "Dussehra"),
    (date!(2025 - 11 - 04), "Diwali-Laxmi Pujan"),
    (date!(2025 - 11 - 05), "Diwali-Balipratipada"),
    (date!(2025 - 12 - 25), "Christmas"),
    (date!(2026 - 01 - 01), "New Year's Day"),
    (date!(2026 - 01 - 14), "Makar Sankranti"),
    (date!(2026 - 01 - 26), "Republic Day"),
    (date!(2026 - 03 - 03), "Maha Shivratri"),
    (date!(2026 - 03 - 19), "Holi"),
    (date!(2026 - 03 - 29), "Good Friday"),
    (date!(2026 - 04 - 10), "Ram Navami"),
    (date!(2026 - 04 - 14), "Dr. Babasaheb Ambedkar Jayanti"),
    (date!(2026 - 05 - 01), "Maharashtra Day"),
    (date!(2026 - 05 - 23), "Bakri Id"),
    (date!(2026 - 08 - 15), "Independence Day"),
    (date!(2026 - 08 - 24), "Ganesh Chaturthi"),
    (date!(2026 - 10 - 02), "Mahatma Gandhi Jayanti"),
    (date!(2026 - 10 - 12), "Dussehra"),
    (date!(2026 - 11 - 02), "Diwali-Laxmi Pujan"),
    (date!(2026 - 11 - 03), "Diwali-Balipratipada"),
    (date!(2026 - 11 - 13), "Gurunanak Jayanti"),
    (date!(2026 - 12 - 25), "Christmas"),
];

/// Immutable set of non-trading dates, each with a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayCalendar {
    days: BTreeMap<Date, String>,
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::nse()
    }
}

impl HolidayCalendar {
    /// NSE holidays for 2025 and 2026.
    pub fn nse() -> Self {
        Self::new(
            NSE_HOLIDAYS
                .iter()
                .map(|(day, name)| (*day, (*name).to_owned())),
        )
    }

    pub fn empty() -> Self {
        Self {
            days: BTreeMap::new(),
        }
    }

    pub fn new(days: impl IntoIterator<Item = (Date, String)>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    /// Build from `(YYYY-MM-DD, name)` pairs.
    pub fn from_iso<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ValidationError> {
        let format = time::macros::format_description!("[year]-[month]-[day]");
        let mut days = BTreeMap::new();
        for (raw, name) in entries {
            let day = Date::parse(raw.trim(), &format).map_err(|_| ValidationError::InvalidDate {
                value: raw.to_owned(),
            })?;
            days.insert(day, name.to_owned());
        }
        Ok(Self { days })
    }

    pub fn contains(&self, day: Date) -> bool {
        self.days.contains_key(&day)
    }

    pub fn name(&self, day: Date) -> Option<&str> {
        self.days.get(&day).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Human-facing summary of the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub headline: &'static str,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holiday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_open: Option<UtcDateTime>,
    pub as_of: UtcDateTime,
}

/// Calendar resolver: the single source of truth for session phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketCalendar {
    holidays: HolidayCalendar,
    hours: TradingHours,
    offset: UtcOffset,
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self::new(HolidayCalendar::nse(), TradingHours::default())
    }
}

impl MarketCalendar {
    pub fn new(holidays: HolidayCalendar, hours: TradingHours) -> Self {
        Self {
            holidays,
            hours,
            offset: EXCHANGE_OFFSET,
        }
    }

    pub fn holidays(&self) -> &HolidayCalendar {
        &self.holidays
    }

    pub fn hours(&self) -> TradingHours {
        self.hours
    }

    /// Exchange-local calendar date of `now`.
    pub fn trading_date(&self, now: UtcDateTime) -> Date {
        now.to_offset(self.offset).date()
    }

    pub fn resolve_phase(&self, now: UtcDateTime) -> SessionPhase {
        let local = now.to_offset(self.offset);

        if is_weekend(local.weekday()) {
            return SessionPhase::Weekend;
        }
        if self.holidays.contains(local.date()) {
            return SessionPhase::Holiday;
        }

        let at = local.time();
        if self.hours.pre_open.contains(at) {
            SessionPhase::PreOpen
        } else if self.hours.continuous.contains(at) {
            SessionPhase::Open
        } else {
            SessionPhase::Closed
        }
    }

    pub fn is_open(&self, now: UtcDateTime) -> bool {
        self.resolve_phase(now) == SessionPhase::Open
    }

    pub fn is_closed_for_day(&self, now: UtcDateTime) -> bool {
        !self.is_open(now)
    }

    pub fn is_trading_day(&self, day: Date) -> bool {
        !is_weekend(day.weekday()) && !self.holidays.contains(day)
    }

    /// Opening instant of the next continuous session strictly after `now`'s
    /// session start; today's open if `now` precedes it on a trading day.
    pub fn next_trading_open(&self, now: UtcDateTime) -> UtcDateTime {
        let local = now.to_offset(self.offset);
        let today = local.date();

        if self.is_trading_day(today) && local.time() < self.hours.continuous.start {
            return self.open_instant(today);
        }

        let mut day = today;
        loop {
            day = match day.next_day() {
                Some(next) => next,
                None => return self.open_instant(day),
            };
            if self.is_trading_day(day) {
                return self.open_instant(day);
            }
        }
    }

    /// Phase plus display text, as the status bar shows it.
    pub fn status(&self, now: UtcDateTime) -> SessionStatus {
        let phase = self.resolve_phase(now);
        let local = now.to_offset(self.offset);
        let open_at = format_clock(self.hours.continuous.start);

        let (headline, description, holiday, next_open) = match phase {
            SessionPhase::Open => (
                "LIVE MARKET",
                String::from("Market is currently open for trading"),
                None,
                None,
            ),
            SessionPhase::PreOpen => (
                "PRE-OPEN SESSION",
                String::from("Pre-open session in progress"),
                None,
                Some(self.next_trading_open(now)),
            ),
            SessionPhase::Closed => {
                let next = self.next_trading_open(now);
                let next_day = self.trading_date(next);
                let description = if next_day == local.date() {
                    format!("Opens today at {open_at}")
                } else {
                    format!("Opens {next_day} at {open_at}")
                };
                ("MARKET CLOSED", description, None, Some(next))
            }
            SessionPhase::Weekend => {
                let next = self.next_trading_open(now);
                let description = format!(
                    "{} • Next trading day: {} at {open_at}",
                    local.weekday(),
                    self.trading_date(next)
                );
                ("WEEKEND", description, None, Some(next))
            }
            SessionPhase::Holiday => {
                let next = self.next_trading_open(now);
                let name = self
                    .holidays
                    .name(local.date())
                    .unwrap_or("Market Holiday")
                    .to_owned();
                let description = format!(
                    "{name} • Next trading: {} at {open_at}",
                    self.trading_date(next)
                );
                ("MARKET HOLIDAY", description, Some(name), Some(next))
            }
        };

        SessionStatus {
            phase,
            headline,
            description,
            holiday,
            next_open,
            as_of: now,
        }
    }

    fn open_instant(&self, day: Date) -> UtcDateTime {
        let local = PrimitiveDateTime::new(day, self.hours.continuous.start).assume_offset(self.offset);
        UtcDateTime::from_any_offset(local)
    }
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Saturday | Weekday::Sunday)
}

fn format_clock(at: Time) -> String {
    let (hour, minute) = (at.hour(), at.minute());
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let hour12 = match hour % 12 {
        0 => 12,
        other => other,
    };
    format!("{hour12}:{minute:02} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("valid timestamp")
    }

    #[test]
    fn windows_are_half_open() {
        let calendar = MarketCalendar::default();
        // 2025-08-14 is a Thursday; IST = UTC+05:30.
        assert_eq!(calendar.resolve_phase(at("2025-08-14T03:29:59Z")), SessionPhase::Closed);
        assert_eq!(calendar.resolve_phase(at("2025-08-14T03:30:00Z")), SessionPhase::PreOpen);
        assert_eq!(calendar.resolve_phase(at("2025-08-14T03:38:00Z")), SessionPhase::Closed);
        assert_eq!(calendar.resolve_phase(at("2025-08-14T03:45:00Z")), SessionPhase::Open);
        assert_eq!(calendar.resolve_phase(at("2025-08-14T09:59:59Z")), SessionPhase::Open);
        assert_eq!(calendar.resolve_phase(at("2025-08-14T10:00:00Z")), SessionPhase::Closed);
    }

    #[test]
    fn weekday_is_taken_in_exchange_time() {
        let calendar = MarketCalendar::default();
        // Friday 20:00 UTC is already Saturday 01:30 IST.
        assert_eq!(calendar.resolve_phase(at("2025-08-22T20:00:00Z")), SessionPhase::Weekend);
    }

    #[test]
    fn next_open_same_day_before_session() {
        let calendar = MarketCalendar::default();
        let next = calendar.next_trading_open(at("2025-08-14T02:00:00Z"));
        assert_eq!(next, at("2025-08-14T03:45:00Z"));
    }

    #[test]
    fn next_open_skips_holiday_and_weekend() {
        let calendar = MarketCalendar::default();
        // Thursday after close -> Friday 15th is a holiday -> Monday 18th.
        let next = calendar.next_trading_open(at("2025-08-14T11:00:00Z"));
        assert_eq!(next, at("2025-08-18T03:45:00Z"));
    }

    #[test]
    fn parses_iso_holidays() {
        let holidays =
            HolidayCalendar::from_iso([("2030-01-01", "New Year")]).expect("valid dates");
        assert!(holidays.contains(date!(2030 - 01 - 01)));
        assert!(matches!(
            HolidayCalendar::from_iso([("2030-13-01", "bad")]),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn formats_clock_in_twelve_hour_form() {
        assert_eq!(format_clock(time!(9:15)), "9:15 AM");
        assert_eq!(format_clock(time!(15:30)), "3:30 PM");
        assert_eq!(format_clock(time!(12:05)), "12:05 PM");
    }

    #[test]
    fn status_names_holiday() {
        let calendar = MarketCalendar::default();
        let status = calendar.status(at("2025-08-15T06:30:00Z"));
        assert_eq!(status.phase, SessionPhase::Holiday);
        assert_eq!(status.headline, "MARKET HOLIDAY");
        assert_eq!(status.holiday.as_deref(), Some("Independence Day"));
        assert!(status.description.contains("2025-08-18"));
    }
}
