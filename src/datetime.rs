//! English date/time phrase resolution.
//!
//! Turns phrases such as "tomorrow at noon", "this weekend" or
//! "between 2 and 4" into a concrete start (and optional end) in the
//! location's UTC offset, plus a natural-language label for replies.
//!
//! Ranges are half-open: `start <= t < end`.
//!
//! A day of the month ("the 21st", "May 21st", "21st of May") means the
//! next such date on or after today.
//!
//! A bare hour from 1 to 6 with no am/pm reads as afternoon ("between 2 and
//! 4"). Evening and night parts of the day push any morning hour into the
//! afternoon ("tonight at 8").

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    Date,
    Time,
    DateTime,
    DateRange,
    TimeRange,
    DateTimeRange,
}

impl DateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateKind::Date => "date",
            DateKind::Time => "time",
            DateKind::DateTime => "datetime",
            DateKind::DateRange => "daterange",
            DateKind::TimeRange => "timerange",
            DateKind::DateTimeRange => "datetimerange",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateResolution {
    pub kind: DateKind,
    pub start: DateTime<FixedOffset>,
    pub end: Option<DateTime<FixedOffset>>,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayRef {
    Offset(i64),
    Weekday { day: Weekday, next: bool },
    OfMonth { month: Option<u32>, day: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl PartOfDay {
    fn bounds(self) -> (u32, u32) {
        match self {
            PartOfDay::Morning => (8, 12),
            PartOfDay::Afternoon => (12, 16),
            PartOfDay::Evening => (16, 20),
            PartOfDay::Night => (20, 24),
        }
    }

    fn name(self) -> &'static str {
        match self {
            PartOfDay::Morning => "morning",
            PartOfDay::Afternoon => "afternoon",
            PartOfDay::Evening => "evening",
            PartOfDay::Night => "night",
        }
    }

    fn is_late(self) -> bool {
        !matches!(self, PartOfDay::Morning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeRef {
    Week { next: bool },
    Weekend { next: bool },
    NextDays(i64),
}

#[derive(Debug, Default)]
struct Parts {
    day: Option<DayRef>,
    time: Option<Clock>,
    part: Option<PartOfDay>,
    range: Option<RangeRef>,
    time_range: Option<(Clock, Clock)>,
}

/// A parsed clock reading; `explicit` is false when no am/pm was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clock {
    hour: u32,
    minute: u32,
    explicit: bool,
}

impl Clock {
    fn to_time(self, part: Option<PartOfDay>) -> Option<NaiveTime> {
        let mut hour = self.hour;
        if !self.explicit && hour < 12 {
            let late = part.is_some_and(PartOfDay::is_late);
            if late || (1..=6).contains(&hour) {
                hour += 12;
            }
        }
        NaiveTime::from_hms_opt(hour, self.minute, 0)
    }
}

/// Resolve `phrase` relative to `now`. `None` means "no specific time",
/// which callers treat as the current conditions.
pub fn resolve(phrase: &str, now: DateTime<FixedOffset>) -> Option<DateResolution> {
    let tokens = tokenize(phrase);
    let parts = scan(&tokens);
    build(parts, now)
}

fn tokenize(phrase: &str) -> Vec<String> {
    let cleaned: String = phrase
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.' && *c != '\'')
        .map(|c| if c.is_alphanumeric() || c == ':' { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

fn scan(tokens: &[String]) -> Parts {
    let mut parts = Parts::default();
    let tok = |i: usize| tokens.get(i).map(String::as_str);
    let mut i = 0;

    while i < tokens.len() {
        let t = tokens[i].as_str();
        let prev = if i > 0 { tok(i - 1) } else { None };
        let mut consumed = 1;

        match t {
            "today" => parts.day = Some(DayRef::Offset(0)),
            "tonight" => {
                parts.day = Some(DayRef::Offset(0));
                parts.part = Some(PartOfDay::Night);
            }
            "tomorrow" => {
                if parts.day.is_none() {
                    parts.day = Some(DayRef::Offset(1));
                }
            }
            "yesterday" => parts.day = Some(DayRef::Offset(-1)),
            "day" if tok(i + 1) == Some("after") && tok(i + 2) == Some("tomorrow") => {
                parts.day = Some(DayRef::Offset(2));
                consumed = 3;
            }
            "morning" => parts.part = Some(PartOfDay::Morning),
            "afternoon" => parts.part = Some(PartOfDay::Afternoon),
            "evening" => parts.part = Some(PartOfDay::Evening),
            "night" => parts.part = Some(PartOfDay::Night),
            "week" => parts.range = Some(RangeRef::Week { next: prev == Some("next") }),
            "weekend" => parts.range = Some(RangeRef::Weekend { next: prev == Some("next") }),
            "in" => {
                if let (Some(n), Some("days" | "day")) = (tok(i + 1).and_then(number), tok(i + 2)) {
                    parts.day = Some(DayRef::Offset(n));
                    consumed = 3;
                }
            }
            "next" => {
                if let Some(n) = tok(i + 1).and_then(number)
                    && matches!(tok(i + 2), Some("days" | "day"))
                {
                    parts.range = Some(RangeRef::NextDays(n));
                    consumed = 3;
                } else if tok(i + 1) == Some("few") && tok(i + 2) == Some("days") {
                    parts.range = Some(RangeRef::NextDays(3));
                    consumed = 3;
                } else if tok(i + 1) == Some("couple") && tok(i + 2) == Some("of") && tok(i + 3) == Some("days") {
                    parts.range = Some(RangeRef::NextDays(2));
                    consumed = 4;
                }
            }
            "between" | "from" => {
                if let Some((a, used_a)) = clock_at(tokens, i + 1, true) {
                    let sep = i + 1 + used_a;
                    if matches!(tok(sep), Some("and" | "to" | "until" | "till"))
                        && let Some((b, used_b)) = clock_at(tokens, sep + 1, true)
                    {
                        parts.time_range = Some((a, b));
                        consumed = 2 + used_a + used_b;
                    }
                }
            }
            "at" | "by" | "around" | "about" => {
                if let Some((c, used)) = clock_at(tokens, i + 1, true) {
                    parts.time = Some(c);
                    consumed = 1 + used;
                }
            }
            _ => {
                if let Some(day) = weekday(t) {
                    parts.day = Some(DayRef::Weekday { day, next: prev == Some("next") });
                } else if let Some(m) = month(t)
                    && let Some(day) = tok(i + 1).and_then(|n| ordinal(n).or_else(|| day_number(n)))
                {
                    parts.day = Some(DayRef::OfMonth { month: Some(m), day });
                    consumed = 2;
                } else if let Some(day) = ordinal(t) {
                    let m = match (tok(i + 1), tok(i + 2).and_then(month)) {
                        (Some("of"), Some(m)) => {
                            consumed = 3;
                            Some(m)
                        }
                        (next, _) => next.and_then(month).inspect(|_| consumed = 2),
                    };
                    parts.day = Some(DayRef::OfMonth { month: m, day });
                } else if let Some((c, used)) = clock_at(tokens, i, false) {
                    parts.time = Some(c);
                    consumed = used;
                }
            }
        }
        i += consumed;
    }
    parts
}

/// Parse a clock reading starting at `tokens[i]`. Bare numbers only count
/// when `forced` (after a time preposition); returns tokens consumed.
fn clock_at(tokens: &[String], i: usize, forced: bool) -> Option<(Clock, usize)> {
    let t = tokens.get(i)?.as_str();
    match t {
        "noon" | "midday" => return Some((Clock { hour: 12, minute: 0, explicit: true }, 1)),
        "midnight" => return Some((Clock { hour: 0, minute: 0, explicit: true }, 1)),
        _ => {}
    }

    let (digits, suffix) = match t.find(|c: char| c.is_ascii_alphabetic()) {
        Some(pos) => (&t[..pos], Some(&t[pos..])),
        None => (t, None),
    };
    if digits.is_empty() {
        return None;
    }

    let (hour, minute, has_colon) = match digits.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?, true),
        None => (digits.parse::<u32>().ok()?, 0, false),
    };
    if hour > 23 || minute > 59 {
        return None;
    }

    let mut used = 1;
    let meridiem = match suffix {
        Some(s) => Some(s),
        None => match tokens.get(i + 1).map(String::as_str) {
            Some(m @ ("am" | "pm")) => {
                used = 2;
                Some(m)
            }
            _ => None,
        },
    };

    let hour = match meridiem {
        Some("am") if hour <= 12 => hour % 12,
        Some("pm") if hour <= 12 => hour % 12 + 12,
        Some("oclock") | None => {
            if !(forced || has_colon) {
                return None;
            }
            hour
        }
        Some(_) => return None,
    };
    if tokens.get(i + used).map(String::as_str) == Some("oclock") {
        used += 1;
    }

    let explicit = meridiem.is_some_and(|m| m != "oclock") || hour >= 12 || (has_colon && hour == 0);
    Some((Clock { hour, minute, explicit }, used))
}

fn weekday(t: &str) -> Option<Weekday> {
    Some(match t {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    })
}

fn month(t: &str) -> Option<u32> {
    Some(match t {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    })
}

/// `21st`, `2nd`, `3rd`, `4th`
fn ordinal(t: &str) -> Option<u32> {
    let digits = ["st", "nd", "rd", "th"].iter().find_map(|s| t.strip_suffix(s))?;
    day_number(digits)
}

fn day_number(t: &str) -> Option<u32> {
    t.parse().ok().filter(|d| (1..=31).contains(d))
}

/// English ordinal suffix for a day of the month.
pub fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn number(t: &str) -> Option<i64> {
    Some(match t {
        "one" | "a" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        other => other.parse().ok().filter(|n| (1..=31).contains(n))?,
    })
}

fn build(parts: Parts, now: DateTime<FixedOffset>) -> Option<DateResolution> {
    let offset = *now.offset();
    let today = now.date_naive();
    let at = |date: NaiveDate, time: NaiveTime| offset.from_local_datetime(&date.and_time(time)).single();
    let midnight = |date: NaiveDate| at(date, NaiveTime::MIN);

    if let Some((a, b)) = parts.time_range {
        let date = match parts.day {
            Some(d) => day_date(d, today)?,
            None => today,
        };
        let start_t = a.to_time(parts.part)?;
        let end_t = b.to_time(parts.part)?;
        let start = at(date, start_t)?;
        let mut end = at(date, end_t)?;
        if end <= start {
            end += Duration::days(1);
        }
        let between = format!("between {} and {}", clock_label(start_t), clock_label(end_t));
        return Some(match parts.day {
            Some(d) => DateResolution {
                kind: DateKind::DateTimeRange,
                start,
                end: Some(end),
                label: format!("{} {between}", day_label(d, date, today)),
            },
            None => DateResolution { kind: DateKind::TimeRange, start, end: Some(end), label: between },
        });
    }

    if let Some(range) = parts.range {
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let (first, days, label) = match range {
            RangeRef::Week { next: false } => (monday, 7, "this week".to_string()),
            RangeRef::Week { next: true } => (monday + Duration::days(7), 7, "next week".to_string()),
            RangeRef::Weekend { next: false } => (monday + Duration::days(5), 2, "this weekend".to_string()),
            RangeRef::Weekend { next: true } => (monday + Duration::days(12), 2, "next weekend".to_string()),
            RangeRef::NextDays(n) => (today, n, format!("in the next {n} days")),
        };
        return Some(DateResolution {
            kind: DateKind::DateRange,
            start: midnight(first)?,
            end: Some(midnight(first + Duration::days(days))?),
            label,
        });
    }

    if let Some(clock) = parts.time {
        let time = clock.to_time(parts.part)?;
        return Some(match parts.day {
            Some(d) => {
                let date = day_date(d, today)?;
                DateResolution {
                    kind: DateKind::DateTime,
                    start: at(date, time)?,
                    end: None,
                    label: format!("{} at {}", day_label(d, date, today), clock_label(time)),
                }
            }
            None => DateResolution {
                kind: DateKind::Time,
                start: at(today, time)?,
                end: None,
                label: format!("at {}", clock_label(time)),
            },
        });
    }

    if let Some(part) = parts.part {
        let day = parts.day.unwrap_or(DayRef::Offset(0));
        let date = day_date(day, today)?;
        let (from, to) = part.bounds();
        let start = at(date, NaiveTime::from_hms_opt(from, 0, 0)?)?;
        let end = midnight(date)? + Duration::hours(to as i64);
        return Some(DateResolution {
            kind: DateKind::DateTimeRange,
            start,
            end: Some(end),
            label: part_label(day, date, part, today),
        });
    }

    let day = parts.day?;
    let date = day_date(day, today)?;
    Some(DateResolution {
        kind: DateKind::Date,
        start: midnight(date)?,
        end: None,
        label: day_label(day, date, today),
    })
}

/// `None` when no such calendar day exists (`February 30th`).
fn day_date(day: DayRef, today: NaiveDate) -> Option<NaiveDate> {
    Some(match day {
        DayRef::Offset(n) => today + Duration::days(n),
        DayRef::Weekday { day, next } => {
            let ahead = (7 + day.num_days_from_monday() as i64
                - today.weekday().num_days_from_monday() as i64)
                % 7;
            let ahead = if next && ahead == 0 { 7 } else { ahead };
            today + Duration::days(ahead)
        }
        DayRef::OfMonth { month: Some(month), day } => (0..=8)
            .filter_map(|k| NaiveDate::from_ymd_opt(today.year() + k, month, day))
            .find(|date| *date >= today)?,
        DayRef::OfMonth { month: None, day } => (0..=12)
            .filter_map(|k| {
                let index = today.month0() + k;
                NaiveDate::from_ymd_opt(today.year() + (index / 12) as i32, index % 12 + 1, day)
            })
            .find(|date| *date >= today)?,
    })
}

fn day_label(day: DayRef, date: NaiveDate, today: NaiveDate) -> String {
    match ((date - today).num_days(), day) {
        (0, _) => "today".to_string(),
        (1, _) => "tomorrow".to_string(),
        (-1, _) => "yesterday".to_string(),
        (_, DayRef::OfMonth { .. }) => {
            format!("on {} {}{}", date.format("%B"), date.day(), ordinal_suffix(date.day()))
        }
        _ => format!("on {}", date.format("%A")),
    }
}

fn part_label(day: DayRef, date: NaiveDate, part: PartOfDay, today: NaiveDate) -> String {
    match ((date - today).num_days(), part) {
        (0, PartOfDay::Night) => "tonight".to_string(),
        (0, p) => format!("this {}", p.name()),
        (_, p) => format!("{} {}", day_label(day, date, today), p.name()),
    }
}

fn clock_label(time: NaiveTime) -> String {
    use chrono::Timelike;
    if time.minute() == 0 {
        time.format("%-I%p").to_string()
    } else {
        time.format("%-I:%M%p").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday 2024-05-15 09:30 at UTC-7.
    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-15T09:30:00-07:00").unwrap()
    }

    fn local(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn r(phrase: &str) -> DateResolution {
        resolve(phrase, now()).unwrap_or_else(|| panic!("'{phrase}' did not resolve"))
    }

    #[test]
    fn relative_days() {
        let d = r("today");
        assert_eq!(d.kind, DateKind::Date);
        assert_eq!(d.start, local("2024-05-15T00:00:00-07:00"));
        assert_eq!(d.label, "today");

        let d = r("Tomorrow");
        assert_eq!(d.start, local("2024-05-16T00:00:00-07:00"));
        assert_eq!(d.label, "tomorrow");

        let d = r("the day after tomorrow");
        assert_eq!(d.start, local("2024-05-17T00:00:00-07:00"));
        assert_eq!(d.label, "on Friday");

        assert_eq!(r("in 2 days").label, "on Friday");
        assert_eq!(r("yesterday").label, "yesterday");
    }

    #[test]
    fn weekdays_resolve_forward() {
        assert_eq!(r("friday").start, local("2024-05-17T00:00:00-07:00"));
        assert_eq!(r("on Friday").label, "on Friday");
        assert_eq!(r("wednesday").label, "today");
        assert_eq!(r("next wednesday").start, local("2024-05-22T00:00:00-07:00"));
        assert_eq!(r("monday").start, local("2024-05-20T00:00:00-07:00"));
    }

    #[test]
    fn times_resolve_today() {
        let d = r("at 10pm");
        assert_eq!(d.kind, DateKind::Time);
        assert_eq!(d.start, local("2024-05-15T22:00:00-07:00"));
        assert_eq!(d.label, "at 10PM");

        assert_eq!(r("at 10:30 p.m.").start, local("2024-05-15T22:30:00-07:00"));
        assert_eq!(r("14:30").start, local("2024-05-15T14:30:00-07:00"));
        assert_eq!(r("at 9").start, local("2024-05-15T09:00:00-07:00"));
        assert_eq!(r("at 3").start, local("2024-05-15T15:00:00-07:00"));
        assert_eq!(r("at noon").label, "at 12PM");
    }

    #[test]
    fn day_with_time_is_datetime() {
        let d = r("tomorrow at noon");
        assert_eq!(d.kind, DateKind::DateTime);
        assert_eq!(d.start, local("2024-05-16T12:00:00-07:00"));
        assert_eq!(d.label, "tomorrow at 12PM");

        let d = r("tonight at 8");
        assert_eq!(d.kind, DateKind::DateTime);
        assert_eq!(d.start, local("2024-05-15T20:00:00-07:00"));
    }

    #[test]
    fn week_ranges() {
        let d = r("this week");
        assert_eq!(d.kind, DateKind::DateRange);
        assert_eq!(d.start, local("2024-05-13T00:00:00-07:00"));
        assert_eq!(d.end, Some(local("2024-05-20T00:00:00-07:00")));

        let d = r("this weekend");
        assert_eq!(d.start, local("2024-05-18T00:00:00-07:00"));
        assert_eq!(d.end, Some(local("2024-05-20T00:00:00-07:00")));

        assert_eq!(r("next week").start, local("2024-05-20T00:00:00-07:00"));

        let d = r("over the next 3 days");
        assert_eq!(d.start, local("2024-05-15T00:00:00-07:00"));
        assert_eq!(d.end, Some(local("2024-05-18T00:00:00-07:00")));
        assert_eq!(d.label, "in the next 3 days");
    }

    #[test]
    fn time_ranges() {
        let d = r("between 2 and 4");
        assert_eq!(d.kind, DateKind::TimeRange);
        assert_eq!(d.start, local("2024-05-15T14:00:00-07:00"));
        assert_eq!(d.end, Some(local("2024-05-15T16:00:00-07:00")));
        assert_eq!(d.label, "between 2PM and 4PM");

        let d = r("tomorrow from 9am to 11am");
        assert_eq!(d.kind, DateKind::DateTimeRange);
        assert_eq!(d.start, local("2024-05-16T09:00:00-07:00"));
        assert_eq!(d.label, "tomorrow between 9AM and 11AM");
    }

    #[test]
    fn parts_of_day() {
        let d = r("this morning");
        assert_eq!(d.kind, DateKind::DateTimeRange);
        assert_eq!(d.start, local("2024-05-15T08:00:00-07:00"));
        assert_eq!(d.end, Some(local("2024-05-15T12:00:00-07:00")));
        assert_eq!(d.label, "this morning");

        let d = r("tonight");
        assert_eq!(d.end, Some(local("2024-05-16T00:00:00-07:00")));
        assert_eq!(d.label, "tonight");

        assert_eq!(r("tomorrow afternoon").label, "tomorrow afternoon");
        assert_eq!(r("friday evening").label, "on Friday evening");
    }

    #[test]
    fn days_of_the_month() {
        let d = r("on the 21st");
        assert_eq!(d.kind, DateKind::Date);
        assert_eq!(d.start, local("2024-05-21T00:00:00-07:00"));
        assert_eq!(d.label, "on May 21st");

        assert_eq!(r("May 21st").start, local("2024-05-21T00:00:00-07:00"));
        assert_eq!(r("the 21st of May").start, local("2024-05-21T00:00:00-07:00"));
        assert_eq!(r("may 21").label, "on May 21st");

        // Past days roll forward to the next month or year.
        assert_eq!(r("the 3rd").start, local("2024-06-03T00:00:00-07:00"));
        assert_eq!(r("April 2nd").start, local("2025-04-02T00:00:00-07:00"));
        assert_eq!(r("the 15th").label, "today");
        assert_eq!(r("the 16th").label, "tomorrow");
        assert_eq!(r("the 31st").start, local("2024-05-31T00:00:00-07:00"));
        assert!(resolve("february 30th", now()).is_none());
    }

    #[test]
    fn day_of_the_month_with_time() {
        let d = r("on the 21st at 3pm");
        assert_eq!(d.kind, DateKind::DateTime);
        assert_eq!(d.start, local("2024-05-21T15:00:00-07:00"));
        assert_eq!(d.label, "on May 21st at 3PM");

        assert_eq!(r("the 22nd in the evening").label, "on May 22nd evening");
    }

    #[test]
    fn ordinal_suffixes() {
        let got: Vec<_> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 31].map(ordinal_suffix).into();
        assert_eq!(got, ["st", "nd", "rd", "th", "th", "th", "th", "st", "nd", "rd", "st"]);
    }

    #[test]
    fn unrelated_phrases_do_not_resolve() {
        assert!(resolve("now", now()).is_none());
        assert!(resolve("right now", now()).is_none());
        assert!(resolve("banana", now()).is_none());
        assert!(resolve("3 dogs", now()).is_none());
        assert!(resolve("", now()).is_none());
    }
}
