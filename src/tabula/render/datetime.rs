//! Date, time, and schedule formatting.

use super::fragment::Fragment;
use super::scalar::value_text;
use super::{RenderContext, RenderOptions};
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde_json::Value;
use std::fmt::Write;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

const DATE_INPUTS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const TIME_INPUTS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// How a date should read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Exact,
    DateTime,
    Relative,
}

impl Granularity {
    pub fn from_setting(name: &str) -> Self {
        match name {
            "datetime" => Granularity::DateTime,
            "relative" => Granularity::Relative,
            _ => Granularity::Exact,
        }
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_INPUTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_datetime_only(raw).map(|dt| dt.date()))
}

fn parse_datetime_only(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_INPUTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    parse_datetime_only(raw).or_else(|| parse_date(raw).map(|d| d.and_time(NaiveTime::MIN)))
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_INPUTS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// "3 days ago" or "in 2 hours", relative to `now`.
pub fn relative(at: NaiveDateTime, now: NaiveDateTime) -> String {
    let formatter = timeago::Formatter::new();
    let delta = now.signed_duration_since(at);
    if delta >= Duration::zero() {
        formatter.convert(delta.to_std().unwrap_or_default())
    } else {
        let ahead = formatter.convert((-delta).to_std().unwrap_or_default());
        format!("in {}", ahead.trim_end_matches(" ago"))
    }
}

/// Whether `pattern` is a strftime spec chrono understands.
pub fn valid_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Formats `at` with `pattern`, or with `fallback` when the pattern is invalid or asks
/// for something a naive value lacks (such as an offset).
fn strftime(at: NaiveDateTime, pattern: &str, fallback: &str) -> String {
    let mut out = String::new();
    if valid_pattern(pattern) && write!(out, "{}", at.format(pattern)).is_ok() {
        return out;
    }
    out.clear();
    let _ = write!(out, "{}", at.format(fallback));
    out
}

pub fn format_datetime(
    at: NaiveDateTime,
    granularity: Granularity,
    options: &RenderOptions,
) -> Fragment {
    let exact = strftime(at, &options.datetime_format, DEFAULT_DATETIME_FORMAT);
    match granularity {
        Granularity::Exact => {
            Fragment::Text(strftime(at, &options.date_format, DEFAULT_DATE_FORMAT))
        }
        Granularity::DateTime => Fragment::Text(exact),
        Granularity::Relative => Fragment::alt(
            Fragment::Tooltip {
                text: relative(at, options.now),
                title: exact.clone(),
            },
            exact,
        ),
    }
}

pub fn format_date(date: NaiveDate, granularity: Granularity, options: &RenderOptions) -> Fragment {
    let midnight = date.and_time(NaiveTime::MIN);
    match granularity {
        Granularity::DateTime => format_datetime(midnight, granularity, options),
        Granularity::Exact => {
            Fragment::Text(strftime(midnight, &options.date_format, DEFAULT_DATE_FORMAT))
        }
        Granularity::Relative => {
            let exact = strftime(midnight, &options.date_format, DEFAULT_DATE_FORMAT);
            let text = relative_days(date, options.now.date());
            Fragment::alt(
                Fragment::Tooltip {
                    text,
                    title: exact.clone(),
                },
                exact,
            )
        }
    }
}

/// Day-level relative wording for calendar dates.
fn relative_days(date: NaiveDate, today: NaiveDate) -> String {
    let days = (date - today).num_days();
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        _ => relative(date.and_time(NaiveTime::MIN), today.and_time(NaiveTime::MIN)),
    }
}

pub fn format_time(time: NaiveTime, twelve_hour: bool, options: &RenderOptions) -> Fragment {
    if twelve_hour {
        Fragment::text(time.format("%-I:%M %p").to_string())
    } else {
        let at = NaiveDate::default().and_time(time);
        Fragment::Text(strftime(at, &options.time_format, DEFAULT_TIME_FORMAT))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Some(Frequency::Daily),
            "weekly" | "week" => Some(Frequency::Weekly),
            "monthly" | "month" => Some(Frequency::Monthly),
            "yearly" | "year" | "annually" => Some(Frequency::Yearly),
            _ => None,
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Frequency::Daily => "day",
            Frequency::Weekly => "week",
            Frequency::Monthly => "month",
            Frequency::Yearly => "year",
        }
    }
}

/// A recurring schedule stored as
/// `{"frequency", "interval", "days": ["mon", ...], "start", "end"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub frequency: Frequency,
    pub interval: u32,
    pub days: Vec<Weekday>,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

/// Upper bound on candidate dates examined when looking for the next occurrence.
const MAX_STEPS: usize = 5000;

impl Schedule {
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let frequency = Frequency::from_name(obj.get("frequency")?.as_str()?)?;
        let interval = obj
            .get("interval")
            .and_then(crate::settings::coerce_integer)
            .unwrap_or(1)
            .clamp(1, 366) as u32;
        let start = parse_date(obj.get("start")?.as_str()?)?;
        let end = obj.get("end").and_then(Value::as_str).and_then(parse_date);
        let mut days: Vec<Weekday> = obj
            .get("days")
            .and_then(Value::as_array)
            .map(|d| d.iter().filter_map(Value::as_str).filter_map(parse_weekday).collect())
            .unwrap_or_default();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        Some(Self {
            frequency,
            interval,
            days,
            start,
            end,
        })
    }

    fn within_end(&self, date: NaiveDate) -> bool {
        self.end.map_or(true, |end| date <= end)
    }

    /// First occurrence on or after `today`.
    pub fn next_occurrence(&self, today: NaiveDate) -> Option<NaiveDate> {
        let from = today.max(self.start);
        match self.frequency {
            Frequency::Daily => {
                let elapsed = (from - self.start).num_days();
                let step = i64::from(self.interval);
                let k = (elapsed + step - 1) / step;
                let date = self.start + Duration::days(k * step);
                self.within_end(date).then_some(date)
            }
            Frequency::Weekly => {
                let days = if self.days.is_empty() {
                    vec![self.start.weekday()]
                } else {
                    self.days.clone()
                };
                let offset = i64::from(self.start.weekday().num_days_from_monday());
                let week_zero = self.start - Duration::days(offset);
                let mut date = from;
                for _ in 0..MAX_STEPS {
                    if !self.within_end(date) {
                        return None;
                    }
                    let week = (date - week_zero).num_days() / 7;
                    if week % i64::from(self.interval) == 0 && days.contains(&date.weekday()) {
                        return Some(date);
                    }
                    date = date.succ_opt()?;
                }
                None
            }
            Frequency::Monthly | Frequency::Yearly => {
                let months = match self.frequency {
                    Frequency::Yearly => self.interval * 12,
                    _ => self.interval,
                };
                for k in 0..MAX_STEPS as u32 {
                    let date = self.start.checked_add_months(Months::new(k.checked_mul(months)?))?;
                    if !self.within_end(date) {
                        return None;
                    }
                    if date >= from {
                        return Some(date);
                    }
                }
                None
            }
        }
    }

    /// "Every 2 weeks on Sat, Sun from Mar 2, 2024 until Dec 29, 2024".
    pub fn summary(&self) -> String {
        let mut out = if self.interval == 1 {
            format!("Every {}", self.frequency.unit())
        } else {
            format!("Every {} {}s", self.interval, self.frequency.unit())
        };
        if self.frequency == Frequency::Weekly && !self.days.is_empty() {
            let names: Vec<String> = self.days.iter().map(|d| d.to_string()).collect();
            out.push_str(" on ");
            out.push_str(&names.join(", "));
        }
        out.push_str(&format!(" from {}", self.start.format("%b %-d, %Y")));
        if let Some(end) = self.end {
            out.push_str(&format!(" until {}", end.format("%b %-d, %Y")));
        }
        out
    }
}

fn parse_weekday(raw: &str) -> Option<Weekday> {
    raw.trim().parse::<Weekday>().ok()
}

pub(super) fn date_picker(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let raw = value_text(value)?;
    let granularity = Granularity::from_setting(ctx.settings.choice("date_format"));
    match parse_datetime_only(raw.trim()) {
        Some(at) if granularity == Granularity::DateTime => {
            Some(format_datetime(at, granularity, ctx.options))
        }
        _ => parse_date(&raw).map(|d| format_date(d, granularity, ctx.options)),
    }
}

pub(super) fn date_time_picker(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let at = parse_datetime(&value_text(value)?)?;
    let granularity = Granularity::from_setting(ctx.settings.choice("date_format"));
    Some(format_datetime(at, granularity, ctx.options))
}

pub(super) fn time_picker(ctx: &RenderContext<'_>, value: &Value) -> Option<Fragment> {
    let time = parse_time(&value_text(value)?)?;
    Some(format_time(time, ctx.settings.variant() == "12h", ctx.options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn options_at(now: &str) -> RenderOptions {
        RenderOptions {
            now: parse_datetime(now).unwrap(),
            ..RenderOptions::default()
        }
    }

    #[test]
    fn parses_stored_date_formats() {
        assert_eq!(parse_date("20240315"), Some(date("2024-03-15")));
        assert_eq!(parse_date("2024-03-15 10:00:00"), Some(date("2024-03-15")));
        assert_eq!(parse_date("soon"), None);
        assert_eq!(
            parse_time("18:30:00").map(|t| t.format("%H:%M").to_string()),
            Some("18:30".into())
        );
    }

    #[test]
    fn relative_past_and_future() {
        let now = parse_datetime("2024-03-10 12:00:00").unwrap();
        assert_eq!(relative(parse_datetime("2024-03-07 12:00:00").unwrap(), now), "3 days ago");
        assert_eq!(relative(parse_datetime("2024-03-10 14:00:00").unwrap(), now), "in 2 hours");
    }

    #[test]
    fn relative_date_keeps_exact_for_tooltip_and_export() {
        let options = options_at("2024-03-10 12:00:00");
        let at = parse_datetime("2024-03-07 12:00:00").unwrap();
        let f = format_datetime(at, Granularity::Relative, &options);
        assert_eq!(f.to_plain(), "2024-03-07 12:00");
        assert!(f.to_markup("—").contains("title=\"2024-03-07 12:00\""));
        assert!(f.to_markup("—").contains("3 days ago"));
    }

    #[test]
    fn calendar_dates_use_day_words() {
        let options = options_at("2024-03-10 12:00:00");
        let f = format_date(date("2024-03-11"), Granularity::Relative, &options);
        assert!(f.to_markup("—").contains("tomorrow"));
    }

    #[test]
    fn custom_patterns_apply() {
        let options = RenderOptions {
            date_format: "%d/%m/%Y".into(),
            datetime_format: "%d %b %Y, %H:%M".into(),
            time_format: "%Hh%M".into(),
            ..options_at("2024-03-10 12:00:00")
        };
        let at = parse_datetime("2024-03-07 09:30:00").unwrap();
        assert_eq!(format_date(at.date(), Granularity::Exact, &options).to_plain(), "07/03/2024");
        assert_eq!(
            format_datetime(at, Granularity::DateTime, &options).to_plain(),
            "07 Mar 2024, 09:30"
        );
        assert_eq!(format_time(at.time(), false, &options).to_plain(), "09h30");
    }

    #[test]
    fn unusable_patterns_fall_back_to_defaults() {
        assert!(!valid_pattern("%Q"));
        assert!(!valid_pattern("%Y-%"));
        assert!(valid_pattern(DEFAULT_DATETIME_FORMAT));

        let options = RenderOptions {
            date_format: "%Q".into(),
            datetime_format: "%Y-%m-%d %".into(),
            // parses, but a naive value has no offset to print
            time_format: "%H:%M %z".into(),
            ..options_at("2024-03-10 12:00:00")
        };
        let at = parse_datetime("2024-03-07 09:30:00").unwrap();
        assert_eq!(format_date(at.date(), Granularity::Exact, &options).to_plain(), "2024-03-07");
        assert_eq!(format_datetime(at, Granularity::Exact, &options).to_plain(), "2024-03-07");
        assert_eq!(
            format_datetime(at, Granularity::DateTime, &options).to_plain(),
            "2024-03-07 09:30"
        );
        assert_eq!(format_time(at.time(), false, &options).to_plain(), "09:30");

        let relative = format_date(at.date(), Granularity::Relative, &options);
        assert_eq!(relative.to_plain(), "2024-03-07");
        assert!(relative.to_markup("—").contains("3 days ago"));
    }

    #[test]
    fn twelve_hour_time() {
        let options = RenderOptions::default();
        let t = parse_time("18:05").unwrap();
        assert_eq!(format_time(t, true, &options).to_plain(), "6:05 PM");
        assert_eq!(format_time(t, false, &options).to_plain(), "18:05");
    }

    #[test]
    fn weekly_schedule_next_and_summary() {
        let schedule = Schedule::from_value(&json!({
            "frequency": "weekly", "interval": 1, "days": ["sun", "sat"],
            "start": "2024-03-02", "end": "2024-12-29"
        }))
        .unwrap();
        // 2024-03-13 is a Wednesday.
        assert_eq!(schedule.next_occurrence(date("2024-03-13")), Some(date("2024-03-16")));
        assert_eq!(schedule.next_occurrence(date("2025-01-01")), None);
        assert_eq!(
            schedule.summary(),
            "Every week on Sat, Sun from Mar 2, 2024 until Dec 29, 2024"
        );
    }

    #[test]
    fn fortnightly_schedule_skips_off_weeks() {
        let schedule = Schedule::from_value(&json!({
            "frequency": "weekly", "interval": 2, "start": "2024-03-04"
        }))
        .unwrap();
        // Mondays 2024-03-04, 03-18, 04-01...
        assert_eq!(schedule.next_occurrence(date("2024-03-05")), Some(date("2024-03-18")));
    }

    #[test]
    fn daily_and_monthly_schedules() {
        let daily = Schedule::from_value(&json!({
            "frequency": "daily", "interval": 3, "start": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(daily.next_occurrence(date("2024-01-05")), Some(date("2024-01-07")));
        assert_eq!(daily.next_occurrence(date("2023-06-01")), Some(date("2024-01-01")));

        let monthly =
            Schedule::from_value(&json!({"frequency": "monthly", "start": "2024-01-31"})).unwrap();
        assert_eq!(monthly.next_occurrence(date("2024-02-10")), Some(date("2024-02-29")));
    }

    #[test]
    fn malformed_schedules_do_not_parse() {
        let hourly = json!({"frequency": "hourly", "start": "2024-01-01"});
        assert!(Schedule::from_value(&hourly).is_none());
        assert!(Schedule::from_value(&json!({"frequency": "daily"})).is_none());
        assert!(Schedule::from_value(&json!("weekly")).is_none());
    }
}
