use std::convert::TryFrom;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, TimeZone, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

use crate::language::Language;
use crate::ontology::*;

use super::numbers::{ordinal_at, parse_digits};
use super::quantities::duration_at;
use super::RuleMatch;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

lazy_static! {
    static ref HOUR_REGEX: Regex = Regex::new(r"^(\d{1,2})(am|pm)?$").unwrap();
    static ref MINUTE_REGEX: Regex = Regex::new(r"^(\d{2})(am|pm)?$").unwrap();
    static ref YEAR_REGEX: Regex = Regex::new(r"^\d{4}$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    fn from_token(s: &str) -> Option<Self> {
        match s {
            "am" => Some(Meridiem::Am),
            "pm" => Some(Meridiem::Pm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TimeOfDay {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
    grain: Grain,
}

impl TimeOfDay {
    /// Possible hours on a 24 hours clock, the morning reading first
    fn candidate_hours(&self) -> Vec<u32> {
        match self.meridiem {
            Some(Meridiem::Am) => vec![self.hour % 12],
            Some(Meridiem::Pm) => vec![self.hour % 12 + 12],
            None if self.hour == 12 => vec![12, 0],
            None if self.hour >= 1 && self.hour < 12 => vec![self.hour, self.hour + 12],
            None => vec![self.hour],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Moment {
    day: Option<NaiveDate>,
    time: Option<TimeOfDay>,
}

type DatetimeMatch = (usize, SlotValue, Vec<SlotValue>);

/// Resolves english date and time expressions relatively to a reference time
struct DatetimeParser<'a> {
    tokens: &'a [String],
    reference: DateTime<FixedOffset>,
    today: NaiveDate,
}

pub fn datetimes(
    tokens: &[String],
    language: Language,
    reference: DateTime<FixedOffset>,
) -> Vec<RuleMatch> {
    if language != Language::EN {
        return vec![];
    }
    let parser = DatetimeParser {
        tokens,
        reference,
        today: reference.naive_local().date(),
    };
    (0..tokens.len())
        .filter_map(|start| {
            parser.datetime_at(start).map(|(end, value, alternatives)| {
                RuleMatch::new(start..end, BuiltinEntityKind::Datetime, value)
                    .with_alternatives(alternatives)
            })
        })
        .collect()
}

fn format_datetime(datetime: &DateTime<FixedOffset>) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

fn instant(datetime: &DateTime<FixedOffset>, grain: Grain) -> SlotValue {
    SlotValue::InstantTime(InstantTimeValue {
        value: format_datetime(datetime),
        grain,
        precision: Precision::Exact,
    })
}

fn interval(from: Option<DateTime<FixedOffset>>, to: Option<DateTime<FixedOffset>>) -> SlotValue {
    SlotValue::TimeInterval(TimeIntervalValue {
        from: from.as_ref().map(format_datetime),
        to: to.as_ref().map(format_datetime),
    })
}

fn weekday_from_str(token: &str) -> Option<Weekday> {
    match token {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn month_from_str(token: &str) -> Option<u32> {
    let month = match token {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn part_of_day_hours(token: &str) -> Option<(u32, u32)> {
    match token {
        "morning" => Some((4, 12)),
        "afternoon" => Some((12, 19)),
        "evening" | "night" => Some((18, 24)),
        _ => None,
    }
}

impl<'a> DatetimeParser<'a> {
    fn token(&self, index: usize) -> &str {
        self.tokens.get(index).map(|t| t.as_str()).unwrap_or("")
    }

    fn at(&self, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<FixedOffset>> {
        let naive = if hour == 24 {
            (date + Duration::days(1)).and_hms_opt(0, minute, 0)?
        } else {
            date.and_hms_opt(hour, minute, 0)?
        };
        self.reference.offset().from_local_datetime(&naive).single()
    }

    fn datetime_at(&self, index: usize) -> Option<DatetimeMatch> {
        let candidates = vec![
            self.interval_at(index),
            self.relative_at(index),
            self.weekend_at(index),
            self.part_of_day_at(index),
            self.instant_at(index),
        ];
        let mut best: Option<DatetimeMatch> = None;
        for candidate in candidates.into_iter().flatten() {
            let is_longer = best
                .as_ref()
                .map(|(best_end, _, _)| candidate.0 > *best_end)
                .unwrap_or(true);
            if is_longer {
                best = Some(candidate);
            }
        }
        best
    }

    fn day_at(&self, index: usize) -> Option<(usize, NaiveDate)> {
        match self.token(index) {
            "today" => Some((index + 1, self.today)),
            "tomorrow" => Some((index + 1, self.today + Duration::days(1))),
            "yesterday" => Some((index + 1, self.today - Duration::days(1))),
            "the"
                if self.token(index + 1) == "day"
                    && self.token(index + 2) == "after"
                    && self.token(index + 3) == "tomorrow" =>
            {
                Some((index + 4, self.today + Duration::days(2)))
            }
            "on" => self.day_at(index + 1),
            "next" => self.weekday_at(index + 1, true),
            "this" => self.weekday_at(index + 1, false),
            _ => self
                .weekday_at(index, false)
                .or_else(|| self.date_at(index)),
        }
    }

    fn weekday_at(&self, index: usize, strictly_after_today: bool) -> Option<(usize, NaiveDate)> {
        let weekday = weekday_from_str(self.token(index))?;
        let mut days_ahead = (weekday.num_days_from_monday() + 7
            - self.today.weekday().num_days_from_monday())
            % 7;
        if strictly_after_today && days_ahead == 0 {
            days_ahead = 7;
        }
        Some((index + 1, self.today + Duration::days(days_ahead as i64)))
    }

    fn day_of_month_at(&self, index: usize) -> Option<(usize, u32)> {
        let (end, day) = ordinal_at(self.tokens, index, Language::EN).or_else(|| {
            parse_digits(self.token(index))
                .filter(|value| value.fract() == 0.)
                .map(|value| (index + 1, value as i64))
        })?;
        if day >= 1 && day <= 31 {
            Some((end, day as u32))
        } else {
            None
        }
    }

    fn year_at(&self, index: usize) -> (usize, Option<i32>) {
        if YEAR_REGEX.is_match(self.token(index)) {
            (index + 1, self.token(index).parse().ok())
        } else {
            (index, None)
        }
    }

    /// Parses "january 5th", "5th of january" and "the 5th of january 2019"
    fn date_at(&self, index: usize) -> Option<(usize, NaiveDate)> {
        let (end, month, day) = if let Some(month) = month_from_str(self.token(index)) {
            let (end, day) = self.day_of_month_at(index + 1)?;
            (end, month, day)
        } else {
            let day_index = if self.token(index) == "the" {
                index + 1
            } else {
                index
            };
            let (mut end, day) = self.day_of_month_at(day_index)?;
            if self.token(end) == "of" {
                end += 1;
            }
            let month = month_from_str(self.token(end))?;
            (end + 1, month, day)
        };
        let (end, year) = self.year_at(end);
        let date = match year {
            Some(year) => NaiveDate::from_ymd_opt(year, month, day)?,
            None => {
                let this_year = NaiveDate::from_ymd_opt(self.today.year(), month, day)?;
                if this_year < self.today {
                    NaiveDate::from_ymd_opt(self.today.year() + 1, month, day)?
                } else {
                    this_year
                }
            }
        };
        Some((end, date))
    }

    /// Parses a time of day such as "at 9", "9am", "9:30 pm" or "noon"
    ///
    /// A bare hour is only accepted when `allow_bare` is set.
    fn time_of_day_at(&self, index: usize, allow_bare: bool) -> Option<(usize, TimeOfDay)> {
        let (mut end, has_prefix) = if self.token(index) == "at" {
            (index + 1, true)
        } else {
            (index, false)
        };
        match self.token(end) {
            "noon" | "midday" => {
                return Some((
                    end + 1,
                    TimeOfDay {
                        hour: 12,
                        minute: 0,
                        meridiem: Some(Meridiem::Pm),
                        grain: Grain::Hour,
                    },
                ))
            }
            "midnight" => {
                return Some((
                    end + 1,
                    TimeOfDay {
                        hour: 12,
                        minute: 0,
                        meridiem: Some(Meridiem::Am),
                        grain: Grain::Hour,
                    },
                ))
            }
            _ => (),
        }
        let hour_captures = HOUR_REGEX.captures(self.token(end))?;
        let hour: u32 = hour_captures[1].parse().ok()?;
        let mut meridiem = hour_captures.get(2).and_then(|m| Meridiem::from_token(m.as_str()));
        end += 1;

        let mut minute = None;
        if self.token(end) == ":" {
            if let Some(minute_captures) = MINUTE_REGEX.captures(self.token(end + 1)) {
                minute = minute_captures[1].parse::<u32>().ok();
                meridiem = meridiem.or_else(|| {
                    minute_captures
                        .get(2)
                        .and_then(|m| Meridiem::from_token(m.as_str()))
                });
                end += 2;
            }
        }
        if meridiem.is_none() {
            if let Some(parsed) = Meridiem::from_token(self.token(end)) {
                meridiem = Some(parsed);
                end += 1;
            }
        }
        let has_oclock = self.token(end) == "o"
            && self.token(end + 1) == "'"
            && self.token(end + 2) == "clock";
        if has_oclock {
            end += 3;
        }

        let is_explicit = has_prefix || has_oclock || minute.is_some() || meridiem.is_some();
        if !is_explicit && !allow_bare {
            return None;
        }
        let valid_hour = match meridiem {
            Some(_) => hour >= 1 && hour <= 12,
            None => hour <= 23,
        };
        if !valid_hour || minute.map(|m| m > 59).unwrap_or(false) {
            return None;
        }
        Some((
            end,
            TimeOfDay {
                hour,
                minute: minute.unwrap_or(0),
                meridiem,
                grain: if minute.is_some() {
                    Grain::Minute
                } else {
                    Grain::Hour
                },
            },
        ))
    }

    fn moment_at(&self, index: usize, allow_bare: bool) -> Option<(usize, Moment)> {
        if let Some((end, day)) = self.day_at(index) {
            let (end, time) = match self.time_of_day_at(end, false) {
                Some((time_end, time)) => (time_end, Some(time)),
                None => (end, None),
            };
            return Some((
                end,
                Moment {
                    day: Some(day),
                    time,
                },
            ));
        }
        let (end, time) = self.time_of_day_at(index, allow_bare)?;
        let (end, day) = match self.day_at(end) {
            Some((day_end, day)) => (day_end, Some(day)),
            None => (end, None),
        };
        Some((
            end,
            Moment {
                day,
                time: Some(time),
            },
        ))
    }

    /// Returns the possible datetimes of a moment, the preferred one first
    fn resolve_moment(&self, moment: &Moment) -> Option<(Vec<DateTime<FixedOffset>>, Grain)> {
        match (moment.day, moment.time) {
            (Some(day), None) => Some((vec![self.at(day, 0, 0)?], Grain::Day)),
            (Some(day), Some(time)) => {
                let datetimes = time
                    .candidate_hours()
                    .into_iter()
                    .map(|hour| self.at(day, hour, time.minute))
                    .collect::<Option<Vec<_>>>()?;
                Some((datetimes, time.grain))
            }
            (None, Some(time)) => {
                let mut datetimes = time
                    .candidate_hours()
                    .into_iter()
                    .map(|hour| {
                        let datetime = self.at(self.today, hour, time.minute)?;
                        if datetime < self.reference {
                            self.at(self.today + Duration::days(1), hour, time.minute)
                        } else {
                            Some(datetime)
                        }
                    })
                    .collect::<Option<Vec<_>>>()?;
                datetimes.sort();
                Some((datetimes, time.grain))
            }
            (None, None) => None,
        }
    }

    fn instant_at(&self, index: usize) -> Option<DatetimeMatch> {
        let (end, moment) = self.moment_at(index, false)?;
        let (datetimes, grain) = self.resolve_moment(&moment)?;
        let mut values = datetimes.iter().map(|datetime| instant(datetime, grain));
        let value = values.next()?;
        Some((end, value, values.collect()))
    }

    fn shift(
        &self,
        duration: &DurationValue,
        forward: bool,
    ) -> Option<DateTime<FixedOffset>> {
        let months = duration
            .years
            .checked_mul(12)?
            .checked_add(duration.quarters.checked_mul(3)?)?
            .checked_add(duration.months)?;
        let mut datetime = self.reference;
        if months > 0 {
            let months = Months::new(u32::try_from(months).ok()?);
            datetime = if forward {
                datetime.checked_add_months(months)?
            } else {
                datetime.checked_sub_months(months)?
            };
        }
        let delta = [
            Duration::try_weeks(duration.weeks)?,
            Duration::try_days(duration.days)?,
            Duration::try_hours(duration.hours)?,
            Duration::try_minutes(duration.minutes)?,
            Duration::try_seconds(duration.seconds)?,
        ]
        .iter()
        .try_fold(Duration::zero(), |total, part| total.checked_add(part))?;
        if forward {
            datetime.checked_add_signed(delta)
        } else {
            datetime.checked_sub_signed(delta)
        }
    }

    /// Parses "now", "in 2 hours", "3 days ago" and "10 minutes from now"
    fn relative_at(&self, index: usize) -> Option<DatetimeMatch> {
        if self.token(index) == "now" {
            return Some((index + 1, instant(&self.reference, Grain::Second), vec![]));
        }
        if self.token(index) == "in" {
            let (end, grain, duration) = duration_at(self.tokens, index + 1, Language::EN)?;
            let datetime = self.shift(&duration, true)?;
            return Some((end, instant(&datetime, grain), vec![]));
        }
        let (end, grain, duration) = duration_at(self.tokens, index, Language::EN)?;
        match (self.token(end), self.token(end + 1)) {
            ("ago", _) => {
                let datetime = self.shift(&duration, false)?;
                Some((end + 1, instant(&datetime, grain), vec![]))
            }
            ("from", "now") => {
                let datetime = self.shift(&duration, true)?;
                Some((end + 2, instant(&datetime, grain), vec![]))
            }
            _ => None,
        }
    }

    fn weekend_at(&self, index: usize) -> Option<DatetimeMatch> {
        let end = match (self.token(index), self.token(index + 1)) {
            ("this", "weekend") | ("the", "weekend") => index + 2,
            ("weekend", _) => index + 1,
            _ => return None,
        };
        let days_to_saturday = match self.today.weekday() {
            Weekday::Sun => -1,
            weekday => 5 - weekday.num_days_from_monday() as i64,
        };
        let saturday = self.today + Duration::days(days_to_saturday);
        let from = self.at(saturday, 0, 0)?;
        let to = self.at(saturday + Duration::days(2), 0, 0)?;
        Some((end, interval(Some(from), Some(to)), vec![]))
    }

    /// Parses "tonight", "this morning" or "tomorrow evening"
    fn part_of_day_at(&self, index: usize) -> Option<DatetimeMatch> {
        let (end, day, (start_hour, end_hour)) = if self.token(index) == "tonight" {
            (index + 1, self.today, (18, 24))
        } else if self.token(index) == "this" {
            (
                index + 2,
                self.today,
                part_of_day_hours(self.token(index + 1))?,
            )
        } else {
            let (day_end, day) = self.day_at(index)?;
            (day_end + 1, day, part_of_day_hours(self.token(day_end))?)
        };
        let from = self.at(day, start_hour, 0)?;
        let to = self.at(day, end_hour, 0)?;
        Some((end, interval(Some(from), Some(to)), vec![]))
    }

    /// Parses "from 9 to 11am", "between monday and friday", "until 5pm" and "after noon"
    fn interval_at(&self, index: usize) -> Option<DatetimeMatch> {
        match self.token(index) {
            "from" | "between" => {
                let (from_end, from_moment) = self.moment_at(index + 1, true)?;
                let separator_ok = match (self.token(index), self.token(from_end)) {
                    ("from", "to") | ("from", "till") | ("from", "until") | ("from", "-") => true,
                    ("between", "and") => true,
                    _ => false,
                };
                if !separator_ok {
                    return None;
                }
                let (end, to_moment) = self.moment_at(from_end + 1, true)?;
                let (from, to) = self.resolve_interval(from_moment, to_moment)?;
                Some((end, interval(Some(from), Some(to)), vec![]))
            }
            "until" | "till" | "before" => {
                let (end, moment) = self.moment_at(index + 1, false)?;
                let (datetimes, _) = self.resolve_moment(&moment)?;
                Some((end, interval(None, datetimes.first().cloned()), vec![]))
            }
            "after" | "since" => {
                let (end, moment) = self.moment_at(index + 1, false)?;
                let (datetimes, _) = self.resolve_moment(&moment)?;
                Some((end, interval(datetimes.first().cloned(), None), vec![]))
            }
            _ => None,
        }
    }

    fn resolve_interval(
        &self,
        from_moment: Moment,
        to_moment: Moment,
    ) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let from_time = match (from_moment.time, to_moment.time) {
            (Some(from_time), Some(to_time)) if from_time.meridiem.is_none() => {
                Some(TimeOfDay {
                    meridiem: to_time.meridiem,
                    ..from_time
                })
            }
            (from_time, _) => from_time,
        };
        let from_moment = Moment {
            day: from_moment.day.or(to_moment.day),
            time: from_time,
        };
        let (from_datetimes, _) = self.resolve_moment(&from_moment)?;
        let from = *from_datetimes.first()?;
        let to = match to_moment.time {
            None => self.at(to_moment.day? + Duration::days(1), 0, 0)?,
            Some(to_time) => {
                let to_day = to_moment.day.unwrap_or_else(|| from.naive_local().date());
                let same_day_candidate = to_time
                    .candidate_hours()
                    .into_iter()
                    .filter_map(|hour| self.at(to_day, hour, to_time.minute))
                    .filter(|datetime| *datetime > from)
                    .min();
                match same_day_candidate {
                    Some(datetime) => datetime,
                    None => {
                        let hour = *to_time.candidate_hours().first()?;
                        self.at(to_day + Duration::days(1), hour, to_time.minute)?
                    }
                }
            }
        };
        Some((from, to))
    }
}
