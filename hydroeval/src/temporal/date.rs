//! A calendar timestamp built from chained [`GroupMember`] pointers.
//!
//! Rather than back-pointers between chained units (month knows about year,
//! day knows about month, ...), each unit is an independent arena slot and
//! carries are resolved by an explicit pass run after every mutation. This
//! sidesteps the aliasing problems a "day holds a handle to its enclosing
//! month" design runs into in Rust.

use super::duration::RelativeDuration;
use super::group::{days_group, GroupMember, HOURS, MINUTES, MONTHS, SECONDS};
use std::cmp::Ordering;
use std::fmt;

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => unreachable!("month is always normalized to 1..=12"),
    }
}

/// A proleptic-Gregorian calendar timestamp, UTC-naive.
///
/// `month`, `day`, `hour`, `minute` and `second` are [`GroupMember`]s of
/// their respective [`FiniteGroup`](super::group::FiniteGroup)s; `year` is
/// unbounded so it is a plain counter rather than a group member.
///
/// The day-of-month anchor (`intended_day`) is tracked separately from the
/// displayed `day` value. When a month transition would push the day past
/// the new month's length, the displayed day is clamped; if a later
/// transition returns to a month long enough to hold the original day, it is
/// restored rather than staying clamped. This mirrors how a repeated
/// "add one month" operation behaves across a short month.
pub struct ClockworkDate {
    year: i64,
    month: GroupMember<u8>,
    intended_day: u8,
    day: GroupMember<u8>,
    hour: GroupMember<u8>,
    minute: GroupMember<u8>,
    second: GroupMember<u8>,
}

impl ClockworkDate {
    /// Builds a date from calendar fields. Any field may overflow its
    /// natural range (e.g. `hour = 36`); the overflow is decomposed and
    /// applied as carries across the chained units, the same as it would be
    /// after an arithmetic operation.
    pub fn new(year: i64, month: i64, day: i64, hour: i64, minute: i64, second: i64) -> Self {
        let (carry_min, sec) = divmod_floor(second, 60);
        let (carry_hr, min) = divmod_floor(minute + carry_min, 60);
        let (carry_day, hr) = divmod_floor(hour + carry_hr, 24);

        let (carry_yr, mo_zero_based) = divmod_floor(month - 1, 12);
        let mut year = year + carry_yr;
        let mut month = (mo_zero_based + 1) as u8;

        let mut day_total = day + carry_day;
        while day_total > days_in_month(year, month) as i64 {
            day_total -= days_in_month(year, month) as i64;
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        while day_total < 1 {
            month -= 1;
            if month < 1 {
                month = 12;
                year -= 1;
            }
            day_total += days_in_month(year, month) as i64;
        }

        let intended_day = day_total as u8;
        let dim = days_in_month(year, month);

        ClockworkDate {
            year,
            month: GroupMember::new(MONTHS.clone(), &month),
            intended_day,
            day: GroupMember::new(days_group(dim), &intended_day.min(dim)),
            hour: GroupMember::new(HOURS.clone(), &(hr as u8)),
            minute: GroupMember::new(MINUTES.clone(), &(min as u8)),
            second: GroupMember::new(SECONDS.clone(), &(sec as u8)),
        }
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn month(&self) -> u8 {
        *self.month.value()
    }

    pub fn day(&self) -> u8 {
        *self.day.value()
    }

    pub fn hour(&self) -> u8 {
        *self.hour.value()
    }

    pub fn minute(&self) -> u8 {
        *self.minute.value()
    }

    pub fn second(&self) -> u8 {
        *self.second.value()
    }

    /// Returns a new date shifted by `duration`.
    ///
    /// Calendar units (years, months) are applied first, using the
    /// day-of-month anchor/restoration rule described on the type; sub-
    /// calendar units (days, hours, minutes, seconds) are then applied as
    /// plain carries, which also updates the anchor — an explicit add of
    /// days moves the intended day-of-month, not just its clamped display.
    pub fn add(&self, duration: &RelativeDuration) -> ClockworkDate {
        let month_shift = duration.years * 12 + duration.months;
        let zero_based = (self.month() as i64 - 1) + month_shift;
        let year = self.year + zero_based.div_euclid(12);
        let month = (zero_based.rem_euclid(12) + 1) as u8;

        let dim = days_in_month(year, month);
        let effective_day = self.intended_day.min(dim);

        let mut result = ClockworkDate {
            year,
            month: GroupMember::new(MONTHS.clone(), &month),
            intended_day: self.intended_day,
            day: GroupMember::new(days_group(dim), &effective_day),
            hour: GroupMember::new(HOURS.clone(), &self.hour()),
            minute: GroupMember::new(MINUTES.clone(), &self.minute()),
            second: GroupMember::new(SECONDS.clone(), &self.second()),
        };

        result.shift_time(duration.days, duration.hours, duration.minutes, duration.seconds.trunc() as i64);
        result
    }

    /// Applies explicit sub-calendar shifts, updating the day-of-month
    /// anchor to match since these are direct day-level adds rather than a
    /// month/year transition.
    fn shift_time(&mut self, days: i64, hours: i64, minutes: i64, seconds: i64) {
        let total_seconds = ((hours * 3600) + (minutes * 60) + seconds) + self.second() as i64
            + self.minute() as i64 * 60
            + self.hour() as i64 * 3600;
        let (carry_min, sec) = divmod_floor(total_seconds, 60);
        let (carry_hr, min) = divmod_floor(carry_min, 60);
        let (carry_day, hr) = divmod_floor(carry_hr, 24);

        let mut year = self.year;
        let mut month = self.month();
        let mut day_total = self.day() as i64 + days + carry_day;

        while day_total > days_in_month(year, month) as i64 {
            day_total -= days_in_month(year, month) as i64;
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        while day_total < 1 {
            month -= 1;
            if month < 1 {
                month = 12;
                year -= 1;
            }
            day_total += days_in_month(year, month) as i64;
        }

        let dim = days_in_month(year, month);

        self.year = year;
        self.month = GroupMember::new(MONTHS.clone(), &month);
        self.intended_day = day_total as u8;
        self.day = GroupMember::new(days_group(dim), &(day_total as u8));
        self.hour = GroupMember::new(HOURS.clone(), &(hr as u8));
        self.minute = GroupMember::new(MINUTES.clone(), &(min as u8));
        self.second = GroupMember::new(SECONDS.clone(), &(sec as u8));
    }

    /// Subtracts `other`, returning a [`RelativeDuration`] of componentwise
    /// field differences. Unlike [`ClockworkDate::add`], this performs no
    /// borrowing between units — a negative month difference is returned as
    /// a negative `months` field rather than resolved against `years`.
    pub fn sub(&self, other: &ClockworkDate) -> RelativeDuration {
        RelativeDuration::from_raw_parts(
            self.year - other.year,
            self.month() as i64 - other.month() as i64,
            self.day() as i64 - other.day() as i64,
            self.hour() as i64 - other.hour() as i64,
            self.minute() as i64 - other.minute() as i64,
            self.second() as i64 - other.second() as i64,
        )
    }
}

fn divmod_floor(total: i64, modulus: i64) -> (i64, i64) {
    (total.div_euclid(modulus), total.rem_euclid(modulus))
}

impl Clone for ClockworkDate {
    fn clone(&self) -> Self {
        ClockworkDate::new(
            self.year,
            self.month() as i64,
            self.day() as i64,
            self.hour() as i64,
            self.minute() as i64,
            self.second() as i64,
        )
    }
}

impl fmt::Debug for ClockworkDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClockworkDate({:04}-{:02}-{:02}T{:02}:{:02}:{:02})",
            self.year,
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

impl fmt::Display for ClockworkDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year,
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

fn tuple(d: &ClockworkDate) -> (i64, u8, u8, u8, u8, u8) {
    (d.year, d.month(), d.day(), d.hour(), d.minute(), d.second())
}

impl PartialEq for ClockworkDate {
    fn eq(&self, other: &Self) -> bool {
        tuple(self) == tuple(other)
    }
}

impl Eq for ClockworkDate {}

impl PartialOrd for ClockworkDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClockworkDate {
    fn cmp(&self, other: &Self) -> Ordering {
        tuple(self).cmp(&tuple(other))
    }
}
