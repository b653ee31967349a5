//! ISO-8601 `P#Y#M#DT#H#M#S` relative duration arithmetic.
//!
//! Years and months are tracked independently of days because months have
//! variable length; per the spec, days never roll into months during
//! normalization (only the reverse direction — fractional days spilling into
//! hours — happens).

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Div, Mul, Neg};
use std::str::FromStr;

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<sign>-)?
        P
        (?:(?P<years>\d+(?:\.\d+)?)Y)?
        (?:(?P<months>\d+(?:\.\d+)?)M)?
        (?:(?P<days>\d+(?:\.\d+)?)D)?
        (?:T
            (?:(?P<hours>\d+(?:\.\d+)?)H)?
            (?:(?P<minutes>\d+(?:\.\d+)?)M)?
            (?:(?P<seconds>\d+(?:\.\d+)?)S)?
        )?
        $",
    )
    .expect("duration pattern is valid")
});

/// A canonicalized ISO-8601 relative duration.
///
/// After construction every sub-unit lies within its natural range —
/// `months` in `-11..=11`, `hours` in `-23..=23`, `minutes`/`seconds` in
/// `-59..=59` — except `days`, which does not roll into `months` because a
/// month's length in days is variable. Field signs follow the sign of the
/// quantity each was derived from (mirrors Rust's truncating `%`), so a
/// negative duration has every nonzero field negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeDuration {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: f64,
}

impl RelativeDuration {
    /// A zero-length duration.
    pub const ZERO: RelativeDuration = RelativeDuration {
        years: 0,
        months: 0,
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0.0,
    };

    /// Builds a duration from raw field values, applying the normalization
    /// rules described on the type.
    pub fn new(years: f64, months: f64, days: f64, hours: f64, minutes: f64, seconds: f64) -> Self {
        // Fractional spill, largest unit to smallest. Fractional months are
        // intentionally dropped rather than spilled into days, since days
        // must not roll into months (documented simplification — see
        // DESIGN.md).
        let months = months + years.fract() * 12.0;
        let years_whole = years.trunc();

        let hours = hours + days.fract() * 24.0;
        let days_whole = days.trunc();

        let minutes = minutes + hours.fract() * 60.0;
        let hours_whole = hours.trunc();

        let seconds = seconds + minutes.fract() * 60.0;
        let minutes_whole = minutes.trunc();

        let months_whole = months.trunc();

        // Roll up, smallest unit to largest (except days, which stop here).
        let sec_whole = seconds.trunc();
        let sec_frac = seconds - sec_whole;
        let (carry_min, sec_rem) = divmod_trunc(sec_whole as i64, 60);

        let (carry_hr, min_rem) = divmod_trunc(minutes_whole as i64 + carry_min, 60);
        let (carry_day, hr_rem) = divmod_trunc(hours_whole as i64 + carry_hr, 24);
        let days_final = days_whole as i64 + carry_day;

        let (carry_yr, mo_rem) = divmod_trunc(months_whole as i64, 12);
        let years_final = years_whole as i64 + carry_yr;

        RelativeDuration {
            years: years_final,
            months: mo_rem,
            days: days_final,
            hours: hr_rem,
            minutes: min_rem,
            seconds: sec_rem as f64 + sec_frac,
        }
    }

    /// Builds a duration directly from already-in-range field values with no
    /// normalization pass, used for date subtraction's "componentwise
    /// difference, no borrowing" semantics.
    pub fn from_raw_parts(
        years: i64,
        months: i64,
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
    ) -> Self {
        RelativeDuration {
            years,
            months,
            days,
            hours,
            minutes,
            seconds: seconds as f64,
        }
    }

    /// Total whole months (`years * 12 + months`), used for comparison.
    pub fn total_months(&self) -> i64 {
        self.years * 12 + self.months
    }

    /// Total seconds across days/hours/minutes/seconds, used for comparison.
    pub fn total_seconds(&self) -> f64 {
        (((self.days * 24 + self.hours) * 60 + self.minutes) as f64) * 60.0 + self.seconds
    }

    fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0.0
    }
}

fn divmod_trunc(total: i64, modulus: i64) -> (i64, i64) {
    (total / modulus, total % modulus)
}

impl Default for RelativeDuration {
    fn default() -> Self {
        RelativeDuration::ZERO
    }
}

impl PartialOrd for RelativeDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.total_months().cmp(&other.total_months()) {
            Ordering::Equal => self.total_seconds().partial_cmp(&other.total_seconds()),
            ord => Some(ord),
        }
    }
}

impl Neg for RelativeDuration {
    type Output = RelativeDuration;

    fn neg(self) -> Self::Output {
        RelativeDuration {
            years: -self.years,
            months: -self.months,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
        }
    }
}

impl Mul<f64> for RelativeDuration {
    type Output = RelativeDuration;

    fn mul(self, scalar: f64) -> Self::Output {
        RelativeDuration::new(
            self.years as f64 * scalar,
            self.months as f64 * scalar,
            self.days as f64 * scalar,
            self.hours as f64 * scalar,
            self.minutes as f64 * scalar,
            self.seconds * scalar,
        )
    }
}

impl Div<f64> for RelativeDuration {
    type Output = Result<RelativeDuration>;

    fn div(self, scalar: f64) -> Self::Output {
        if scalar == 0.0 {
            return Err(Error::Configuration(
                "cannot divide a duration by zero".to_owned(),
            ));
        }

        Ok(RelativeDuration::new(
            self.years as f64 / scalar,
            self.months as f64 / scalar,
            self.days as f64 / scalar,
            self.hours as f64 / scalar,
            self.minutes as f64 / scalar,
            self.seconds / scalar,
        ))
    }
}

impl fmt::Display for RelativeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "PT0S");
        }

        write!(f, "P")?;

        if self.years != 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }

        if self.hours != 0 || self.minutes != 0 || self.seconds != 0.0 {
            write!(f, "T")?;

            if self.hours != 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes != 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds != 0.0 {
                if self.seconds.fract() == 0.0 {
                    write!(f, "{}S", self.seconds as i64)?;
                } else {
                    write!(f, "{}S", self.seconds)?;
                }
            }
        }

        Ok(())
    }
}

impl FromStr for RelativeDuration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = DURATION_PATTERN.captures(s).ok_or_else(|| {
            Error::Configuration(format!("'{s}' is not a valid ISO-8601 duration"))
        })?;

        let field = |name: &str| -> f64 {
            caps.name(name)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        let has_any_field = ["years", "months", "days", "hours", "minutes", "seconds"]
            .iter()
            .any(|name| caps.name(name).is_some());

        if !has_any_field {
            return Err(Error::Configuration(format!(
                "'{s}' does not specify any duration components"
            )));
        }

        let sign = if caps.name("sign").is_some() { -1.0 } else { 1.0 };

        Ok(RelativeDuration::new(
            sign * field("years"),
            sign * field("months"),
            sign * field("days"),
            sign * field("hours"),
            sign * field("minutes"),
            sign * field("seconds"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_duration() {
        let d: RelativeDuration = "P1Y2M3DT4H5M6S".parse().unwrap();

        assert_eq!(d.years, 1);
        assert_eq!(d.months, 2);
        assert_eq!(d.days, 3);
        assert_eq!(d.hours, 4);
        assert_eq!(d.minutes, 5);
        assert_eq!(d.seconds, 6.0);
    }

    #[test]
    fn parses_time_only_duration() {
        let d: RelativeDuration = "PT1H30M".parse().unwrap();

        assert_eq!(d.hours, 1);
        assert_eq!(d.minutes, 30);
        assert_eq!(d.years, 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not a duration".parse::<RelativeDuration>().is_err());
    }

    #[test]
    fn seconds_roll_up_into_minutes_and_hours() {
        let d = RelativeDuration::new(0.0, 0.0, 0.0, 0.0, 0.0, 3700.0);

        assert_eq!(d.hours, 1);
        assert_eq!(d.minutes, 1);
        assert_eq!(d.seconds, 40.0);
    }

    #[test]
    fn days_do_not_roll_into_months() {
        let d = RelativeDuration::new(0.0, 0.0, 400.0, 0.0, 0.0, 0.0);

        assert_eq!(d.days, 400);
        assert_eq!(d.months, 0);
    }

    #[test]
    fn fractional_hours_spill_into_minutes() {
        let d = RelativeDuration::new(0.0, 0.0, 0.0, 1.5, 0.0, 0.0);

        assert_eq!(d.hours, 1);
        assert_eq!(d.minutes, 30);
    }

    #[test]
    fn comparison_is_months_then_seconds() {
        let a = RelativeDuration::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        let b = RelativeDuration::new(0.0, 0.0, 1000.0, 0.0, 0.0, 0.0);

        assert!(a > b, "a has more total months, so it's greater regardless of days");
    }

    #[test]
    fn negation_mirrors_every_field() {
        let d = RelativeDuration::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let n = -d;

        assert_eq!(n.years, -1);
        assert_eq!(n.months, -2);
        assert_eq!(n.days, -3);
        assert_eq!(n.hours, -4);
        assert_eq!(n.minutes, -5);
        assert_eq!(n.seconds, -6.0);
    }

    #[test]
    fn division_by_zero_fails() {
        let d = RelativeDuration::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        assert!((d / 0.0).is_err());
    }

    #[test]
    fn multiplication_scales_fields() {
        let d = RelativeDuration::new(0.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let doubled = d * 2.0;

        assert_eq!(doubled.hours, 4);
    }

    #[test]
    fn round_trips_through_display_and_parse() {
        let cases = [
            RelativeDuration::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0),
            RelativeDuration::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            RelativeDuration::new(0.0, 11.0, 0.0, 0.0, 0.0, 0.0),
        ];

        for d in cases {
            let text = d.to_string();
            let parsed: RelativeDuration = text.parse().unwrap();

            assert_eq!(d, parsed, "round-trip through {text:?} failed");
        }
    }

    #[test]
    fn zero_duration_displays_as_pt0s() {
        assert_eq!(RelativeDuration::ZERO.to_string(), "PT0S");
    }
}
