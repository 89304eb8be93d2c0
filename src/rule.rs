use std::{
    ops::{Range, RangeInclusive},
    sync::Arc,
};

use jiff::{Span, ToSpan, civil::Weekday};

use crate::{
    byday::ByDay,
    daycode::{DayCode, weekday_from_day_code},
    error::Error,
    recur::{Recur, Until},
};

/// A normalized RFC 5545 recurrence rule.
///
/// A rule describes *how* something repeats, but not *from where*. The
/// starting point comes from the event a rule is attached to. See
/// [`Schedule`](crate::Schedule) for expanding a rule into occurrences.
///
/// A rule is immutable once built. It can be obtained by translating a
/// [`Recur`] value (see [`RecurrenceRule::from_recur`]), by parsing RRULE
/// text, or via [`RecurrenceRule::builder`]. Cloning is cheap.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecurrenceRule {
    inner: Arc<RecurrenceRuleInner>,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) struct RecurrenceRuleInner {
    pub(crate) freq: Frequency,
    pub(crate) interval: i32,
    pub(crate) bound: Option<Bound>,
    pub(crate) by_month: Box<[i8]>,
    // can be negative
    pub(crate) by_year_day: Box<[i16]>,
    pub(crate) by_day: Option<ByDay>,
    pub(crate) by_hour: Box<[i8]>,
    pub(crate) by_minute: Box<[i8]>,
    pub(crate) by_second: Box<[i8]>,
    pub(crate) week_start: Weekday,
}

impl RecurrenceRule {
    /// Returns a builder for constructing a `RecurrenceRule`.
    ///
    /// The frequency is the only thing required to create a rule.
    pub fn builder(freq: Frequency) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder::new(freq)
    }

    /// Translates a raw RRULE value into a normalized rule.
    ///
    /// Only FREQ, INTERVAL, COUNT, UNTIL, WKST, BYDAY, BYHOUR, BYMINUTE,
    /// BYSECOND, BYMONTH and BYYEARDAY are used. Any other rule part is
    /// ignored.
    ///
    /// # Errors
    ///
    /// This returns an error when FREQ is missing or unrecognized, when COUNT
    /// and UNTIL are both present, or when any value is outside of its valid
    /// range. A rule is never partially translated.
    pub fn from_recur(recur: &Recur) -> Result<RecurrenceRule, Error> {
        let Some(ref freq) = recur.freq else {
            return Err(Error::MissingFrequency);
        };
        let mut b = RecurrenceRule::builder(freq.parse()?);
        if let Some(interval) = recur.interval {
            b.interval(interval);
        }
        if let Some(count) = recur.count {
            b.count(count);
        }
        if let Some(until) = recur.until {
            b.until(until);
        }
        if let Some(ref code) = recur.week_start {
            b.week_start(weekday_from_day_code(code)?);
        }
        b.by_hour(&*recur.by_hour)
            .by_minute(&*recur.by_minute)
            .by_second(&*recur.by_second)
            .by_month(&*recur.by_month)
            .by_year_day(&*recur.by_year_day);
        if !recur.by_day.is_empty() {
            b.by_day(ByDay::from_tokens(&recur.by_day)?);
        }
        for (name, value) in recur.other.iter() {
            log::debug!("ignoring unsupported recurrence rule part `{name}={value}`");
        }
        b.build()
    }

    /// The frequency at which periods repeat.
    pub fn frequency(&self) -> Frequency {
        self.inner.freq
    }

    /// The number of frequency units between each period. At least `1`.
    pub fn interval(&self) -> i32 {
        self.inner.interval
    }

    /// Returns the COUNT or UNTIL bound, if one was given.
    pub fn bound(&self) -> Option<&Bound> {
        self.inner.bound.as_ref()
    }

    /// Returns the COUNT, if one was given.
    pub fn count(&self) -> Option<u32> {
        match self.inner.bound {
            Some(Bound::Count(count)) => Some(count),
            _ => None,
        }
    }

    /// Returns the UNTIL, if one was given.
    pub fn until(&self) -> Option<Until> {
        match self.inner.bound {
            Some(Bound::Until(until)) => Some(until),
            _ => None,
        }
    }

    /// Returns the BYDAY weekdays, exactly as they were given.
    pub fn by_day(&self) -> Option<&ByDay> {
        self.inner.by_day.as_ref()
    }

    /// Returns the sorted BYHOUR values, if any.
    pub fn by_hour(&self) -> Option<&[i8]> {
        non_empty(&self.inner.by_hour)
    }

    /// Returns the sorted BYMINUTE values, if any.
    pub fn by_minute(&self) -> Option<&[i8]> {
        non_empty(&self.inner.by_minute)
    }

    /// Returns the sorted BYSECOND values, if any.
    pub fn by_second(&self) -> Option<&[i8]> {
        non_empty(&self.inner.by_second)
    }

    /// Returns the sorted BYMONTH values, if any.
    pub fn by_month(&self) -> Option<&[i8]> {
        non_empty(&self.inner.by_month)
    }

    /// Returns the sorted BYYEARDAY values, if any. Negative values count
    /// back from the end of the year.
    pub fn by_year_day(&self) -> Option<&[i16]> {
        non_empty(&self.inner.by_year_day)
    }

    /// The weekday on which weeks start. Monday unless WKST says otherwise.
    pub fn week_start(&self) -> Weekday {
        self.inner.week_start
    }

    pub(crate) fn inner(&self) -> &RecurrenceRuleInner {
        &self.inner
    }
}

impl TryFrom<&Recur> for RecurrenceRule {
    type Error = Error;

    fn try_from(recur: &Recur) -> Result<RecurrenceRule, Error> {
        RecurrenceRule::from_recur(recur)
    }
}

impl std::str::FromStr for RecurrenceRule {
    type Err = Error;

    /// Parses RRULE value text, e.g., `FREQ=WEEKLY;BYDAY=TU,TH;COUNT=10`.
    fn from_str(s: &str) -> Result<RecurrenceRule, Error> {
        RecurrenceRule::from_recur(&s.parse()?)
    }
}

impl std::fmt::Display for RecurrenceRule {
    /// Writes this rule as canonical RRULE value text.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        fn list<T: std::fmt::Display>(
            f: &mut std::fmt::Formatter,
            name: &str,
            values: &[T],
        ) -> std::fmt::Result {
            if values.is_empty() {
                return Ok(());
            }
            write!(f, ";{name}=")?;
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }

        let r = &self.inner;
        write!(f, "FREQ={}", r.freq)?;
        if r.interval != 1 {
            write!(f, ";INTERVAL={}", r.interval)?;
        }
        match r.bound {
            None => {}
            Some(Bound::Count(count)) => write!(f, ";COUNT={count}")?,
            Some(Bound::Until(until)) => write!(f, ";UNTIL={until}")?,
        }
        list(f, "BYMONTH", &r.by_month)?;
        list(f, "BYYEARDAY", &r.by_year_day)?;
        if let Some(ref by_day) = r.by_day {
            write!(f, ";BYDAY={by_day}")?;
        }
        list(f, "BYHOUR", &r.by_hour)?;
        list(f, "BYMINUTE", &r.by_minute)?;
        list(f, "BYSECOND", &r.by_second)?;
        if r.week_start != Weekday::Monday {
            write!(f, ";WKST={}", DayCode::from_weekday(r.week_start))?;
        }
        Ok(())
    }
}

impl serde::Serialize for RecurrenceRule {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for RecurrenceRule {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<RecurrenceRule, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The termination condition of a recurrence rule.
///
/// RFC 5545 permits at most one of COUNT and UNTIL.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Bound {
    /// Stop after this many occurrences, counted from the event start.
    Count(u32),
    /// Stop after this point in time (inclusive).
    Until(Until),
}

/// A builder for constructing a valid recurrence rule.
///
/// Values are collected as given and only validated by `build`.
#[derive(Clone, Debug)]
pub struct RecurrenceRuleBuilder {
    freq: Frequency,
    interval: i64,
    count: Option<i64>,
    until: Option<Until>,
    by_month: Vec<i64>,
    by_year_day: Vec<i64>,
    by_day: Option<ByDay>,
    by_hour: Vec<i64>,
    by_minute: Vec<i64>,
    by_second: Vec<i64>,
    week_start: Weekday,
}

impl RecurrenceRuleBuilder {
    fn new(freq: Frequency) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder {
            freq,
            interval: 1,
            count: None,
            until: None,
            by_month: vec![],
            by_year_day: vec![],
            by_day: None,
            by_hour: vec![],
            by_minute: vec![],
            by_second: vec![],
            week_start: Weekday::Monday,
        }
    }

    pub fn build(&self) -> Result<RecurrenceRule, Error> {
        fn sort_and_dedup<T: TryFrom<i64> + Clone + Ord>(
            slice: &[i64],
        ) -> Box<[T]> {
            // Every value has been range checked by this point, so none of
            // them are dropped by the conversion.
            let mut vec = slice
                .iter()
                .filter_map(|&v| T::try_from(v).ok())
                .collect::<Vec<T>>();
            vec.sort();
            vec.dedup();
            vec.into_boxed_slice()
        }

        let interval = i32::try_from(self.interval)
            .ok()
            .filter(|&interval| interval >= 1)
            .ok_or(Error::InvalidInterval { interval: self.interval })?;
        // Makes sure multiplying out the interval works at least once. It
        // might still overflow later, but that just ends iteration.
        if self.freq.to_span(interval).is_err() {
            return Err(Error::InvalidInterval { interval: self.interval });
        }
        let bound = match (self.count, self.until) {
            (Some(_), Some(_)) => return Err(Error::ConflictingBound),
            (Some(count), None) => Some(Bound::Count(
                u32::try_from(count)
                    .ok()
                    .filter(|&count| count >= 1)
                    .ok_or(Error::InvalidCount { count })?,
            )),
            (None, Some(until)) => Some(Bound::Until(until)),
            (None, None) => None,
        };
        for &v in self.by_month.iter() {
            if !(1 <= v && v <= 12) {
                return Err(Error::InvalidMonth(v));
            }
        }
        for &v in self.by_year_day.iter() {
            if !((-366 <= v && v <= -1) || (1 <= v && v <= 366)) {
                return Err(Error::InvalidYearDay(v));
            }
        }
        for &v in self.by_hour.iter() {
            if !(0 <= v && v <= 23) {
                return Err(Error::InvalidHour(v));
            }
        }
        for &v in self.by_minute.iter() {
            if !(0 <= v && v <= 59) {
                return Err(Error::InvalidMinute(v));
            }
        }
        for &v in self.by_second.iter() {
            // RFC 5545 technically allows a value of `60` here, presumably
            // for leap seconds. Jiff doesn't support leap seconds outside of
            // parsing, so we reject it. This is also what `python-dateutil`
            // does.
            if !(0 <= v && v <= 59) {
                return Err(Error::InvalidSecond(v));
            }
        }
        if let Some(ByDay::PositionalDays(ref days)) = self.by_day {
            for (weekday, positions) in days.iter() {
                for &nth in positions.iter() {
                    self.check_numbered_weekday(nth, weekday)?;
                }
            }
        }

        let inner = Arc::new(RecurrenceRuleInner {
            freq: self.freq,
            interval,
            bound,
            by_month: sort_and_dedup(&self.by_month),
            by_year_day: sort_and_dedup(&self.by_year_day),
            by_day: self.by_day.as_ref().map(ByDay::normalize),
            by_hour: sort_and_dedup(&self.by_hour),
            by_minute: sort_and_dedup(&self.by_minute),
            by_second: sort_and_dedup(&self.by_second),
            week_start: self.week_start,
        });
        Ok(RecurrenceRule { inner })
    }

    /// Checks that a numbered weekday makes sense for this rule.
    fn check_numbered_weekday(
        &self,
        nth: i8,
        weekday: Weekday,
    ) -> Result<(), Error> {
        let err = |reason: &'static str| Error::InvalidBydayPosition {
            day: format!("{nth}{}", DayCode::from_weekday(weekday)),
            freq: self.freq,
            reason,
        };
        // Firstly, numbered weekdays are only allowed for YEARLY or MONTHLY
        // frequencies.
        if !matches!(self.freq, Frequency::Yearly | Frequency::Monthly) {
            return Err(err(
                "numbered weekdays are only allowed at \
                 yearly or monthly frequencies",
            ));
        }
        // Secondly, check the bounds on `nth`. It's yearly when the frequency
        // is yearly and BYMONTH isn't set. Otherwise, it's monthly.
        if matches!(self.freq, Frequency::Yearly) && self.by_month.is_empty() {
            if !((-53 <= nth && nth <= -1) || (1 <= nth && nth <= 53)) {
                return Err(err("values must be in range 1..=53 or -53..=-1"));
            }
        } else if !((-5 <= nth && nth <= -1) || (1 <= nth && nth <= 5)) {
            return Err(err("values must be in range 1..=5 or -5..=-1"));
        }
        Ok(())
    }

    pub fn interval(&mut self, interval: i64) -> &mut RecurrenceRuleBuilder {
        self.interval = interval;
        self
    }

    pub fn count(&mut self, count: i64) -> &mut RecurrenceRuleBuilder {
        self.count = Some(count);
        self
    }

    pub fn until<U: Into<Until>>(
        &mut self,
        until: U,
    ) -> &mut RecurrenceRuleBuilder {
        self.until = Some(until.into());
        self
    }

    pub fn by_month<I: IntoI64Iter>(
        &mut self,
        months: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_month.extend(months.into_i64_iter());
        self
    }

    pub fn by_year_day<I: IntoI64Iter>(
        &mut self,
        days: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_year_day.extend(days.into_i64_iter());
        self
    }

    pub fn by_day(&mut self, by_day: ByDay) -> &mut RecurrenceRuleBuilder {
        self.by_day = Some(by_day);
        self
    }

    pub fn by_hour<I: IntoI64Iter>(
        &mut self,
        hours: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_hour.extend(hours.into_i64_iter());
        self
    }

    pub fn by_minute<I: IntoI64Iter>(
        &mut self,
        minutes: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_minute.extend(minutes.into_i64_iter());
        self
    }

    pub fn by_second<I: IntoI64Iter>(
        &mut self,
        seconds: I,
    ) -> &mut RecurrenceRuleBuilder {
        self.by_second.extend(seconds.into_i64_iter());
        self
    }

    pub fn week_start(
        &mut self,
        weekday: Weekday,
    ) -> &mut RecurrenceRuleBuilder {
        self.week_start = weekday;
        self
    }
}

/// A trait that permits flexibly specifying a sequence of integers.
///
/// This trait is used for builder methods on `RecurrenceRuleBuilder`. It
/// permits callers to provide integers in a number of flexible ways:
///
/// * A single integer: `5`
/// * An array of integers: `[1, 3, 5]`.
/// * A slice of integers: `&[1, 3, 5][..]`.
/// * A single range of integers: `5..8` or `5..=8`.
/// * An array of ranges of integers: `[5..=10, 15..=20]`.
///
/// Every value is widened to `i64` so that out of range values can be
/// reported exactly as given. Since this is only implemented for `i64`, a
/// bare integer literal like `builder.by_month(5)` is inferred unambiguously.
pub trait IntoI64Iter {
    /// Creates an iterator over all integers in this sequence.
    fn into_i64_iter(self) -> impl Iterator<Item = i64>;
}

impl IntoI64Iter for i64 {
    fn into_i64_iter(self) -> impl Iterator<Item = i64> {
        std::iter::once(self)
    }
}

impl IntoI64Iter for Range<i64> {
    fn into_i64_iter(self) -> impl Iterator<Item = i64> {
        self.into_iter()
    }
}

impl IntoI64Iter for RangeInclusive<i64> {
    fn into_i64_iter(self) -> impl Iterator<Item = i64> {
        self.into_iter()
    }
}

impl<const N: usize> IntoI64Iter for [i64; N] {
    fn into_i64_iter(self) -> impl Iterator<Item = i64> {
        self.into_iter()
    }
}

impl<const N: usize> IntoI64Iter for [RangeInclusive<i64>; N] {
    fn into_i64_iter(self) -> impl Iterator<Item = i64> {
        self.into_iter().flatten()
    }
}

impl<'a> IntoI64Iter for &'a [i64] {
    fn into_i64_iter(self) -> impl Iterator<Item = i64> {
        self.iter().copied()
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl Frequency {
    /// Returns the span of time between the start of consecutive periods.
    pub(crate) fn to_span(&self, interval: i32) -> Result<Span, jiff::Error> {
        let base = match *self {
            Frequency::Yearly => 1.year(),
            Frequency::Monthly => 1.month(),
            Frequency::Weekly => 1.week(),
            Frequency::Daily => 1.day(),
            Frequency::Hourly => 1.hour(),
            Frequency::Minutely => 1.minute(),
            Frequency::Secondly => 1.second(),
        };
        base.checked_mul(i64::from(interval))
    }

    /// Returns the name of this frequency as it appears in RRULE text.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
            Frequency::Hourly => "HOURLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Secondly => "SECONDLY",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = Error;

    /// Parses a FREQ value. Like all RRULE keywords, this is not case
    /// sensitive.
    fn from_str(s: &str) -> Result<Frequency, Error> {
        use self::Frequency::*;

        let freq = match &*s.to_ascii_uppercase() {
            "YEARLY" => Yearly,
            "MONTHLY" => Monthly,
            "WEEKLY" => Weekly,
            "DAILY" => Daily,
            "HOURLY" => Hourly,
            "MINUTELY" => Minutely,
            "SECONDLY" => Secondly,
            _ => return Err(Error::UnknownFrequency { value: s.to_string() }),
        };
        Ok(freq)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_empty<T>(slice: &[T]) -> Option<&[T]> {
    if slice.is_empty() { None } else { Some(slice) }
}
