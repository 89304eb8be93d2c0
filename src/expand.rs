use jiff::{
    Span, Timestamp, ToSpan, Unit, Zoned,
    civil::{DateTime, Time, Weekday},
    tz::AmbiguousOffset,
};

use crate::{
    byday::ByDay,
    rule::{Frequency, RecurrenceRule, RecurrenceRuleInner},
    weekdate::{first_of_week, last_of_week},
};

/// An expander for a single period of a recurrence rule.
#[derive(Clone, Debug)]
struct Expander<'a> {
    /// The rule we are expanding.
    rule: &'a RecurrenceRuleInner,
    /// The BYDAY values of `rule`, flattened.
    by_week_day: &'a [ByWeekday],
    /// The civil datetime of the event start.
    civil_start: DateTime,
    /// The "current" datetime we are expanding.
    ///
    /// How this datetime is used depends on the frequency we are expanding
    /// for.
    cur: DateTime,
}

impl<'a> Expander<'a> {
    /// Expand into the set provided.
    fn expand(&self, set: &mut RecurrenceSet) {
        match self.rule.freq {
            Frequency::Yearly => self.yearly(set),
            Frequency::Monthly => self.monthly(set),
            Frequency::Weekly => self.weekly(set),
            Frequency::Daily => self.daily(set),
            Frequency::Hourly => self.hourly(set),
            Frequency::Minutely => self.minutely(set),
            Frequency::Secondly => self.secondly(set),
        }
    }

    /// Populate `set` with datetimes according to this rule at a YEARLY
    /// frequency.
    fn yearly(&self, set: &mut RecurrenceSet) {
        set.insert(self.cur);
        if self.has_by_week_day() {
            if self.has_by_month() {
                // The weekdays are chosen from the entire month, so the day
                // of the month doesn't matter. Using the first avoids
                // dropping months that are shorter than the start's day.
                set.expand(|dt| self.iter_by_month(dt, 1));
                self.expand_by_week_day_monthly(set);
            } else {
                self.expand_by_week_day_yearly(set);
            }
            self.limit_by_year_day(set);
        } else if self.has_by_year_day() {
            self.expand_by_year_day(set);
            self.limit_by_month(set);
        } else if self.has_by_month() {
            set.expand(|dt| self.iter_by_month(dt, self.civil_start.day()));
        }
        self.expand_by_hour(set);
        self.expand_by_minute(set);
        self.expand_by_second(set);
    }

    /// Populate `set` with datetimes according to this rule at a MONTHLY
    /// frequency.
    fn monthly(&self, set: &mut RecurrenceSet) {
        if !self.satisfies_by_month(self.cur) {
            return;
        }
        set.insert(self.cur);
        if self.has_by_week_day() {
            self.expand_by_week_day_monthly(set);
            self.limit_by_year_day(set);
        } else if self.has_by_year_day() {
            let (year, month) = (self.cur.year(), self.cur.month());
            self.expand_by_year_day(set);
            set.retain(|dt| dt.year() == year && dt.month() == month);
        }
        self.expand_by_hour(set);
        self.expand_by_minute(set);
        self.expand_by_second(set);
    }

    /// Populate `set` with datetimes according to this rule at a WEEKLY
    /// frequency.
    fn weekly(&self, set: &mut RecurrenceSet) {
        set.insert(self.cur);
        if self.has_by_week_day() {
            self.expand_by_week_day_weekly(set);
        } else if self.has_by_year_day() {
            set.expand(|dt| self.iter_week(dt));
        }
        // A week can straddle two months (or two years), so these are
        // checked against each day instead of the start of the week.
        self.limit_by_month(set);
        self.limit_by_year_day(set);
        self.expand_by_hour(set);
        self.expand_by_minute(set);
        self.expand_by_second(set);
    }

    /// Populate `set` with datetimes according to this rule at a DAILY
    /// frequency.
    fn daily(&self, set: &mut RecurrenceSet) {
        if !self.satisfies_date(self.cur) {
            return;
        }
        set.insert(self.cur);
        self.expand_by_hour(set);
        self.expand_by_minute(set);
        self.expand_by_second(set);
    }

    /// Populate `set` with datetimes according to this rule at a HOURLY
    /// frequency.
    fn hourly(&self, set: &mut RecurrenceSet) {
        if !self.satisfies_date(self.cur) {
            return;
        }
        if !self.satisfies_by_hour(self.cur) {
            return;
        }
        set.insert(self.cur);
        self.expand_by_minute(set);
        self.expand_by_second(set);
    }

    /// Populate `set` with datetimes according to this rule at a MINUTELY
    /// frequency.
    fn minutely(&self, set: &mut RecurrenceSet) {
        if !self.satisfies_date(self.cur) {
            return;
        }
        if !self.satisfies_by_hour(self.cur) {
            return;
        }
        if !self.satisfies_by_minute(self.cur) {
            return;
        }
        set.insert(self.cur);
        self.expand_by_second(set);
    }

    /// Populate `set` with datetimes according to this rule at a SECONDLY
    /// frequency.
    fn secondly(&self, set: &mut RecurrenceSet) {
        if !self.satisfies_date(self.cur) {
            return;
        }
        if !self.satisfies_by_hour(self.cur) {
            return;
        }
        if !self.satisfies_by_minute(self.cur) {
            return;
        }
        if !self.satisfies_by_second(self.cur) {
            return;
        }
        set.insert(self.cur);
    }

    fn has_by_month(&self) -> bool {
        !self.rule.by_month.is_empty()
    }

    fn has_by_year_day(&self) -> bool {
        !self.rule.by_year_day.is_empty()
    }

    fn has_by_week_day(&self) -> bool {
        !self.by_week_day.is_empty()
    }

    /// Returns true when the date of `dt` passes every date limiting rule.
    /// Only used at DAILY frequency or finer.
    fn satisfies_date(&self, dt: DateTime) -> bool {
        self.satisfies_by_month(dt)
            && self.satisfies_by_year_day(dt)
            && self.satisfies_by_week_day(dt)
    }

    /// Returns true if and only if the given datetime satisfies the
    /// BYMONTH rule.
    fn satisfies_by_month(&self, dt: DateTime) -> bool {
        !self.has_by_month() || self.rule.by_month.contains(&dt.month())
    }

    /// Returns true if and only if the given datetime satisfies the
    /// BYYEARDAY rule.
    fn satisfies_by_year_day(&self, dt: DateTime) -> bool {
        if !self.has_by_year_day() {
            return true;
        }
        let positive = dt.day_of_year();
        // Minus 1 because -1 is the last day of the year, and the days of the
        // year are 1-indexed.
        let negative = positive - 1 - dt.days_in_year();
        self.rule.by_year_day.binary_search(&positive).is_ok()
            || self.rule.by_year_day.binary_search(&negative).is_ok()
    }

    /// Returns true only if the weekday for the given datetime is allowed by
    /// this recurrence rule.
    fn satisfies_by_week_day(&self, dt: DateTime) -> bool {
        if !self.has_by_week_day() {
            return true;
        }
        let wd = dt.weekday();
        self.by_week_day.iter().any(|bywd| bywd.is_match(wd))
    }

    fn satisfies_by_hour(&self, dt: DateTime) -> bool {
        self.rule.by_hour.is_empty() || self.rule.by_hour.contains(&dt.hour())
    }

    fn satisfies_by_minute(&self, dt: DateTime) -> bool {
        self.rule.by_minute.is_empty()
            || self.rule.by_minute.contains(&dt.minute())
    }

    fn satisfies_by_second(&self, dt: DateTime) -> bool {
        self.rule.by_second.is_empty()
            || self.rule.by_second.contains(&dt.second())
    }

    fn limit_by_month(&self, set: &mut RecurrenceSet) {
        if !self.has_by_month() {
            return;
        }
        set.retain(|dt| self.satisfies_by_month(*dt));
    }

    fn limit_by_year_day(&self, set: &mut RecurrenceSet) {
        if !self.has_by_year_day() {
            return;
        }
        set.retain(|dt| self.satisfies_by_year_day(*dt));
    }

    fn expand_by_year_day(&self, set: &mut RecurrenceSet) {
        if !self.has_by_year_day() {
            return;
        }
        set.expand(|dt| self.iter_by_year_day(dt))
    }

    fn expand_by_week_day_yearly(&self, set: &mut RecurrenceSet) {
        if !self.has_by_week_day() {
            return;
        }
        set.expand(|dt| self.iter_by_week_day_yearly(dt))
    }

    fn expand_by_week_day_monthly(&self, set: &mut RecurrenceSet) {
        if !self.has_by_week_day() {
            return;
        }
        set.expand(|dt| self.iter_by_week_day_monthly(dt))
    }

    fn expand_by_week_day_weekly(&self, set: &mut RecurrenceSet) {
        if !self.has_by_week_day() {
            return;
        }
        set.expand(|dt| self.iter_by_week_day_weekly(dt))
    }

    fn expand_by_hour(&self, set: &mut RecurrenceSet) {
        if self.rule.by_hour.is_empty() {
            return;
        }
        set.expand(|dt| {
            self.rule
                .by_hour
                .iter()
                .filter_map(move |&hour| dt.with().hour(hour).build().ok())
        })
    }

    fn expand_by_minute(&self, set: &mut RecurrenceSet) {
        if self.rule.by_minute.is_empty() {
            return;
        }
        set.expand(|dt| {
            self.rule
                .by_minute
                .iter()
                .filter_map(move |&minute| dt.with().minute(minute).build().ok())
        })
    }

    fn expand_by_second(&self, set: &mut RecurrenceSet) {
        if self.rule.by_second.is_empty() {
            return;
        }
        set.expand(|dt| {
            self.rule
                .by_second
                .iter()
                .filter_map(move |&second| dt.with().second(second).build().ok())
        })
    }

    /// Returns an iterator over the BYMONTH values in this recurrence rule.
    ///
    /// The values returned are datetimes with each of the corresponding
    /// months and the given day. Months in which that day doesn't exist are
    /// skipped. The time is copied from `dt`.
    fn iter_by_month(
        &self,
        dt: DateTime,
        day: i8,
    ) -> impl Iterator<Item = DateTime> {
        self.rule.by_month.iter().filter_map(move |&month| {
            dt.with().month(month).day(day).build().ok()
        })
    }

    /// Returns an iterator over the BYYEARDAY values in this recurrence rule.
    ///
    /// This handles any negative day of the year values according to the
    /// number of days of the year in `dt`.
    fn iter_by_year_day(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let days_in_year = dt.days_in_year();
        self.rule.by_year_day.iter().copied().filter_map(move |mut day| {
            if day.is_negative() {
                // Add 1 because -1 is the last day of the year, and the days
                // of the year are 1-indexed.
                day = days_in_year.checked_add(day + 1)?;
            }
            dt.with().day_of_year(day).build().ok()
        })
    }

    /// Returns an iterator over the BYDAY values in this recurrence rule at
    /// a YEARLY frequency.
    ///
    /// Negative values are interpreted with respect to the end of the year of
    /// `dt`, while positive values are interpreted with respect to the
    /// beginning of it.
    fn iter_by_week_day_yearly(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let start = dt.first_of_year();
        let end = dt.last_of_year();
        self.by_week_day
            .iter()
            .flat_map(move |weekday| weekday.iter_yearly(start, end))
    }

    /// Returns an iterator over the BYDAY values in this recurrence rule at
    /// a MONTHLY frequency.
    ///
    /// Negative values are interpreted with respect to the end of the month
    /// of `dt`, while positive values are interpreted with respect to the
    /// beginning of it.
    fn iter_by_week_day_monthly(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let start = dt.first_of_month();
        let end = dt.last_of_month();
        self.by_week_day
            .iter()
            .flat_map(move |weekday| weekday.iter_monthly(start, end))
    }

    /// Returns an iterator over every day of the week (starting on WKST)
    /// containing `dt`. The time is copied from `dt`.
    fn iter_week(&self, dt: DateTime) -> impl Iterator<Item = DateTime> {
        let first = first_of_week(self.rule.week_start, dt.date())
            .and_then(|date| dt.with().date(date).build());
        let Ok(first) = first else {
            return Either::Left(std::iter::empty());
        };
        Either::Right(
            (0..7i64).map_while(move |n| first.checked_add(n.days()).ok()),
        )
    }

    /// Returns an iterator over the BYDAY values in this recurrence rule at
    /// a WEEKLY frequency, within the week (starting on WKST) containing
    /// `dt`.
    fn iter_by_week_day_weekly(
        &self,
        dt: DateTime,
    ) -> impl Iterator<Item = DateTime> {
        let week_start = self.rule.week_start;
        let week = first_of_week(week_start, dt.date())
            .and_then(|start| {
                let end = last_of_week(week_start, dt.date())?;
                let start = dt.with().date(start).build()?;
                let end = dt.with().date(end).build()?;
                Ok((start, end))
            })
            .ok();
        let Some((start, end)) = week else {
            return Either::Left(std::iter::empty());
        };
        Either::Right(
            self.by_week_day
                .iter()
                .flat_map(move |weekday| weekday.iter_weekly(start, end)),
        )
    }
}

/// The iterator over every datetime produced by a recurrence rule from a
/// given start.
///
/// Datetimes are produced one period at a time. A period is the span of time
/// covered by one step of the rule's frequency, e.g., a month for MONTHLY.
#[derive(Clone, Debug)]
pub(crate) struct RecurrenceIter<'r> {
    rule: &'r RecurrenceRuleInner,
    by_week_day: Box<[ByWeekday]>,
    start: &'r Zoned,
    civil_start: DateTime,
    /// The span between consecutive periods.
    interval: Option<Span>,
    /// The inclusive end of the recurrence, resolved in the start's zone.
    until: Option<Zoned>,
    /// The exclusive end of iteration.
    limit: Option<Timestamp>,
    /// The number of datetimes left to produce when COUNT is set.
    remaining: Option<u32>,
    set: RecurrenceSet,
    /// The interval index along with the current datetime.
    ///
    /// In order to get the next datetime, the interval index should be
    /// incremented by one and then multiplied by the frequency `Span`. This
    /// is done instead of just adding to the previous datetime to avoid
    /// cases where we go from 2025-03-31 -> 2025-04-30 -> 2025-05-30 instead
    /// of 2025-03-31 -> 2025-04-30 -> 2025-05-31.
    ///
    /// When this is `None`, no more periods will be expanded.
    cur: Option<(i64, DateTime)>,
}

impl<'r> RecurrenceIter<'r> {
    /// Creates an iterator over the datetimes of `rule` starting at `start`.
    ///
    /// When `from` is given, iteration may skip ahead to the period
    /// containing it. Some datetimes before `from` might still be produced.
    /// Iteration stops before `limit`.
    pub(crate) fn new(
        rule: &'r RecurrenceRule,
        start: &'r Zoned,
        from: Option<Timestamp>,
        limit: Option<Timestamp>,
    ) -> RecurrenceIter<'r> {
        let inner = rule.inner();
        let until = rule.until().and_then(|until| {
            match until.to_zoned(start.time_zone()) {
                Ok(zdt) => Some(zdt),
                Err(err) => {
                    log::trace!(
                        "UNTIL={until} is out of range in the time zone of \
                         {start}, treating the recurrence as unbounded: {err}",
                    );
                    None
                }
            }
        });
        let mut it = RecurrenceIter {
            rule: inner,
            by_week_day: ByWeekday::from_by_day(inner.by_day.as_ref()),
            start,
            civil_start: start.datetime(),
            interval: inner.freq.to_span(inner.interval).ok(),
            until,
            limit,
            remaining: rule.count(),
            set: RecurrenceSet::new(),
            cur: None,
        };
        let attempt = match from {
            // COUNT is relative to the start, so every period has to be
            // visited in order to know which datetimes are included.
            Some(from) if it.remaining.is_none() && from > start.timestamp() => {
                it.seek(from)
            }
            _ => 0,
        };
        it.cur = it.period(attempt);
        it
    }

    /// Returns the interval index of a period that starts at or before the
    /// period containing `from`.
    fn seek(&self, from: Timestamp) -> i64 {
        let tz = self.start.time_zone();
        let from = from.to_zoned(tz.clone()).datetime();
        let unit = match self.rule.freq {
            Frequency::Yearly => Unit::Year,
            Frequency::Monthly => Unit::Month,
            Frequency::Weekly => Unit::Week,
            Frequency::Daily => Unit::Day,
            Frequency::Hourly => Unit::Hour,
            Frequency::Minutely => Unit::Minute,
            Frequency::Secondly => Unit::Second,
        };
        let Ok(span) = self.civil_start.until((unit, from)) else { return 0 };
        let units = match unit {
            Unit::Year => i64::from(span.get_years()),
            Unit::Month => i64::from(span.get_months()),
            Unit::Week => i64::from(span.get_weeks()),
            Unit::Day => i64::from(span.get_days()),
            Unit::Hour => i64::from(span.get_hours()),
            Unit::Minute => span.get_minutes(),
            _ => span.get_seconds(),
        };
        // Back off by one period since wall clock arithmetic can disagree
        // with elapsed time around time zone transitions. Any extra
        // datetimes this produces are before `from` and get filtered out by
        // the caller.
        let attempt = (units / i64::from(self.rule.interval) - 1).max(0);
        log::trace!(
            "seeking {freq} recurrence starting at {start} to interval \
             {attempt} for datetimes at or after {from}",
            freq = self.rule.freq,
            start = self.start,
        );
        attempt
    }

    /// Returns the first period at or after the given interval index that
    /// should be expanded.
    ///
    /// This returns `None` when every remaining period starts after UNTIL or
    /// at or after the iteration limit.
    fn period(&self, mut attempt: i64) -> Option<(i64, DateTime)> {
        let interval = self.interval?;
        loop {
            let span = interval.checked_mul(attempt).ok()?;
            let next = self.civil_start.checked_add(span).ok()?;
            if self.is_past_end(next) {
                return None;
            }
            // In cases where we add N years or N months, the day number can
            // change. For example, in Jiff, 2024-02-29 + 1 year = 2025-02-28.
            // But RFC 5545 wants us to treat it like 2025-02-29, which
            // is invalid and thus ignore such things. So we assume the
            // "constraining" behavior of Jiff (as Temporal calls it) occurs
            // when the result's day number is not equal to the one we started
            // with.
            //
            // The exception is when a rule chooses the date itself, instead
            // of taking it from the start. Then the period is still needed.
            let r = self.rule;
            let constrained = next.day() != self.civil_start.day();
            let skip = match r.freq {
                Frequency::Yearly => {
                    constrained
                        && r.by_month.is_empty()
                        && r.by_year_day.is_empty()
                        && r.by_day.is_none()
                }
                Frequency::Monthly => {
                    constrained
                        && r.by_day.is_none()
                        && r.by_year_day.is_empty()
                }
                _ => false,
            };
            if !skip {
                return Some((attempt, next));
            }
            attempt = attempt.checked_add(1)?;
        }
    }

    /// Returns true when every datetime in the period containing `dt` is
    /// after UNTIL or at or after the iteration limit.
    fn is_past_end(&self, dt: DateTime) -> bool {
        let floor = self.period_floor(dt);
        let tz = self.start.time_zone();
        let Ok(floor) = tz.to_ambiguous_zoned(floor).earlier() else {
            return false;
        };
        if self.until.as_ref().is_some_and(|until| &floor > until) {
            return true;
        }
        self.limit.is_some_and(|limit| floor.timestamp() >= limit)
    }

    /// Returns the earliest civil datetime that expansion of the period
    /// containing `dt` can produce.
    fn period_floor(&self, dt: DateTime) -> DateTime {
        let date = match self.rule.freq {
            Frequency::Yearly => dt.date().first_of_year(),
            Frequency::Monthly => dt.date().first_of_month(),
            Frequency::Weekly => first_of_week(self.rule.week_start, dt.date())
                .unwrap_or(dt.date()),
            Frequency::Daily => dt.date(),
            Frequency::Hourly => return dt.date().at(dt.hour(), 0, 0, 0),
            Frequency::Minutely => {
                return dt.date().at(dt.hour(), dt.minute(), 0, 0);
            }
            Frequency::Secondly => return dt,
        };
        date.to_datetime(Time::midnight())
    }

    fn expand(&mut self) {
        let Some((_, cur)) = self.cur else { return };
        Expander {
            rule: self.rule,
            by_week_day: &self.by_week_day,
            civil_start: self.civil_start,
            cur,
        }
        .expand(&mut self.set);
        // Only periods shorter than a day can contain both instants of a
        // repeated wall clock time as separate occurrences.
        let both_folds = matches!(
            self.rule.freq,
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly
        );
        self.set.resolve(self.start, both_folds);
    }

    fn finish(&mut self) {
        self.cur = None;
        self.set.clear();
    }
}

impl<'r> Iterator for RecurrenceIter<'r> {
    type Item = Zoned;

    fn next(&mut self) -> Option<Zoned> {
        loop {
            if let Some(zdt) = self.set.pop() {
                // The first period may contain datetimes before the start.
                if zdt < *self.start {
                    continue;
                }
                if self.until.as_ref().is_some_and(|until| &zdt > until)
                    || self.limit.is_some_and(|limit| zdt.timestamp() >= limit)
                {
                    self.finish();
                    return None;
                }
                if let Some(ref mut remaining) = self.remaining {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        self.finish();
                    }
                }
                return Some(zdt);
            }
            let (attempt, _) = self.cur?;
            self.expand();
            self.cur = attempt.checked_add(1).and_then(|a| self.period(a));
        }
    }
}

impl<'r> std::iter::FusedIterator for RecurrenceIter<'r> {}

/// The datetimes generated for one period.
#[derive(Clone, Debug)]
struct RecurrenceSet {
    civil: Vec<DateTime>,
    /// The resolved datetimes of the period in descending order, so that
    /// popping yields them in chronological order.
    zoned: Vec<Zoned>,
}

impl RecurrenceSet {
    fn new() -> RecurrenceSet {
        RecurrenceSet { civil: vec![], zoned: vec![] }
    }

    fn insert(&mut self, dt: DateTime) {
        self.civil.push(dt);
    }

    fn clear(&mut self) {
        self.civil.clear();
        self.zoned.clear();
    }

    fn retain(&mut self, predicate: impl FnMut(&DateTime) -> bool) {
        self.civil.retain(predicate);
    }

    fn expand<E, I>(&mut self, expand: E)
    where
        E: Fn(DateTime) -> I,
        I: Iterator<Item = DateTime>,
    {
        // We're going to replace every datetime in the set at this point
        // with its expansion provided by the closure. So record how many
        // datetimes we have now. At the end, we'll drain them in one swoop.
        let len = self.civil.len();
        for i in 0..len {
            self.civil.extend(expand(self.civil[i]));
        }
        self.civil.drain(..len);
    }

    /// Converts every civil datetime in this set to an instant in the time
    /// zone of `start`.
    ///
    /// A datetime in a fold resolves to its earlier instant, or to both
    /// instants when `both_folds` is set. A datetime equal to the civil
    /// datetime of `start` always resolves to `start` itself.
    fn resolve(&mut self, start: &Zoned, both_folds: bool) {
        let tz = start.time_zone();
        for dt in self.civil.drain(..) {
            let azdt = tz.to_ambiguous_zoned(dt);
            match azdt.offset() {
                AmbiguousOffset::Unambiguous { offset } => {
                    if let Ok(ts) = offset.to_timestamp(dt) {
                        self.zoned.push(ts.to_zoned(tz.clone()));
                    }
                }
                // RFC 5545 explicitly says that if a time is invalid for a
                // particular time zone, then it should be skipped.
                AmbiguousOffset::Gap { .. } => {
                    log::trace!(
                        "skipping {dt} since it falls in a gap in {tz}",
                        tz = tz.iana_name().unwrap_or("the time zone"),
                    );
                }
                // RFC 5545 says an ambiguous local time refers to its first
                // occurrence. At HOURLY and finer, the repeated hour is its
                // own period, so both are kept.
                AmbiguousOffset::Fold { before, after } => {
                    if both_folds {
                        for offset in [before, after] {
                            if let Ok(ts) = offset.to_timestamp(dt) {
                                self.zoned.push(ts.to_zoned(tz.clone()));
                            }
                        }
                    } else if dt == start.datetime() {
                        self.zoned.push(start.clone());
                    } else if let Ok(ts) = before.to_timestamp(dt) {
                        self.zoned.push(ts.to_zoned(tz.clone()));
                    }
                }
            }
        }
        self.zoned.sort_by(|zdt1, zdt2| zdt2.cmp(zdt1));
        self.zoned.dedup();
    }

    fn pop(&mut self) -> Option<Zoned> {
        self.zoned.pop()
    }
}

/// A single BYDAY selector.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ByWeekday {
    Any(Weekday),
    Numbered { nth: i8, weekday: Weekday },
}

impl ByWeekday {
    fn from_by_day(by_day: Option<&ByDay>) -> Box<[ByWeekday]> {
        match by_day {
            None => Box::new([]),
            Some(ByDay::DayFilter(weekdays)) => {
                weekdays.iter().copied().map(ByWeekday::Any).collect()
            }
            Some(ByDay::PositionalDays(days)) => days
                .iter()
                .flat_map(|(weekday, positions)| {
                    positions
                        .iter()
                        .map(move |&nth| ByWeekday::Numbered { nth, weekday })
                })
                .collect(),
        }
    }

    /// Returns true if and only if the given weekday matches this one.
    ///
    /// Numbered weekdays never match. They are rejected at every frequency
    /// where BYDAY limits instead of expands.
    fn is_match(&self, wd: Weekday) -> bool {
        match *self {
            ByWeekday::Any(weekday) => weekday == wd,
            ByWeekday::Numbered { .. } => false,
        }
    }

    /// Return an iterator of weekdays, at yearly frequency, within the given
    /// range of datetimes.
    ///
    /// Generally speaking, `start` should be the first day of a year and `end`
    /// should be the last day of that same year.
    ///
    /// When this is a numbered weekday, then a positive number is interpreted
    /// relative to the start and a negative number is interpreted relative to
    /// the end. Either way, the iterator returned yields at most one element
    /// (but may yield zero).
    fn iter_yearly(
        &self,
        start: DateTime,
        end: DateTime,
    ) -> impl Iterator<Item = DateTime> + use<> {
        match *self {
            ByWeekday::Any(weekday) => {
                Either::Left(iter_weekdays_between(weekday, start, end))
            }
            ByWeekday::Numbered { nth, weekday } => {
                let nth = if start.weekday() != weekday && nth > 0 {
                    nth
                } else if end.weekday() != weekday && nth < 0 {
                    nth
                } else if nth == 1 {
                    return Either::Right(Some(start).into_iter());
                } else if nth == -1 {
                    return Either::Right(Some(end).into_iter());
                } else {
                    nth - nth.signum()
                };
                let from = if nth < 0 { end } else { start };
                // A 53rd weekday doesn't exist in every year.
                let dt = from
                    .nth_weekday(i32::from(nth), weekday)
                    .ok()
                    .filter(|dt| start <= *dt && *dt <= end);
                Either::Right(dt.into_iter())
            }
        }
    }

    /// Return an iterator of weekdays, at monthly frequency, within the given
    /// range of datetimes.
    ///
    /// Generally speaking, `start` should be the first day of a month and
    /// `end` should be the last day of that same month.
    fn iter_monthly(
        &self,
        start: DateTime,
        end: DateTime,
    ) -> impl Iterator<Item = DateTime> + use<> {
        match *self {
            ByWeekday::Any(weekday) => {
                Either::Left(iter_weekdays_between(weekday, start, end))
            }
            ByWeekday::Numbered { nth, weekday } => Either::Right(
                start.nth_weekday_of_month(nth, weekday).ok().into_iter(),
            ),
        }
    }

    /// Return an iterator of weekdays, at weekly frequency, within the given
    /// range of datetimes.
    ///
    /// Numbered weekdays yield nothing, since they are only permitted at
    /// YEARLY and MONTHLY frequencies.
    fn iter_weekly(
        &self,
        start: DateTime,
        end: DateTime,
    ) -> impl Iterator<Item = DateTime> + use<> {
        match *self {
            ByWeekday::Any(weekday) => {
                Either::Left(iter_weekdays_between(weekday, start, end))
            }
            ByWeekday::Numbered { .. } => Either::Right(std::iter::empty()),
        }
    }
}

/// A simple `Either` type for easy construction of `impl Iterator`.
///
/// Specifically, this is useful when it's supremely annoying to write a
/// single iterator chain when it would be more naturally written using case
/// analysis.
enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R, I> Iterator for Either<L, R>
where
    L: Iterator<Item = I>,
    R: Iterator<Item = I>,
{
    type Item = I;

    fn next(&mut self) -> Option<I> {
        match *self {
            Either::Left(ref mut it) => it.next(),
            Either::Right(ref mut it) => it.next(),
        }
    }
}

/// Returns an iterator for every weekday between `start` and `end` (inclusive).
fn iter_weekdays_between(
    weekday: Weekday,
    start: DateTime,
    end: DateTime,
) -> impl Iterator<Item = DateTime> {
    (start.weekday() == weekday).then_some(start).into_iter().chain({
        let mut cur = start.nth_weekday(1, weekday).ok();
        std::iter::from_fn(move || {
            let next = cur.take()?;
            if next > end {
                return None;
            }
            cur = next.nth_weekday(1, weekday).ok();
            Some(next)
        })
    })
}
