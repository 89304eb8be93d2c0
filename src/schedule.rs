use jiff::{
    SignedDuration, Timestamp, Zoned,
    civil::{self, DateTime},
    tz::TimeZone,
};

use crate::{
    error::Error,
    expand::RecurrenceIter,
    recur::Recur,
    rule::RecurrenceRule,
};

/// A single event: when it starts and how long it lasts.
///
/// The time zone of the start is the time zone of the event. Every
/// occurrence of a recurring event is computed in it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    start: Zoned,
    duration: SignedDuration,
}

impl Event {
    /// Creates a new event.
    ///
    /// # Errors
    ///
    /// This returns an error when the duration is negative.
    pub fn new(start: Zoned, duration: SignedDuration) -> Result<Event, Error> {
        if duration.is_negative() {
            return Err(Error::InvalidDuration { duration });
        }
        Ok(Event { start, duration })
    }

    /// Creates a new event from its start and end.
    ///
    /// The duration is the exact amount of time elapsed between the two.
    ///
    /// # Errors
    ///
    /// This returns an error when `end` is before `start`.
    pub fn from_bounds(start: Zoned, end: &Zoned) -> Result<Event, Error> {
        let duration = start.duration_until(end);
        Event::new(start, duration)
    }

    /// The start of this event, in the event's time zone.
    pub fn start_time(&self) -> &Zoned {
        &self.start
    }

    /// The start plus the duration, in exact time.
    pub fn end_time(&self) -> Zoned {
        self.start.saturating_add(self.duration)
    }

    pub fn duration(&self) -> SignedDuration {
        self.duration
    }

    /// The time zone every occurrence of this event is computed in.
    pub fn time_zone(&self) -> &TimeZone {
        self.start.time_zone()
    }
}

/// One concrete occurrence of an event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Occurrence {
    start: Zoned,
    end: Zoned,
}

impl Occurrence {
    fn new(start: Zoned, duration: SignedDuration) -> Occurrence {
        let end = start.saturating_add(duration);
        Occurrence { start, end }
    }

    /// When this occurrence starts.
    pub fn start_time(&self) -> &Zoned {
        &self.start
    }

    /// When this occurrence ends. Always in the same time zone as the start.
    pub fn end_time(&self) -> &Zoned {
        &self.end
    }

    /// The exact amount of time between the start and the end.
    pub fn duration(&self) -> SignedDuration {
        self.start.duration_until(&self.end)
    }
}

impl std::fmt::Display for Occurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// An endpoint of a query window.
///
/// Civil values are interpreted in the time zone of the event being
/// expanded. A date refers to the first instant of that day.
pub trait QueryBound {
    /// Returns the instant this bound refers to in the given time zone.
    fn to_timestamp(&self, tz: &TimeZone) -> Timestamp;
}

impl QueryBound for Timestamp {
    fn to_timestamp(&self, _: &TimeZone) -> Timestamp {
        *self
    }
}

impl QueryBound for Zoned {
    fn to_timestamp(&self, _: &TimeZone) -> Timestamp {
        self.timestamp()
    }
}

impl QueryBound for DateTime {
    fn to_timestamp(&self, tz: &TimeZone) -> Timestamp {
        tz.to_ambiguous_timestamp(*self).compatible().unwrap_or_else(|_| {
            // Only possible at the extremes of the supported range.
            if self.year() < 0 { Timestamp::MIN } else { Timestamp::MAX }
        })
    }
}

impl QueryBound for civil::Date {
    fn to_timestamp(&self, tz: &TimeZone) -> Timestamp {
        match self.to_zoned(tz.clone()) {
            Ok(zdt) => zdt.timestamp(),
            Err(_) => {
                let dt = self.to_datetime(civil::Time::MIN);
                QueryBound::to_timestamp(&dt, tz)
            }
        }
    }
}

impl<T: QueryBound + ?Sized> QueryBound for &T {
    fn to_timestamp(&self, tz: &TimeZone) -> Timestamp {
        (**self).to_timestamp(tz)
    }
}

/// An event along with an optional rule for how it repeats.
///
/// # Example
///
/// ```
/// use ical_schedule::{Event, Schedule};
///
/// let start = "2014-02-01T09:00[America/New_York]".parse()?;
/// let event = Event::new(start, jiff::SignedDuration::from_hours(1))?;
/// let schedule = Schedule::with_rule(event, "FREQ=DAILY;COUNT=3".parse()?);
///
/// let starts = schedule
///     .occurrences()
///     .map(|occ| occ.start_time().to_string())
///     .collect::<Vec<String>>();
/// assert_eq!(starts, vec![
///     "2014-02-01T09:00:00-05:00[America/New_York]",
///     "2014-02-02T09:00:00-05:00[America/New_York]",
///     "2014-02-03T09:00:00-05:00[America/New_York]",
/// ]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Schedule {
    event: Event,
    rule: Option<RecurrenceRule>,
}

impl Schedule {
    /// Creates a schedule for a single non-recurring event.
    pub fn new(event: Event) -> Schedule {
        Schedule { event, rule: None }
    }

    /// Creates a schedule for an event that repeats according to `rule`.
    pub fn with_rule(event: Event, rule: RecurrenceRule) -> Schedule {
        Schedule { event, rule: Some(rule) }
    }

    /// Creates a schedule by translating a raw RRULE value.
    ///
    /// # Errors
    ///
    /// This returns an error when `recur` cannot be translated. See
    /// [`RecurrenceRule::from_recur`].
    pub fn from_recur(event: Event, recur: &Recur) -> Result<Schedule, Error> {
        Ok(Schedule::with_rule(event, RecurrenceRule::from_recur(recur)?))
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn rule(&self) -> Option<&RecurrenceRule> {
        self.rule.as_ref()
    }

    /// Returns every occurrence starting in the half-open window
    /// `[from, to)`, in chronological order.
    ///
    /// Occurrences are produced lazily. The work done is proportional to the
    /// size of the window, not to the distance from the event start, unless
    /// the rule has a COUNT (which is always counted from the event start).
    pub fn occurrences_between<F, T>(&self, from: F, to: T) -> Occurrences<'_>
    where
        F: QueryBound,
        T: QueryBound,
    {
        let tz = self.event.time_zone();
        let (from, to) = (from.to_timestamp(tz), to.to_timestamp(tz));
        if from >= to {
            return Occurrences::empty(self.event.duration);
        }
        self.iter(Some(from), Some(to))
    }

    /// Returns every occurrence of this schedule, in chronological order.
    ///
    /// Without a COUNT or UNTIL, this iterator only ends at the maximum
    /// datetime supported.
    pub fn occurrences(&self) -> Occurrences<'_> {
        self.iter(None, None)
    }

    fn iter(
        &self,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Occurrences<'_> {
        let start = &self.event.start;
        let kind = match self.rule {
            None => {
                let ts = start.timestamp();
                let in_window = from.is_none_or(|from| from <= ts)
                    && to.is_none_or(|to| ts < to);
                OccurrencesKind::Single(in_window.then(|| start.clone()))
            }
            Some(ref rule) => OccurrencesKind::Recurring(RecurrenceIter::new(
                rule, start, from, to,
            )),
        };
        Occurrences { duration: self.event.duration, from, kind }
    }
}

/// An iterator over the occurrences of a [`Schedule`].
///
/// This is created by [`Schedule::occurrences_between`] or
/// [`Schedule::occurrences`].
#[derive(Clone, Debug)]
pub struct Occurrences<'s> {
    duration: SignedDuration,
    from: Option<Timestamp>,
    kind: OccurrencesKind<'s>,
}

#[derive(Clone, Debug)]
enum OccurrencesKind<'s> {
    Single(Option<Zoned>),
    Recurring(RecurrenceIter<'s>),
}

impl<'s> Occurrences<'s> {
    fn empty(duration: SignedDuration) -> Occurrences<'s> {
        Occurrences { duration, from: None, kind: OccurrencesKind::Single(None) }
    }
}

impl<'s> Iterator for Occurrences<'s> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        loop {
            let start = match self.kind {
                OccurrencesKind::Single(ref mut start) => start.take()?,
                OccurrencesKind::Recurring(ref mut it) => it.next()?,
            };
            if self.from.is_some_and(|from| start.timestamp() < from) {
                continue;
            }
            return Some(Occurrence::new(start, self.duration));
        }
    }
}

impl<'s> std::iter::FusedIterator for Occurrences<'s> {}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    fn zoned(s: &str) -> Zoned {
        s.parse().unwrap()
    }

    fn event(start: &str, minutes: i64) -> Event {
        Event::new(zoned(start), SignedDuration::from_mins(minutes)).unwrap()
    }

    fn snapshot<T>(it: impl IntoIterator<Item = T>) -> String
    where
        T: ToString,
    {
        it.into_iter()
            .map(|item| item.to_string())
            .collect::<Vec<String>>()
            .join("\n")
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err = Event::new(
            zoned("2014-02-01T09:00[America/New_York]"),
            SignedDuration::from_mins(-5),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidDuration { duration: SignedDuration::from_mins(-5) },
        );

        let start = zoned("2014-02-01T09:00[America/New_York]");
        let end = zoned("2014-02-01T08:00[America/New_York]");
        assert!(Event::from_bounds(start, &end).is_err());
    }

    #[test]
    fn event_from_bounds() {
        let start = zoned("2014-02-01T09:00[America/New_York]");
        let end = zoned("2014-02-01T10:30[America/New_York]");
        let event = Event::from_bounds(start, &end).unwrap();
        assert_eq!(event.duration(), SignedDuration::from_mins(90));
        assert_eq!(event.end_time(), end);
        assert_eq!(event.time_zone().iana_name(), Some("America/New_York"));
    }

    #[test]
    fn single_event_in_and_out_of_window() {
        let schedule =
            Schedule::new(event("2014-02-01T09:00[America/New_York]", 60));
        insta::assert_snapshot!(
            snapshot(schedule.occurrences_between(
                date(2014, 2, 1),
                date(2014, 2, 2),
            )),
            @"2014-02-01T09:00:00-05:00[America/New_York]/2014-02-01T10:00:00-05:00[America/New_York]",
        );
        // The window is half-open.
        let start = zoned("2014-02-01T09:00[America/New_York]");
        assert_eq!(
            schedule.occurrences_between(&start, &start).count(),
            0,
        );
        assert_eq!(
            schedule
                .occurrences_between(date(2014, 1, 1), start.timestamp())
                .count(),
            0,
        );
        assert_eq!(schedule.occurrences().count(), 1);
    }

    #[test]
    fn empty_or_inverted_window() {
        let schedule = Schedule::with_rule(
            event("2014-02-01T09:00[America/New_York]", 60),
            "FREQ=DAILY".parse().unwrap(),
        );
        assert_eq!(
            schedule
                .occurrences_between(date(2014, 3, 1), date(2014, 2, 1))
                .count(),
            0,
        );
        assert_eq!(
            schedule
                .occurrences_between(date(2014, 3, 1), date(2014, 3, 1))
                .count(),
            0,
        );
    }

    #[test]
    fn occurrence_end_uses_exact_time() {
        // A two hour event starting just before the DST transition ends at
        // 4am local time, not 3am.
        let schedule = Schedule::with_rule(
            event("2014-03-08T01:00[America/New_York]", 120),
            "FREQ=DAILY;COUNT=2".parse().unwrap(),
        );
        insta::assert_snapshot!(
            snapshot(schedule.occurrences()),
            @r"
        2014-03-08T01:00:00-05:00[America/New_York]/2014-03-08T03:00:00-05:00[America/New_York]
        2014-03-09T01:00:00-05:00[America/New_York]/2014-03-09T04:00:00-04:00[America/New_York]
        ",
        );
    }

    #[test]
    fn civil_datetime_bounds_use_event_zone() {
        let schedule = Schedule::with_rule(
            event("2014-02-01T09:00[Europe/Paris]", 30),
            "FREQ=HOURLY".parse().unwrap(),
        );
        let starts = schedule
            .occurrences_between(
                date(2014, 2, 1).at(10, 0, 0, 0),
                date(2014, 2, 1).at(12, 0, 0, 0),
            )
            .map(|occ| occ.start_time().to_string())
            .collect::<Vec<String>>();
        assert_eq!(
            starts,
            vec![
                "2014-02-01T10:00:00+01:00[Europe/Paris]",
                "2014-02-01T11:00:00+01:00[Europe/Paris]",
            ],
        );
    }

    #[test]
    fn from_recur_propagates_errors() {
        let recur = Recur { count: Some(3), ..Recur::default() };
        let err = Schedule::from_recur(
            event("2014-02-01T09:00[America/New_York]", 60),
            &recur,
        )
        .unwrap_err();
        assert_eq!(err, Error::MissingFrequency);
    }

    #[test]
    fn schedule_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schedule>();
        assert_send_sync::<RecurrenceRule>();
        assert_send_sync::<Event>();
        assert_send_sync::<Occurrence>();
    }
}
