/*!
Translation and expansion of RFC 5545 recurrence rules.

This crate does two things. First, it turns the raw RRULE value of an
iCalendar event (a [`Recur`]) into a validated and normalized
[`RecurrenceRule`]. Second, it expands that rule, together with the event's
start and duration, into the concrete [`Occurrence`]s that start within a
query window. Expansion honors the event's time zone, including daylight
saving time transitions.

All datetime arithmetic is done with [`jiff`].

# Example

```
use ical_schedule::{Event, Schedule};
use jiff::{SignedDuration, civil::date};

let start = "2014-02-01T10:00[America/New_York]".parse()?;
let event = Event::new(start, SignedDuration::from_mins(90))?;
// The first Saturday of every month.
let schedule =
    Schedule::with_rule(event, "FREQ=MONTHLY;BYDAY=1SA".parse()?);

let dates = schedule
    .occurrences_between(date(2014, 2, 1), date(2014, 5, 1))
    .map(|occ| occ.start_time().date().to_string())
    .collect::<Vec<String>>();
assert_eq!(dates, vec!["2014-02-01", "2014-03-01", "2014-04-05"]);
# Ok::<(), Box<dyn std::error::Error>>(())
```

# Supported rule parts

FREQ, INTERVAL, COUNT, UNTIL, WKST, BYDAY, BYHOUR, BYMINUTE, BYSECOND,
BYMONTH and BYYEARDAY. Any other rule part (for example, BYMONTHDAY or
BYSETPOS) is ignored when translating. Ignored parts are reported through the
[`log`] crate at the debug level.
*/

pub use crate::{
    byday::{ByDay, PositionalDay, PositionalDays, parse_byday},
    daycode::{DayCode, weekday_from_day_code},
    error::Error,
    recur::{Recur, Until},
    rule::{Bound, Frequency, IntoI64Iter, RecurrenceRule, RecurrenceRuleBuilder},
    schedule::{Event, Occurrence, Occurrences, QueryBound, Schedule},
};

mod byday;
mod daycode;
mod error;
mod expand;
mod recur;
mod rule;
mod schedule;
mod weekdate;
