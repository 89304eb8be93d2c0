use ical_schedule::{Event, Occurrence, Schedule};
use jiff::{SignedDuration, Zoned};

mod translate;

/// Parses a zoned datetime, e.g., `2014-02-01T10:00[America/New_York]`.
fn zoned(s: &str) -> Zoned {
    logger::init();
    s.parse().unwrap()
}

/// Returns a schedule for an event starting at `start` that lasts for
/// `minutes` and repeats according to `rrule`.
fn schedule(start: &str, minutes: i64, rrule: &str) -> Schedule {
    logger::init();
    let event =
        Event::new(zoned(start), SignedDuration::from_mins(minutes)).unwrap();
    Schedule::with_rule(event, rrule.parse().unwrap())
}

/// Renders each occurrence on its own line.
fn snapshot(it: impl IntoIterator<Item = Occurrence>) -> String {
    it.into_iter()
        .map(|occ| occ.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}
