use jiff::civil::{Date, Weekday};

/// Returns the start of the week that the given date resides in.
///
/// The starting point of the week is determined by `start`, which comes from
/// a rule's WKST value.
pub(crate) fn first_of_week(
    start: Weekday,
    date: Date,
) -> Result<Date, jiff::Error> {
    if date.weekday() == start { Ok(date) } else { date.nth_weekday(-1, start) }
}

/// Returns the end of the week that the given date resides in.
///
/// The starting point of the week is determined by `start`.
pub(crate) fn last_of_week(
    start: Weekday,
    date: Date,
) -> Result<Date, jiff::Error> {
    let last = start.wrapping_sub(1);
    if date.weekday() == last { Ok(date) } else { date.nth_weekday(1, last) }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{Weekday::*, date};

    use super::*;

    #[test]
    fn week_bounds_monday_start() {
        // A Wednesday.
        let d = date(2025, 1, 8);
        assert_eq!(first_of_week(Monday, d).unwrap(), date(2025, 1, 6));
        assert_eq!(last_of_week(Monday, d).unwrap(), date(2025, 1, 12));

        let d = date(2025, 1, 6);
        assert_eq!(first_of_week(Monday, d).unwrap(), d);
        let d = date(2025, 1, 12);
        assert_eq!(last_of_week(Monday, d).unwrap(), d);
    }

    #[test]
    fn week_bounds_other_starts() {
        let d = date(2025, 1, 8);
        assert_eq!(first_of_week(Sunday, d).unwrap(), date(2025, 1, 5));
        assert_eq!(last_of_week(Sunday, d).unwrap(), date(2025, 1, 11));
        assert_eq!(first_of_week(Thursday, d).unwrap(), date(2025, 1, 2));
        assert_eq!(last_of_week(Thursday, d).unwrap(), date(2025, 1, 8));
    }

    #[test]
    fn week_bounds_at_the_edges_of_time() {
        // 9999-12-31 is a Friday, so the week never ends.
        let d = date(9999, 12, 31);
        assert!(last_of_week(Monday, d).is_err());
        assert_eq!(last_of_week(Saturday, d).unwrap(), d);
    }
}
