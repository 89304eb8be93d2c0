use jiff::{
    Timestamp, Zoned,
    civil::{self, Time},
    tz::TimeZone,
};

use crate::error::Error;

/// The raw value of an RRULE property, as produced by an iCalendar parser.
///
/// This is deliberately loose. Nothing here is validated beyond basic
/// syntax: the frequency and week start are kept as raw strings, BYDAY
/// tokens are kept as raw strings and every other list is a list of plain
/// integers. Validation happens when translating to a
/// [`RecurrenceRule`](crate::RecurrenceRule).
///
/// A `Recur` can be built field by field, or parsed from RRULE value text
/// like `FREQ=MONTHLY;BYDAY=1SA;COUNT=3`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Recur {
    pub freq: Option<String>,
    pub interval: Option<i64>,
    pub count: Option<i64>,
    pub until: Option<Until>,
    pub week_start: Option<String>,
    pub by_day: Vec<String>,
    pub by_hour: Vec<i64>,
    pub by_minute: Vec<i64>,
    pub by_second: Vec<i64>,
    pub by_month: Vec<i64>,
    pub by_year_day: Vec<i64>,
    /// Every rule part not listed above, in the order it appeared, with its
    /// name upper-cased.
    pub other: Vec<(String, String)>,
}

impl Recur {
    /// Returns a `Recur` with only the given frequency set.
    pub fn new(freq: impl Into<String>) -> Recur {
        Recur { freq: Some(freq.into()), ..Recur::default() }
    }
}

impl std::str::FromStr for Recur {
    type Err = Error;

    fn from_str(s: &str) -> Result<Recur, Error> {
        let s = s.trim();
        let s = match s.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &s[6..],
            _ => s,
        };
        if s.is_empty() {
            return Err(Error::rule("recurrence rule is empty"));
        }

        let mut recur = Recur::default();
        let mut seen: Vec<String> = vec![];
        // A trailing `;` is common enough in the wild that we permit empty
        // parts instead of rejecting them.
        for part in s.split(';').filter(|part| !part.is_empty()) {
            let Some((name, value)) = part.split_once('=') else {
                return Err(Error::rule(format!(
                    "rule part `{part}` is not of the form NAME=VALUE",
                )));
            };
            let name = name.trim().to_ascii_uppercase();
            let value = value.trim();
            if seen.contains(&name) {
                return Err(Error::rule(format!(
                    "rule part `{name}` must not occur more than once",
                )));
            }
            seen.push(name.clone());

            match &*name {
                "FREQ" => recur.freq = Some(value.to_string()),
                "INTERVAL" => recur.interval = Some(integer(&name, value)?),
                "COUNT" => recur.count = Some(integer(&name, value)?),
                "UNTIL" => recur.until = Some(value.parse()?),
                "WKST" => recur.week_start = Some(value.to_string()),
                "BYDAY" => {
                    recur.by_day = list(&name, value)?
                        .map(|token| token.to_string())
                        .collect();
                }
                "BYHOUR" => recur.by_hour = integers(&name, value)?,
                "BYMINUTE" => recur.by_minute = integers(&name, value)?,
                "BYSECOND" => recur.by_second = integers(&name, value)?,
                "BYMONTH" => recur.by_month = integers(&name, value)?,
                "BYYEARDAY" => recur.by_year_day = integers(&name, value)?,
                _ => recur.other.push((name, value.to_string())),
            }
        }
        Ok(recur)
    }
}

/// The inclusive end of a recurrence.
///
/// RFC 5545 permits UNTIL to be a date, a "floating" local datetime or a UTC
/// datetime. Dates and local datetimes are interpreted in the time zone of the
/// event being expanded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Until {
    Date(civil::Date),
    DateTime(civil::DateTime),
    Timestamp(Timestamp),
}

impl Until {
    /// Returns the last instant included by this bound in the given time
    /// zone.
    ///
    /// A date includes every instant on that day.
    pub fn to_zoned(&self, tz: &TimeZone) -> Result<Zoned, jiff::Error> {
        match *self {
            Until::Date(date) => {
                date.to_datetime(Time::MAX).to_zoned(tz.clone())
            }
            Until::DateTime(dt) => dt.to_zoned(tz.clone()),
            Until::Timestamp(ts) => Ok(ts.to_zoned(tz.clone())),
        }
    }
}

impl std::str::FromStr for Until {
    type Err = Error;

    fn from_str(s: &str) -> Result<Until, Error> {
        let invalid = |reason: String| Error::InvalidUntil {
            value: s.to_string(),
            reason,
        };
        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

        let (body, utc) = match s.strip_suffix('Z') {
            Some(body) => (body, true),
            None => (s, false),
        };
        match body.split_once('T') {
            None if !utc && body.len() == 8 && digits(body) => {
                let date = body
                    .parse::<civil::Date>()
                    .map_err(|err| invalid(err.to_string()))?;
                Ok(Until::Date(date))
            }
            Some((date, time))
                if date.len() == 8
                    && time.len() == 6
                    && digits(date)
                    && digits(time) =>
            {
                let dt = body
                    .parse::<civil::DateTime>()
                    .map_err(|err| invalid(err.to_string()))?;
                if !utc {
                    return Ok(Until::DateTime(dt));
                }
                let ts = dt
                    .to_zoned(TimeZone::UTC)
                    .map_err(|err| invalid(err.to_string()))?
                    .timestamp();
                Ok(Until::Timestamp(ts))
            }
            _ => Err(invalid(
                "expected YYYYMMDD, YYYYMMDDTHHMMSS or YYYYMMDDTHHMMSSZ"
                    .to_string(),
            )),
        }
    }
}

impl std::fmt::Display for Until {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Until::Date(date) => write!(f, "{}", date.strftime("%Y%m%d")),
            Until::DateTime(dt) => {
                write!(f, "{}", dt.strftime("%Y%m%dT%H%M%S"))
            }
            Until::Timestamp(ts) => {
                write!(f, "{}", ts.strftime("%Y%m%dT%H%M%SZ"))
            }
        }
    }
}

impl From<civil::Date> for Until {
    fn from(date: civil::Date) -> Until {
        Until::Date(date)
    }
}

impl From<civil::DateTime> for Until {
    fn from(dt: civil::DateTime) -> Until {
        Until::DateTime(dt)
    }
}

impl From<Timestamp> for Until {
    fn from(ts: Timestamp) -> Until {
        Until::Timestamp(ts)
    }
}

impl From<Zoned> for Until {
    fn from(zdt: Zoned) -> Until {
        Until::Timestamp(zdt.timestamp())
    }
}

fn integer(name: &str, value: &str) -> Result<i64, Error> {
    value.parse::<i64>().map_err(|_| {
        Error::rule(format!("{name} value `{value}` is not a valid integer"))
    })
}

fn integers(name: &str, value: &str) -> Result<Vec<i64>, Error> {
    list(name, value)?.map(|v| integer(name, v)).collect()
}

fn list<'v>(
    name: &str,
    value: &'v str,
) -> Result<impl Iterator<Item = &'v str>, Error> {
    if value.split(',').any(|v| v.trim().is_empty()) {
        return Err(Error::rule(format!(
            "{name} value `{value}` must be a non-empty comma separated list",
        )));
    }
    Ok(value.split(',').map(str::trim))
}
