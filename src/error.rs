use crate::rule::Frequency;

/// An error that can occur when translating a recurrence rule.
///
/// Every error is reported at translation time. Once a `RecurrenceRule`
/// exists, expanding it cannot fail.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(
        "invalid day code `{code}` \
         (expected one of MO, TU, WE, TH, FR, SA or SU)"
    )]
    InvalidDayCode { code: String },
    #[error("invalid BYDAY token `{token}`: {reason}")]
    InvalidBydayToken { token: String, reason: &'static str },
    #[error(
        "BYDAY mixes plain weekdays (e.g., `MO`) with numbered weekdays \
         (e.g., `1MO`), which is not supported"
    )]
    MixedBydayModes,
    #[error("recurrence rule is missing the required FREQ part")]
    MissingFrequency,
    #[error("unrecognized frequency: `{value}`")]
    UnknownFrequency { value: String },
    #[error(
        "interval value of `{interval}` is invalid \
         (interval must be greater than or equal to 1)"
    )]
    InvalidInterval { interval: i64 },
    #[error(
        "count value of `{count}` is invalid \
         (count must be greater than or equal to 1)"
    )]
    InvalidCount { count: i64 },
    #[error("COUNT and UNTIL cannot both be used in the same recurrence rule")]
    ConflictingBound,
    #[error("invalid UNTIL value `{value}`: {reason}")]
    InvalidUntil { value: String, reason: String },
    #[error("invalid recurrence rule: {reason}")]
    InvalidRecurrenceRule { reason: String },
    #[error("invalid 'by hour' value `{0}` (values must be in range 0..=23)")]
    InvalidHour(i64),
    #[error(
        "invalid 'by minute' value `{0}` (values must be in range 0..=59)"
    )]
    InvalidMinute(i64),
    #[error(
        "invalid 'by second' value `{0}` (values must be in range 0..=59)"
    )]
    InvalidSecond(i64),
    #[error("invalid 'by month' value `{0}` (values must be in range 1..=12)")]
    InvalidMonth(i64),
    #[error(
        "invalid 'by day of the year' value `{0}` \
         (values must be in range 1..=366 or -366..=-1)"
    )]
    InvalidYearDay(i64),
    #[error("invalid numbered weekday `{day}` with FREQ={freq} ({reason})")]
    InvalidBydayPosition {
        day: String,
        freq: Frequency,
        reason: &'static str,
    },
    #[error("event duration `{duration}` is invalid (must not be negative)")]
    InvalidDuration { duration: jiff::SignedDuration },
}

impl Error {
    pub(crate) fn rule(reason: impl Into<String>) -> Error {
        Error::InvalidRecurrenceRule { reason: reason.into() }
    }
}
