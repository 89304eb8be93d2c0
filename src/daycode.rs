use jiff::civil::Weekday;

use crate::error::Error;

/// One of the seven two-letter weekday codes used by RFC 5545.
///
/// The ordering starts on Monday. This is the ordering used for sorting and
/// de-duplication only. The start of a week for the purposes of generating
/// datetimes is determined by a rule's `WKST` value.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DayCode {
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
    Su,
}

impl DayCode {
    /// All day codes, starting with Monday.
    pub const ALL: [DayCode; 7] = [
        DayCode::Mo,
        DayCode::Tu,
        DayCode::We,
        DayCode::Th,
        DayCode::Fr,
        DayCode::Sa,
        DayCode::Su,
    ];

    /// Returns the weekday corresponding to this code.
    pub fn to_weekday(self) -> Weekday {
        match self {
            DayCode::Mo => Weekday::Monday,
            DayCode::Tu => Weekday::Tuesday,
            DayCode::We => Weekday::Wednesday,
            DayCode::Th => Weekday::Thursday,
            DayCode::Fr => Weekday::Friday,
            DayCode::Sa => Weekday::Saturday,
            DayCode::Su => Weekday::Sunday,
        }
    }

    /// Returns the code for the given weekday.
    pub fn from_weekday(weekday: Weekday) -> DayCode {
        match weekday {
            Weekday::Monday => DayCode::Mo,
            Weekday::Tuesday => DayCode::Tu,
            Weekday::Wednesday => DayCode::We,
            Weekday::Thursday => DayCode::Th,
            Weekday::Friday => DayCode::Fr,
            Weekday::Saturday => DayCode::Sa,
            Weekday::Sunday => DayCode::Su,
        }
    }

    /// Returns the two-letter code as it appears in RRULE text.
    pub fn as_str(self) -> &'static str {
        match self {
            DayCode::Mo => "MO",
            DayCode::Tu => "TU",
            DayCode::We => "WE",
            DayCode::Th => "TH",
            DayCode::Fr => "FR",
            DayCode::Sa => "SA",
            DayCode::Su => "SU",
        }
    }
}

impl std::str::FromStr for DayCode {
    type Err = Error;

    /// Parses a day code.
    ///
    /// Matching is case sensitive. `mo` is not a day code.
    fn from_str(s: &str) -> Result<DayCode, Error> {
        let code = match s {
            "MO" => DayCode::Mo,
            "TU" => DayCode::Tu,
            "WE" => DayCode::We,
            "TH" => DayCode::Th,
            "FR" => DayCode::Fr,
            "SA" => DayCode::Sa,
            "SU" => DayCode::Su,
            _ => return Err(Error::InvalidDayCode { code: s.to_string() }),
        };
        Ok(code)
    }
}

impl std::fmt::Display for DayCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DayCode> for Weekday {
    fn from(code: DayCode) -> Weekday {
        code.to_weekday()
    }
}

impl From<Weekday> for DayCode {
    fn from(weekday: Weekday) -> DayCode {
        DayCode::from_weekday(weekday)
    }
}

/// Maps a two-letter RRULE day code (e.g., `SA`) to its weekday.
pub fn weekday_from_day_code(code: &str) -> Result<Weekday, Error> {
    code.parse::<DayCode>().map(DayCode::to_weekday)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_maps_to_a_distinct_weekday() {
        let weekdays = DayCode::ALL
            .iter()
            .map(|code| weekday_from_day_code(code.as_str()).unwrap())
            .collect::<Vec<Weekday>>();
        assert_eq!(
            weekdays,
            vec![
                Weekday::Monday,
                Weekday::Tuesday,
                Weekday::Wednesday,
                Weekday::Thursday,
                Weekday::Friday,
                Weekday::Saturday,
                Weekday::Sunday,
            ],
        );
        for code in DayCode::ALL {
            assert_eq!(DayCode::from_weekday(code.to_weekday()), code);
        }
    }

    #[test]
    fn monday() {
        assert_eq!(weekday_from_day_code("MO").unwrap(), Weekday::Monday);
    }

    #[test]
    fn other_two_letter_strings_are_rejected() {
        for code in ["mo", "Mo", "XX", "SN", "M0", "  "] {
            assert_eq!(
                weekday_from_day_code(code),
                Err(Error::InvalidDayCode { code: code.to_string() }),
            );
        }
        insta::assert_snapshot!(
            weekday_from_day_code("XX").unwrap_err(),
            @"invalid day code `XX` (expected one of MO, TU, WE, TH, FR, SA or SU)",
        );
    }

    #[test]
    fn ordering_starts_on_monday() {
        let mut codes = vec![DayCode::Su, DayCode::We, DayCode::Mo];
        codes.sort();
        assert_eq!(codes, vec![DayCode::Mo, DayCode::We, DayCode::Su]);
    }
}
