use jiff::civil::Weekday;

use crate::{daycode::DayCode, error::Error};

/// A single BYDAY token, e.g., `1SA` or `MO`.
///
/// A `position` of `0` means "every such weekday in the period." Any other
/// value selects the Nth such weekday, where negative values count backwards
/// from the end of the period.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PositionalDay {
    pub day: DayCode,
    pub position: i8,
}

impl PositionalDay {
    /// Returns true when this token has no numeric prefix.
    pub fn is_plain(&self) -> bool {
        self.position == 0
    }

    /// Returns the weekday named by this token.
    pub fn weekday(&self) -> Weekday {
        self.day.to_weekday()
    }
}

impl std::str::FromStr for PositionalDay {
    type Err = Error;

    fn from_str(token: &str) -> Result<PositionalDay, Error> {
        let invalid = |reason| Error::InvalidBydayToken {
            token: token.to_string(),
            reason,
        };

        let split = token
            .len()
            .checked_sub(2)
            .filter(|&i| token.is_char_boundary(i))
            .ok_or_else(|| invalid("expected a two-letter day code"))?;
        let (prefix, code) = token.split_at(split);
        let day = code.parse::<DayCode>().map_err(|_| {
            invalid("the last two characters are not a valid day code")
        })?;
        if prefix.is_empty() {
            return Ok(PositionalDay { day, position: 0 });
        }

        let digits = prefix.strip_prefix(['+', '-']).unwrap_or(prefix);
        if digits.is_empty()
            || digits.len() > 2
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid(
                "the ordinal prefix must be a signed one or two digit integer",
            ));
        }
        let position = prefix
            .parse::<i8>()
            .map_err(|_| invalid("the ordinal prefix is not a valid integer"))?;
        if position == 0 {
            return Err(invalid("the ordinal prefix must not be zero"));
        }
        Ok(PositionalDay { day, position })
    }
}

impl std::fmt::Display for PositionalDay {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.position != 0 {
            write!(f, "{}", self.position)?;
        }
        write!(f, "{}", self.day)
    }
}

/// Splits a BYDAY token into its day code and position.
///
/// `"1SA"` becomes `SA` at position `1`, `"-1SU"` becomes `SU` at position
/// `-1` and `"MO"` becomes `MO` at position `0`.
pub fn parse_byday(token: &str) -> Result<PositionalDay, Error> {
    token.parse()
}

/// The BYDAY part of a recurrence rule.
///
/// RFC 5545 uses BYDAY in two distinct ways. A plain list of weekdays
/// (`MO,WE,FR`) filters or expands to those days of the week. A list of
/// numbered weekdays (`1FR,3FR`) selects the Nth weekday within a month or
/// year. These are kept as two distinct cases since expansion treats them
/// differently.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ByDay {
    /// Every occurrence of these weekdays, in the order given.
    DayFilter(Vec<Weekday>),
    /// Specific occurrences of each weekday within a period.
    PositionalDays(PositionalDays),
}

impl ByDay {
    /// Builds a `ByDay` from the full list of BYDAY tokens.
    ///
    /// When no token has a numeric prefix, this returns a `DayFilter` with
    /// the weekdays in the order given. When every token has a numeric
    /// prefix, this returns `PositionalDays`. A list mixing the two is
    /// rejected.
    pub fn from_tokens<T: AsRef<str>>(tokens: &[T]) -> Result<ByDay, Error> {
        let days = tokens
            .iter()
            .map(|token| parse_byday(token.as_ref()))
            .collect::<Result<Vec<PositionalDay>, Error>>()?;
        if days.is_empty() {
            return Err(Error::rule("BYDAY must contain at least one value"));
        }
        if days.iter().all(PositionalDay::is_plain) {
            let weekdays = days.iter().map(PositionalDay::weekday).collect();
            return Ok(ByDay::DayFilter(weekdays));
        }
        if days.iter().any(PositionalDay::is_plain) {
            return Err(Error::MixedBydayModes);
        }
        let positional = days
            .iter()
            .map(|day| (day.weekday(), day.position))
            .collect::<PositionalDays>();
        Ok(ByDay::PositionalDays(positional))
    }

    /// Returns true if this is a list of numbered weekdays.
    pub fn is_positional(&self) -> bool {
        matches!(*self, ByDay::PositionalDays(_))
    }

    /// Returns every token in this BYDAY value.
    pub fn to_positional_days(&self) -> Vec<PositionalDay> {
        match *self {
            ByDay::DayFilter(ref weekdays) => weekdays
                .iter()
                .map(|&wd| PositionalDay { day: wd.into(), position: 0 })
                .collect(),
            ByDay::PositionalDays(ref days) => days
                .iter()
                .flat_map(|(wd, positions)| {
                    positions
                        .iter()
                        .map(move |&position| PositionalDay {
                            day: wd.into(),
                            position,
                        })
                })
                .collect(),
        }
    }

    /// Returns a copy with duplicates removed.
    ///
    /// Plain weekdays keep their first appearance. Positions for each weekday
    /// are sorted.
    pub(crate) fn normalize(&self) -> ByDay {
        match *self {
            ByDay::DayFilter(ref weekdays) => {
                let mut seen = vec![];
                for &wd in weekdays.iter() {
                    if !seen.contains(&wd) {
                        seen.push(wd);
                    }
                }
                ByDay::DayFilter(seen)
            }
            ByDay::PositionalDays(ref days) => {
                let entries = days
                    .entries
                    .iter()
                    .map(|(wd, positions)| {
                        let mut positions = positions.clone();
                        positions.sort();
                        positions.dedup();
                        (*wd, positions)
                    })
                    .collect();
                ByDay::PositionalDays(PositionalDays { entries })
            }
        }
    }
}

impl std::fmt::Display for ByDay {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, day) in self.to_positional_days().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{day}")?;
        }
        Ok(())
    }
}

/// An ordered mapping from weekday to the positions requested for it.
///
/// Weekdays appear in the order they were first seen. The positions for
/// each weekday appear in the order they were given.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PositionalDays {
    entries: Vec<(Weekday, Vec<i8>)>,
}

impl PositionalDays {
    /// Returns the positions requested for the given weekday, if any.
    pub fn get(&self, weekday: Weekday) -> Option<&[i8]> {
        self.entries
            .iter()
            .find(|(wd, _)| *wd == weekday)
            .map(|(_, positions)| positions.as_slice())
    }

    /// Returns an iterator over each weekday and its positions.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[i8])> {
        self.entries.iter().map(|(wd, positions)| (*wd, positions.as_slice()))
    }

    /// Returns the number of distinct weekdays in this mapping.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when this mapping has no weekdays.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, weekday: Weekday, position: i8) {
        match self.entries.iter_mut().find(|(wd, _)| *wd == weekday) {
            Some((_, positions)) => positions.push(position),
            None => self.entries.push((weekday, vec![position])),
        }
    }
}

impl FromIterator<(Weekday, i8)> for PositionalDays {
    fn from_iter<I: IntoIterator<Item = (Weekday, i8)>>(
        it: I,
    ) -> PositionalDays {
        let mut days = PositionalDays::default();
        for (weekday, position) in it {
            days.push(weekday, position);
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::Weekday::*;

    fn positional(
        it: impl IntoIterator<Item = (Weekday, i8)>,
    ) -> ByDay {
        ByDay::PositionalDays(it.into_iter().collect())
    }

    #[test]
    fn parse_tokens() {
        assert_eq!(
            parse_byday("1SA").unwrap(),
            PositionalDay { day: DayCode::Sa, position: 1 },
        );
        assert_eq!(
            parse_byday("MO").unwrap(),
            PositionalDay { day: DayCode::Mo, position: 0 },
        );
        assert_eq!(
            parse_byday("-2SU").unwrap(),
            PositionalDay { day: DayCode::Su, position: -2 },
        );
        assert_eq!(
            parse_byday("+3TH").unwrap(),
            PositionalDay { day: DayCode::Th, position: 3 },
        );
        assert_eq!(
            parse_byday("53FR").unwrap(),
            PositionalDay { day: DayCode::Fr, position: 53 },
        );
    }

    #[test]
    fn parse_token_errors() {
        insta::assert_snapshot!(
            parse_byday("1XX").unwrap_err(),
            @"invalid BYDAY token `1XX`: the last two characters are not a valid day code",
        );
        insta::assert_snapshot!(
            parse_byday("M").unwrap_err(),
            @"invalid BYDAY token `M`: expected a two-letter day code",
        );
        insta::assert_snapshot!(
            parse_byday("xMO").unwrap_err(),
            @"invalid BYDAY token `xMO`: the ordinal prefix must be a signed one or two digit integer",
        );
        insta::assert_snapshot!(
            parse_byday("-MO").unwrap_err(),
            @"invalid BYDAY token `-MO`: the ordinal prefix must be a signed one or two digit integer",
        );
        insta::assert_snapshot!(
            parse_byday("100MO").unwrap_err(),
            @"invalid BYDAY token `100MO`: the ordinal prefix must be a signed one or two digit integer",
        );
        insta::assert_snapshot!(
            parse_byday("0MO").unwrap_err(),
            @"invalid BYDAY token `0MO`: the ordinal prefix must not be zero",
        );
        assert!(matches!(
            parse_byday("1sa"),
            Err(Error::InvalidBydayToken { .. }),
        ));
        assert!(matches!(
            parse_byday("1é"),
            Err(Error::InvalidBydayToken { .. }),
        ));
    }

    #[test]
    fn display_round_trips() {
        for token in ["1SA", "-1SU", "MO", "53FR", "-5TU"] {
            assert_eq!(parse_byday(token).unwrap().to_string(), token);
        }
        assert_eq!(parse_byday("+2WE").unwrap().to_string(), "2WE");
    }

    #[test]
    fn plain_days_keep_their_order() {
        assert_eq!(
            ByDay::from_tokens(&["MO", "WE", "FR"]).unwrap(),
            ByDay::DayFilter(vec![Monday, Wednesday, Friday]),
        );
        assert_eq!(
            ByDay::from_tokens(&["FR", "MO"]).unwrap(),
            ByDay::DayFilter(vec![Friday, Monday]),
        );
    }

    #[test]
    fn positional_days_group_by_weekday() {
        assert_eq!(
            ByDay::from_tokens(&["1SA"]).unwrap(),
            positional([(Saturday, 1)]),
        );
        let byday = ByDay::from_tokens(&["1FR", "3FR"]).unwrap();
        assert_eq!(byday, positional([(Friday, 1), (Friday, 3)]));
        let ByDay::PositionalDays(ref days) = byday else {
            panic!("expected positional days, got {byday:?}")
        };
        assert_eq!(days.get(Friday), Some(&[1, 3][..]));
        assert_eq!(days.get(Monday), None);
        assert_eq!(days.len(), 1);

        let byday = ByDay::from_tokens(&["-1SU", "2MO", "1SU"]).unwrap();
        let ByDay::PositionalDays(ref days) = byday else {
            panic!("expected positional days, got {byday:?}")
        };
        assert_eq!(
            days.iter().collect::<Vec<_>>(),
            vec![(Sunday, &[-1, 1][..]), (Monday, &[2][..])],
        );
    }

    #[test]
    fn mixed_modes_are_rejected() {
        assert_eq!(
            ByDay::from_tokens(&["MO", "1FR"]),
            Err(Error::MixedBydayModes),
        );
        assert_eq!(
            ByDay::from_tokens(&["1FR", "MO"]),
            Err(Error::MixedBydayModes),
        );
    }

    #[test]
    fn empty_and_invalid_lists_are_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            ByDay::from_tokens(&empty),
            Err(Error::InvalidRecurrenceRule { .. }),
        ));
        assert!(matches!(
            ByDay::from_tokens(&["MO", "XX"]),
            Err(Error::InvalidBydayToken { .. }),
        ));
    }

    #[test]
    fn normalize_removes_duplicates() {
        let byday = ByDay::from_tokens(&["FR", "MO", "FR"]).unwrap();
        assert_eq!(byday.normalize(), ByDay::DayFilter(vec![Friday, Monday]));

        let byday = ByDay::from_tokens(&["3FR", "1FR", "3FR"]).unwrap();
        assert_eq!(byday.normalize(), positional([(Friday, 1), (Friday, 3)]));
        assert_eq!(byday.normalize().to_string(), "1FR,3FR");
    }
}
