use ical_schedule::{
    ByDay, DayCode, Error, Frequency, PositionalDay, Recur, RecurrenceRule,
    Until, parse_byday, weekday_from_day_code,
};
use jiff::civil::{Weekday, date};

fn translate(recur: &Recur) -> Result<RecurrenceRule, Error> {
    crate::logger::init();
    RecurrenceRule::from_recur(recur)
}

#[test]
fn day_codes() {
    let codes = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"];
    let weekdays = codes
        .iter()
        .map(|code| weekday_from_day_code(code).unwrap())
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

    assert_eq!(
        weekday_from_day_code("SN"),
        Err(Error::InvalidDayCode { code: "SN".to_string() }),
    );
}

#[test]
fn byday_tokens() {
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
        ByDay::from_tokens(&["MO", "WE", "FR"]).unwrap(),
        ByDay::DayFilter(vec![
            Weekday::Monday,
            Weekday::Wednesday,
            Weekday::Friday,
        ]),
    );
    let ByDay::PositionalDays(days) = ByDay::from_tokens(&["1SA"]).unwrap()
    else {
        panic!("expected positional days")
    };
    assert_eq!(days.get(Weekday::Saturday), Some(&[1][..]));
    let ByDay::PositionalDays(days) =
        ByDay::from_tokens(&["1FR", "3FR"]).unwrap()
    else {
        panic!("expected positional days")
    };
    assert_eq!(days.get(Weekday::Friday), Some(&[1, 3][..]));
}

#[test]
fn translate_from_fields() {
    let recur = Recur {
        by_hour: vec![1],
        by_minute: vec![2],
        by_second: vec![3],
        by_month: vec![4, 5],
        by_year_day: vec![6],
        ..Recur::new("DAILY")
    };
    let rule = translate(&recur).unwrap();
    assert_eq!(rule.frequency(), Frequency::Daily);
    assert_eq!(rule.by_hour(), Some(&[1][..]));
    assert_eq!(rule.by_minute(), Some(&[2][..]));
    assert_eq!(rule.by_second(), Some(&[3][..]));
    assert_eq!(rule.by_month(), Some(&[4, 5][..]));
    assert_eq!(rule.by_year_day(), Some(&[6][..]));
    assert_eq!(rule.by_day(), None);
    assert_eq!(rule.interval(), 1);
    assert_eq!(rule.bound(), None);
}

#[test]
fn translate_week_start() {
    let recur = Recur {
        week_start: Some("TU".to_string()),
        ..Recur::new("WEEKLY")
    };
    let rule = translate(&recur).unwrap();
    assert_eq!(rule.frequency(), Frequency::Weekly);
    assert_eq!(rule.week_start(), Weekday::Tuesday);
}

#[test]
fn translate_until() {
    let recur = Recur {
        until: Some(Until::Date(date(2014, 3, 1))),
        ..Recur::new("DAILY")
    };
    let rule = translate(&recur).unwrap();
    assert_eq!(rule.until(), Some(Until::Date(date(2014, 3, 1))));
    assert_eq!(rule.to_string(), "FREQ=DAILY;UNTIL=20140301");
}

#[test]
fn malformed_rules_fail() {
    assert!(matches!(
        "COUNT:3".parse::<RecurrenceRule>(),
        Err(Error::InvalidRecurrenceRule { .. }),
    ));
    let recur = Recur { count: Some(3), ..Recur::default() };
    assert_eq!(translate(&recur), Err(Error::MissingFrequency));

    let recur = Recur {
        by_day: vec!["MO".to_string(), "1FR".to_string()],
        ..Recur::new("MONTHLY")
    };
    assert_eq!(translate(&recur), Err(Error::MixedBydayModes));

    let recur = Recur { by_hour: vec![24], ..Recur::new("DAILY") };
    assert_eq!(translate(&recur), Err(Error::InvalidHour(24)));

    let recur = Recur { interval: Some(0), ..Recur::new("DAILY") };
    assert_eq!(
        translate(&recur),
        Err(Error::InvalidInterval { interval: 0 }),
    );

    let recur = Recur {
        count: Some(2),
        until: Some(Until::Date(date(2014, 3, 1))),
        ..Recur::new("DAILY")
    };
    assert_eq!(translate(&recur), Err(Error::ConflictingBound));
}

#[test]
fn text_round_trip() {
    for text in [
        "FREQ=DAILY;COUNT=10",
        "FREQ=WEEKLY;UNTIL=19971007T000000Z;BYDAY=TU,TH;WKST=SU",
        "FREQ=MONTHLY;INTERVAL=2;COUNT=10;BYDAY=1SU,-1SU",
        "FREQ=YEARLY;BYMONTH=3;BYDAY=TH",
        "FREQ=YEARLY;INTERVAL=3;COUNT=10;BYYEARDAY=1,100,200",
        "FREQ=DAILY;BYHOUR=9,10;BYMINUTE=0,20,40",
    ] {
        let rule = text.parse::<RecurrenceRule>().unwrap();
        assert_eq!(rule.to_string(), text);
    }
}

#[test]
fn serde_round_trip() {
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    struct Stored {
        rule: RecurrenceRule,
    }

    let stored =
        Stored { rule: "FREQ=WEEKLY;BYDAY=MO,WE".parse().unwrap() };
    let json = serde_json::to_string(&stored).unwrap();
    assert_eq!(json, r#"{"rule":"FREQ=WEEKLY;BYDAY=MO,WE"}"#);
    assert_eq!(serde_json::from_str::<Stored>(&json).unwrap(), stored);

    assert!(
        serde_json::from_str::<Stored>(r#"{"rule":"FREQ=NEVER"}"#).is_err()
    );
}
