use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  Local,
  NaiveDate,
  SubsecRound,
  Utc,
  Weekday
};

/// Display format for calendar dates
/// when nothing is configured. Matches
/// the en-US short date (`1/5/2024`).
pub const DEFAULT_DATE_FORMAT: &str =
  "%-m/%-d/%Y";

/// Source of "now" for the store.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate {
    self
      .now()
      .with_timezone(&Local)
      .date_naive()
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  // Persisted timestamps carry
  // millisecond precision, so truncate
  // here to keep save/load lossless.
  fn now(&self) -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(
  pub DateTime<Utc>
);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }

  fn today(&self) -> NaiveDate {
    self.0.date_naive()
  }
}

#[must_use]
pub fn format_date(
  date: NaiveDate,
  format: &str
) -> String {
  date.format(format).to_string()
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "date out of range: \
             tomorrow"
          )
        });
    }
    | "yesterday" => {
      return today
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "date out of range: \
             yesterday"
          )
        });
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    return NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    });
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return next_weekday_date(
      today, target
    )
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {token}"
      )
    });
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    let mut year = today.year();
    if month <= today.month() {
      year += 1;
    }
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month value: {month}"
      )
    });
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "unrecognized date: {token} \
       (expected YYYY-MM-DD, today, \
       tomorrow, a weekday or a month)"
    )
  })
}

fn parse_weekday_name(
  s: &str
) -> Option<Weekday> {
  match s {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  today: NaiveDate,
  target: Weekday
) -> Option<NaiveDate> {
  let current = today
    .weekday()
    .num_days_from_monday();
  let wanted =
    target.num_days_from_monday();
  let mut delta =
    (7 + wanted - current) % 7;
  if delta == 0 {
    delta = 7;
  }
  today.checked_add_days(Days::new(
    u64::from(delta)
  ))
}

fn parse_month_name(
  s: &str
) -> Option<u32> {
  match s {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

/// ISO-8601 UTC timestamps with
/// millisecond precision, the shape
/// browsers produce for `createdAt`.
pub mod iso_millis_serde {
  use chrono::{
    DateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  const FORMAT: &str =
    "%Y-%m-%dT%H:%M:%S%.3fZ";

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt.format(FORMAT).to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    DateTime::parse_from_rfc3339(&raw)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    Clock,
    FixedClock,
    format_date,
    parse_date_expr
  };

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_iso_calendar_date() {
    let parsed = parse_date_expr(
      "2024-03-01",
      day(2026, 2, 17)
    )
    .expect("parse iso");
    assert_eq!(parsed, day(2024, 3, 1));
  }

  #[test]
  fn parses_relative_words() {
    let today = day(2026, 2, 28);
    assert_eq!(
      parse_date_expr("today", today)
        .expect("today"),
      today
    );
    assert_eq!(
      parse_date_expr(
        "Tomorrow", today
      )
      .expect("tomorrow"),
      day(2026, 3, 1)
    );
  }

  #[test]
  fn parses_weekday_name() {
    // 2026-02-17 is a Tuesday.
    let parsed = parse_date_expr(
      "wednesday",
      day(2026, 2, 17)
    )
    .expect("parse weekday");
    assert_eq!(parsed, day(2026, 2, 18));

    let same_day = parse_date_expr(
      "tue",
      day(2026, 2, 17)
    )
    .expect("parse weekday");
    assert_eq!(
      same_day,
      day(2026, 2, 24)
    );
  }

  #[test]
  fn weekday_past_last_date_is_an_error() {
    let last = NaiveDate::MAX;
    assert!(
      parse_date_expr("monday", last)
        .is_err()
    );
    assert!(
      parse_date_expr(
        "tomorrow", last
      )
      .is_err()
    );
  }

  #[test]
  fn parses_month_name() {
    let parsed = parse_date_expr(
      "march",
      day(2026, 2, 17)
    )
    .expect("parse month");
    assert_eq!(parsed, day(2026, 3, 1));

    let wrapped = parse_date_expr(
      "jan",
      day(2026, 2, 17)
    )
    .expect("parse month");
    assert_eq!(wrapped, day(2027, 1, 1));
  }

  #[test]
  fn rejects_garbage() {
    assert!(
      parse_date_expr(
        "someday",
        day(2026, 2, 17)
      )
      .is_err()
    );
  }

  #[test]
  fn formats_short_us_date() {
    assert_eq!(
      format_date(
        day(2024, 1, 5),
        super::DEFAULT_DATE_FORMAT
      ),
      "1/5/2024"
    );
  }

  #[test]
  fn fixed_clock_reports_utc_day() {
    let clock = FixedClock(
      Utc
        .with_ymd_and_hms(
          2024, 3, 1, 23, 30, 0
        )
        .single()
        .expect("valid now")
    );
    assert_eq!(
      clock.today(),
      day(2024, 3, 1)
    );
  }
}
