use anyhow::{Context, Result};
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

#[must_use]
pub fn generated_at_utc_now() -> String {
    format_utc(OffsetDateTime::now_utc())
}

#[must_use]
pub fn format_utc(dt: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.millisecond()
    )
}

pub fn parse_stop_date(raw: &str) -> Result<Date> {
    let trimmed = raw.trim();
    let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
    Date::parse(date_part, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("stop date must be YYYY-MM-DD, got `{trimmed}`"))
}

/// Accepts `HH:MM`, `HH:MM:SS`, or a full `YYYY-MM-DD HH:MM:SS` stamp.
pub fn parse_stop_time(raw: &str) -> Result<Time> {
    let trimmed = raw.trim();
    let time_part = trimmed.rsplit([' ', 'T']).next().unwrap_or(trimmed);
    Time::parse(time_part, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(time_part, format_description!("[hour]:[minute]")))
        .with_context(|| format!("stop time must be HH:MM or HH:MM:SS, got `{trimmed}`"))
}

/// `hh:MM AM|PM`, the clock shown in prediction narratives.
#[must_use]
pub fn format_clock_12h(time: Time) -> String {
    let (hour, minute) = (time.hour(), time.minute());
    let period = if hour < 12 { "AM" } else { "PM" };
    let hour_12 = match hour % 12 {
        0 => 12,
        other => other,
    };
    format!("{hour_12:02}:{minute:02} {period}")
}

#[must_use]
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};

    use super::{format_clock_12h, format_date, format_utc, parse_stop_date, parse_stop_time};

    #[test]
    fn utc_stamp_has_millisecond_precision_and_zulu_suffix() {
        let formatted = format_utc(datetime!(2026-02-25 08:05:09.123 UTC));
        assert_eq!(formatted, "2026-02-25T08:05:09.123Z");
    }

    #[test]
    fn stop_time_accepts_short_long_and_stamped_forms() {
        assert_eq!(parse_stop_time("14:30").expect("short form"), time!(14:30));
        assert_eq!(
            parse_stop_time("07:05:59").expect("long form"),
            time!(07:05:59)
        );
        assert_eq!(
            parse_stop_time("2020-01-01 23:10:00").expect("stamped form"),
            time!(23:10)
        );
        assert!(parse_stop_time("25:00").is_err());
    }

    #[test]
    fn stop_date_ignores_trailing_time_component() {
        assert_eq!(
            parse_stop_date("2020-03-04 00:00:00").expect("stamped date"),
            date!(2020-03-04)
        );
        assert!(parse_stop_date("04/03/2020").is_err());
        assert_eq!(format_date(date!(2020-03-04)), "2020-03-04");
    }

    #[test]
    fn clock_renders_twelve_hour_with_period() {
        assert_eq!(format_clock_12h(time!(14:05)), "02:05 PM");
        assert_eq!(format_clock_12h(time!(00:15)), "12:15 AM");
        assert_eq!(format_clock_12h(time!(12:00)), "12:00 PM");
    }
}
