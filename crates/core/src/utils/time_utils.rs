use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Anything that can be reduced to the calendar day prices are keyed by.
pub trait AsDay {
    fn as_day(&self) -> NaiveDate;
}

impl AsDay for NaiveDate {
    fn as_day(&self) -> NaiveDate {
        *self
    }
}

impl AsDay for DateTime<Utc> {
    fn as_day(&self) -> NaiveDate {
        self.date_naive()
    }
}

impl AsDay for NaiveDateTime {
    fn as_day(&self) -> NaiveDate {
        self.date()
    }
}

impl<T: AsDay + ?Sized> AsDay for &T {
    fn as_day(&self) -> NaiveDate {
        (**self).as_day()
    }
}

/// Parses the leading `YYYY-MM-DD` of a date or timestamp string.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
