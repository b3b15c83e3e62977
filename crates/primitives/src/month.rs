use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MonthRange;

/// Errors produced when parsing a `YYYY-MM` month key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthParseError {
	/// The key is not of the form `YYYY-MM`.
	#[error("malformed month key '{0}' (expected YYYY-MM)")]
	Malformed(String),
	/// The month component is outside `01..=12`.
	#[error("month out of range in '{0}'")]
	MonthOutOfRange(String),
	/// The year component is outside `0001..=9999`.
	#[error("year out of range in '{0}'")]
	YearOutOfRange(String),
}

/// Today's date on the local clock.
pub fn today() -> NaiveDate {
	chrono::Local::now().date_naive()
}

/// A Gregorian calendar month.
///
/// Ordering is chronological. The canonical key form produced by [`fmt::Display`]
/// and accepted by [`FromStr`] is `YYYY-MM`, so years are confined to
/// `1..=9999`; arithmetic saturates at those bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
	year: i32,
	/// 1-based month number.
	month: u32,
}

impl Month {
	/// Earliest representable month.
	pub const MIN: Month = Month { year: 1, month: 1 };
	/// Latest representable month.
	pub const MAX: Month = Month { year: 9999, month: 12 };

	/// Creates a month from a year and a 1-based month number.
	pub fn new(year: i32, month: u32) -> Option<Self> {
		((1..=9999).contains(&year) && (1..=12).contains(&month)).then_some(Self { year, month })
	}

	/// Returns the month containing `date`.
	pub fn from_date(date: NaiveDate) -> Self {
		Self::from_ordinal(i64::from(date.year()) * 12 + i64::from(date.month0()))
	}

	/// Returns the current month on the local clock.
	pub fn today() -> Self {
		Self::from_date(today())
	}

	pub const fn year(self) -> i32 {
		self.year
	}

	/// 1-based month number.
	pub const fn month(self) -> u32 {
		self.month
	}

	fn ordinal(self) -> i64 {
		i64::from(self.year) * 12 + i64::from(self.month - 1)
	}

	fn from_ordinal(ordinal: i64) -> Self {
		let ordinal = ordinal.clamp(Self::MIN.ordinal(), Self::MAX.ordinal());
		Self {
			year: ordinal.div_euclid(12) as i32,
			month: ordinal.rem_euclid(12) as u32 + 1,
		}
	}

	/// Adds `delta` months (negative subtracts), saturating at [`Self::MIN`] and [`Self::MAX`].
	pub fn offset(self, delta: i64) -> Self {
		Self::from_ordinal(self.ordinal().saturating_add(delta))
	}

	pub fn prev(self) -> Self {
		self.offset(-1)
	}

	pub fn next(self) -> Self {
		self.offset(1)
	}

	/// Signed number of months from `self` to `other`.
	pub fn months_until(self, other: Month) -> i64 {
		other.ordinal() - self.ordinal()
	}

	pub fn is_leap_year(self) -> bool {
		(self.year % 4 == 0 && self.year % 100 != 0) || self.year % 400 == 0
	}

	pub fn days_in_month(self) -> u32 {
		match self.month {
			2 if self.is_leap_year() => 29,
			2 => 28,
			4 | 6 | 9 | 11 => 30,
			_ => 31,
		}
	}

	pub fn first_day(self) -> NaiveDate {
		NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated month has a first day")
	}

	pub fn last_day(self) -> NaiveDate {
		NaiveDate::from_ymd_opt(self.year, self.month, self.days_in_month()).expect("validated month has a last day")
	}

	/// Returns the day `day` of this month, if it exists.
	pub fn day(self, day: u32) -> Option<NaiveDate> {
		NaiveDate::from_ymd_opt(self.year, self.month, day)
	}

	/// Same-month comparison.
	pub fn contains(self, date: NaiveDate) -> bool {
		date.year() == self.year && date.month() == self.month
	}

	/// Weekday of the first day, with Sunday as index 0.
	pub fn first_weekday(self) -> u32 {
		self.first_day().weekday().num_days_from_sunday()
	}

	/// Number of Sunday-first week rows the month grid spans (4 to 6).
	pub fn week_rows(self) -> u32 {
		(self.first_weekday() + self.days_in_month()).div_ceil(7)
	}

	/// Inclusive day range covering this month.
	pub fn range(self) -> MonthRange {
		MonthRange {
			start: self.first_day(),
			end: self.last_day(),
		}
	}
}

impl fmt::Display for Month {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:04}-{:02}", self.year, self.month)
	}
}

impl FromStr for Month {
	type Err = MonthParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let malformed = || MonthParseError::Malformed(s.to_string());
		let (year, month) = s.split_once('-').ok_or_else(malformed)?;
		if year.len() != 4 || month.len() != 2 || !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
			return Err(malformed());
		}
		let year: i32 = year.parse().map_err(|_| malformed())?;
		let month: u32 = month.parse().map_err(|_| malformed())?;
		if !(1..=12).contains(&month) {
			return Err(MonthParseError::MonthOutOfRange(s.to_string()));
		}
		Self::new(year, month).ok_or_else(|| MonthParseError::YearOutOfRange(s.to_string()))
	}
}

impl TryFrom<String> for Month {
	type Error = MonthParseError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<Month> for String {
	fn from(value: Month) -> Self {
		value.to_string()
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	fn m(s: &str) -> Month {
		s.parse().unwrap()
	}

	#[test]
	fn key_round_trips_through_display() {
		assert_eq!(m("2024-05").to_string(), "2024-05");
		assert_eq!(m("0987-01").year(), 987);
	}

	#[test]
	fn rejects_malformed_keys() {
		assert!(matches!("2024-5".parse::<Month>(), Err(MonthParseError::Malformed(_))));
		assert!(matches!("2024/05".parse::<Month>(), Err(MonthParseError::Malformed(_))));
		assert!(matches!("2024-13".parse::<Month>(), Err(MonthParseError::MonthOutOfRange(_))));
		assert!(matches!("0000-01".parse::<Month>(), Err(MonthParseError::YearOutOfRange(_))));
	}

	#[test]
	fn offset_crosses_year_boundaries() {
		assert_eq!(m("2024-01").prev(), m("2023-12"));
		assert_eq!(m("2023-12").next(), m("2024-01"));
		assert_eq!(m("2024-02").offset(-14), m("2022-12"));
		assert_eq!(m("2024-02").offset(23), m("2026-01"));
	}

	#[test]
	fn offset_saturates_at_bounds() {
		assert_eq!(Month::MAX.next(), Month::MAX);
		assert_eq!(Month::MIN.prev(), Month::MIN);
	}

	#[test]
	fn month_lengths_follow_gregorian_rules() {
		assert_eq!(m("2024-02").days_in_month(), 29);
		assert_eq!(m("2023-02").days_in_month(), 28);
		assert_eq!(m("1900-02").days_in_month(), 28);
		assert_eq!(m("2000-02").days_in_month(), 29);
		assert_eq!(m("2024-04").last_day(), NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
	}

	#[test]
	fn week_rows_use_sunday_first_grid() {
		// 2015-02 starts on a Sunday and has 28 days.
		assert_eq!(m("2015-02").first_weekday(), 0);
		assert_eq!(m("2015-02").week_rows(), 4);
		// 2024-06 starts on a Saturday and has 30 days.
		assert_eq!(m("2024-06").first_weekday(), 6);
		assert_eq!(m("2024-06").week_rows(), 6);
		assert_eq!(m("2024-05").week_rows(), 5);
	}

	#[test]
	fn serde_uses_key_form() {
		use serde::de::value::{Error, StringDeserializer};

		let parsed = Month::deserialize(StringDeserializer::<Error>::new("2024-03".to_string())).unwrap();
		assert_eq!(parsed, m("2024-03"));
		let rejected = Month::deserialize(StringDeserializer::<Error>::new("March".to_string()));
		assert!(rejected.is_err());
	}

	proptest! {
		#[test]
		fn months_until_inverts_offset(year in 1900i32..2100, month in 1u32..=12, delta in -600i64..600) {
			let start = Month::new(year, month).unwrap();
			prop_assert_eq!(start.months_until(start.offset(delta)), delta);
		}

		#[test]
		fn from_date_contains_date(year in 1900i32..2100, ordinal in 1u32..=365) {
			let date = NaiveDate::from_yo_opt(year, ordinal).unwrap();
			prop_assert!(Month::from_date(date).contains(date));
		}
	}
}
