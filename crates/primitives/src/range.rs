use std::fmt;

use chrono::NaiveDate;

/// Inclusive range of days handed to event sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthRange {
	pub start: NaiveDate,
	pub end: NaiveDate,
}

impl MonthRange {
	pub fn contains(&self, date: NaiveDate) -> bool {
		self.start <= date && date <= self.end
	}
}

impl fmt::Display for MonthRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}..={}", self.start, self.end)
	}
}
