use almanac_primitives::{Month, NaiveDate};
use serde::{Deserialize, Serialize};

/// When an event happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventWhen {
	/// An all-day event on one date.
	Day(NaiveDate),
	/// A timed event; `start` and `end` keep the source's ISO-8601 strings.
	Span { date: NaiveDate, start: String, end: Option<String> },
}

impl EventWhen {
	/// Date the event is bucketed under in the month grid.
	pub fn date(&self) -> NaiveDate {
		match self {
			Self::Day(date) | Self::Span { date, .. } => *date,
		}
	}
}

/// One displayable calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
	pub id: String,
	pub title: String,
	pub when: EventWhen,
	pub color: Option<String>,
	pub description: Option<String>,
	/// Month whose fetch produced this record.
	pub origin: Month,
}

impl EventRecord {
	pub fn date(&self) -> NaiveDate {
		self.when.date()
	}
}

/// Builds the fallback id used when a source item carries none.
///
/// Characters outside letters and digits in the title become `_`.
pub fn synthesize_id(date: NaiveDate, title: &str, index: usize) -> String {
	let title: String = title.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }).collect();
	format!("event-{date}-{title}-{index}")
}
