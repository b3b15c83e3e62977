//! Error types for event loading and mapping.

use almanac_primitives::Month;
use thiserror::Error;

/// Failure reported by an [`crate::EventSource`] for one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
	/// The request was rejected or returned a non-success result. Retried.
	#[error("network error: {0}")]
	Network(String),
	/// The payload did not have the expected shape. Not retried.
	#[error("malformed payload: {0}")]
	Parse(String),
}

impl FetchError {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Network(_))
	}

	/// Message reported by the source, without the kind prefix.
	pub fn detail(&self) -> &str {
		match self {
			Self::Network(message) | Self::Parse(message) => message,
		}
	}
}

/// Failure converting one raw item into an [`crate::EventRecord`].
///
/// Recovered locally: the item is dropped and the rest of the batch proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
	/// Raw item is not a JSON object.
	#[error("item is not an object")]
	NotAnObject,
	/// No date could be found under any of the candidate fields.
	#[error("missing date field (tried {tried})")]
	MissingDate {
		/// Comma-separated field names that were consulted.
		tried: String,
	},
	/// A date field was present but not in `YYYY-MM-DD` or RFC 3339 form.
	#[error("invalid date '{value}' in field '{field}'")]
	InvalidDate { field: String, value: String },
	/// A user-supplied transform rejected the item.
	#[error("transform failed: {0}")]
	Custom(String),
}

/// Terminal failure for one month's load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
	/// Every attempt of the retry policy failed.
	#[error("loading {month} failed after {attempts} attempts: {message}")]
	Exhausted { month: Month, attempts: u32, message: String },
	/// The engine was torn down before the load completed.
	#[error("load of {0} was discarded because the engine shut down")]
	Cancelled(Month),
}

impl LoadError {
	pub fn month(&self) -> Month {
		match self {
			Self::Exhausted { month, .. } | Self::Cancelled(month) => *month,
		}
	}
}
