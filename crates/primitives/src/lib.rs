//! Core calendar types: months, month keys, and date ranges.

/// Month value type and Gregorian month arithmetic.
pub mod month;
/// Inclusive day ranges covering one month.
pub mod range;

pub use chrono::NaiveDate;
pub use month::{Month, MonthParseError, today};
pub use range::MonthRange;
