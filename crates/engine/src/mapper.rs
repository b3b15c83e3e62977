//! Conversion of raw source items into [`EventRecord`]s.
//!
//! Three strategies, in order of precedence when configured:
//!
//! 1. **Transform**: an injected closure owns the whole conversion.
//! 2. **Fields**: a [`FieldMapping`] names the source field for each record field.
//! 3. **Heuristic**: common aliases are probed (`id`, `title`/`name`,
//!    `date`/`startDate`/`startTime`, ...).
//!
//! A failing item is dropped from its batch; the rest of the batch survives.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use almanac_primitives::{Month, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransformError;
use crate::event::{EventRecord, EventWhen, synthesize_id};

/// Title used when an item carries none.
pub const UNTITLED: &str = "Untitled Event";

/// User-supplied conversion. Receives the raw item and the month being loaded.
pub type TransformFn = Arc<dyn Fn(&Value, Month) -> Result<EventRecord, TransformError> + Send + Sync>;

/// Source field names for each record field.
///
/// `id`, `title` and `date` fall back to the field of the same name; the
/// remaining fields are only read when named.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldMapping {
	pub id: Option<String>,
	pub title: Option<String>,
	pub date: Option<String>,
	pub start_time: Option<String>,
	pub end_time: Option<String>,
	pub color: Option<String>,
	pub description: Option<String>,
}

/// Strategy for turning raw items into records.
#[derive(Clone, Default)]
pub enum EventMapper {
	#[default]
	Heuristic,
	Fields(FieldMapping),
	Transform(TransformFn),
}

impl fmt::Debug for EventMapper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Heuristic => f.write_str("Heuristic"),
			Self::Fields(mapping) => f.debug_tuple("Fields").field(mapping).finish(),
			Self::Transform(_) => f.write_str("Transform(..)"),
		}
	}
}

impl EventMapper {
	pub fn transform<F>(f: F) -> Self
	where
		F: Fn(&Value, Month) -> Result<EventRecord, TransformError> + Send + Sync + 'static,
	{
		Self::Transform(Arc::new(f))
	}

	/// Converts one item. `index` is its position in the batch, used for id synthesis.
	pub fn map_item(&self, item: &Value, origin: Month, index: usize) -> Result<EventRecord, TransformError> {
		let mut record = match self {
			Self::Transform(f) => catch_unwind(AssertUnwindSafe(|| f(item, origin)))
				.unwrap_or_else(|_| Err(TransformError::Custom("transform panicked".to_string())))?,
			Self::Fields(mapping) => map_fields(item, mapping, origin, index)?,
			Self::Heuristic => map_heuristic(item, origin, index)?,
		};
		record.origin = origin;
		Ok(record)
	}

	/// Converts a batch, dropping (and logging) items that fail.
	pub fn map_batch(&self, items: &[Value], origin: Month) -> Vec<EventRecord> {
		let mut records = Vec::with_capacity(items.len());
		let mut dropped = 0usize;
		for (index, item) in items.iter().enumerate() {
			match self.map_item(item, origin, index) {
				Ok(record) => records.push(record),
				Err(error) => {
					dropped += 1;
					tracing::warn!(month = %origin, index, %error, "mapper.item.dropped");
				}
			}
		}
		if dropped > 0 {
			tracing::debug!(month = %origin, kept = records.len(), dropped, "mapper.batch");
		}
		records
	}
}

fn map_fields(item: &Value, mapping: &FieldMapping, origin: Month, index: usize) -> Result<EventRecord, TransformError> {
	let obj = item.as_object().ok_or(TransformError::NotAnObject)?;
	let id_key = mapping.id.as_deref().unwrap_or("id");
	let title_key = mapping.title.as_deref().unwrap_or("title");
	let date_key = mapping.date.as_deref().unwrap_or("date");

	let optional = |key: &Option<String>| key.as_deref().and_then(|k| text(obj, k));
	build(
		Parts {
			id: text(obj, id_key),
			title: text(obj, title_key),
			date_fields: &[date_key],
			start: optional(&mapping.start_time),
			end: optional(&mapping.end_time),
			color: optional(&mapping.color),
			description: optional(&mapping.description),
		},
		obj,
		origin,
		index,
	)
}

fn map_heuristic(item: &Value, origin: Month, index: usize) -> Result<EventRecord, TransformError> {
	let obj = item.as_object().ok_or(TransformError::NotAnObject)?;
	build(
		Parts {
			id: text(obj, "id"),
			title: text(obj, "title").or_else(|| text(obj, "name")),
			date_fields: &["date", "startDate"],
			start: text(obj, "startTime"),
			end: text(obj, "endTime"),
			color: text(obj, "color"),
			description: text(obj, "description"),
		},
		obj,
		origin,
		index,
	)
}

struct Parts<'a> {
	id: Option<String>,
	title: Option<String>,
	date_fields: &'a [&'a str],
	start: Option<String>,
	end: Option<String>,
	color: Option<String>,
	description: Option<String>,
}

fn build(parts: Parts<'_>, obj: &Map<String, Value>, origin: Month, index: usize) -> Result<EventRecord, TransformError> {
	let date = resolve_date(obj, parts.date_fields, parts.start.as_deref())?;
	let title = parts.title.unwrap_or_else(|| UNTITLED.to_string());
	let id = parts.id.unwrap_or_else(|| synthesize_id(date, &title, index));
	let when = match parts.start {
		Some(start) => EventWhen::Span { date, start, end: parts.end },
		None => EventWhen::Day(date),
	};
	Ok(EventRecord {
		id,
		title,
		when,
		color: parts.color,
		description: parts.description,
		origin,
	})
}

/// First parseable date among `fields`, falling back to the start timestamp.
fn resolve_date(obj: &Map<String, Value>, fields: &[&str], start: Option<&str>) -> Result<NaiveDate, TransformError> {
	for field in fields {
		if let Some(value) = text(obj, field) {
			return parse_date(&value).ok_or_else(|| TransformError::InvalidDate {
				field: (*field).to_string(),
				value,
			});
		}
	}
	if let Some(start) = start {
		return parse_date(start).ok_or_else(|| TransformError::InvalidDate {
			field: "startTime".to_string(),
			value: start.to_string(),
		});
	}
	let mut tried = fields.join(", ");
	tried.push_str(", startTime");
	Err(TransformError::MissingDate { tried })
}

/// Accepts `YYYY-MM-DD` and anything that starts with it (RFC 3339 timestamps).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
	value.get(..10).unwrap_or(value).parse().ok()
}

/// Non-empty string or number at `key`.
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
	match obj.get(key)? {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}
