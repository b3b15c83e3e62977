//! Injected data sources.

use std::future::Future;
use std::path::PathBuf;

use almanac_primitives::MonthRange;
use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// Asynchronous event provider for one month range at a time.
///
/// The engine is agnostic to transport, auth and caching on the source's side;
/// it only expects one raw item per event.
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
	async fn fetch(&self, range: MonthRange) -> Result<Vec<Value>, FetchError>;
}

/// Adapts a closure returning a future into an [`EventSource`].
pub struct FnSource<F> {
	f: F,
}

impl<F, Fut> FnSource<F>
where
	F: Fn(MonthRange) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Vec<Value>, FetchError>> + Send + 'static,
{
	pub fn new(f: F) -> Self {
		Self { f }
	}
}

#[async_trait]
impl<F, Fut> EventSource for FnSource<F>
where
	F: Fn(MonthRange) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Vec<Value>, FetchError>> + Send + 'static,
{
	async fn fetch(&self, range: MonthRange) -> Result<Vec<Value>, FetchError> {
		(self.f)(range).await
	}
}

/// Splits a decoded payload into raw items.
///
/// Accepts a bare array, or an object wrapping the array under `events`,
/// `items` or `data`.
pub fn parse_payload(payload: Value) -> Result<Vec<Value>, FetchError> {
	match payload {
		Value::Array(items) => Ok(items),
		Value::Object(mut obj) => ["events", "items", "data"]
			.iter()
			.find_map(|key| match obj.remove(*key) {
				Some(Value::Array(items)) => Some(items),
				_ => None,
			})
			.ok_or_else(|| FetchError::Parse("object payload has no events/items/data array".to_string())),
		other => Err(FetchError::Parse(format!("expected an array, got {}", kind(&other)))),
	}
}

fn kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

/// Serves events from a JSON file, filtered to the requested range.
///
/// The file is re-read on every fetch so edits show up on the next load.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
	path: PathBuf,
}

impl JsonFileSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl EventSource for JsonFileSource {
	async fn fetch(&self, range: MonthRange) -> Result<Vec<Value>, FetchError> {
		let path = self.path.clone();
		let bytes = tokio::task::spawn_blocking(move || std::fs::read(&path))
			.await
			.map_err(|e| FetchError::Network(format!("reader task failed: {e}")))?
			.map_err(|e| FetchError::Network(format!("{}: {e}", self.path.display())))?;
		let payload: Value = serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
		let items = parse_payload(payload)?;
		Ok(items.into_iter().filter(|item| item_in_range(item, range)).collect())
	}
}

/// Keeps items whose probable date falls in `range`; undated items pass through
/// so the mapper can report them.
fn item_in_range(item: &Value, range: MonthRange) -> bool {
	let date = ["date", "startDate", "startTime"]
		.iter()
		.find_map(|key| item.get(key).and_then(Value::as_str))
		.and_then(crate::mapper::parse_date);
	date.is_none_or(|date| range.contains(date))
}
