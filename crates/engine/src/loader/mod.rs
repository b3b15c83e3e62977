//! Per-month event loading with request coalescing and bounded retry.
//!
//! # Slots
//!
//! Every month the loader has seen sits in exactly one slot state:
//! loading (holding the shared [`Flight`]), loaded, or errored. Months
//! without a slot are idle. All slot transitions happen under one lock and
//! touch only the month being transitioned, so completions arriving in any
//! order merge into the latest state instead of overwriting each other.
//!
//! # Coalescing
//!
//! [`Loader::request_range`] starts a fetch only for idle or errored months.
//! A month already loading is attached to: the returned [`RangeRequest`] awaits
//! the same [`Flight`] as the original caller, and both observe the identical
//! `Arc` of records.
//!
//! # Retry
//!
//! Network failures are retried up to [`RetryPolicy::max_retries`] times, the
//! `n`th retry waiting `base_delay * n`. After the last attempt the month is
//! errored and contributes no events until a later request retries it.
//! Malformed payloads are not retried; the month loads with no events.
//!
//! # Teardown
//!
//! Cancelling the loader's [`GenerationToken`] makes every pending fetch
//! discard its result on arrival; slots and cache are left untouched.

mod flight;
mod preload;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use almanac_primitives::{Month, MonthRange};
use almanac_worker::{GenerationClock, GenerationToken, TaskClass};
use parking_lot::Mutex;

pub use self::flight::{Flight, FlightResult};
pub use self::preload::{PlanKind, PreloadPlan, PreloadPlanner};
use self::flight::{FlightSender, flight};
use crate::cache::{EventCache, MonthEvents};
use crate::config::RetryPolicy;
use crate::error::LoadError;
use crate::event::EventRecord;
use crate::mapper::EventMapper;
use crate::source::EventSource;

/// Callback fired once per successfully resolved month fetch.
pub type RangeLoadedFn = Arc<dyn Fn(MonthRange, &[EventRecord]) + Send + Sync>;

/// Public view of a month's slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
	Idle,
	Loading,
	Loaded,
	Errored(String),
}

enum Slot {
	Loading(Flight),
	Loaded,
	Errored(String),
}

impl Slot {
	fn status(&self) -> LoadStatus {
		match self {
			Self::Loading(_) => LoadStatus::Loading,
			Self::Loaded => LoadStatus::Loaded,
			Self::Errored(message) => LoadStatus::Errored(message.clone()),
		}
	}
}

/// Resolution of one month within a [`RangeRequest`].
#[derive(Debug, Clone)]
pub struct MonthOutcome {
	pub month: Month,
	pub result: FlightResult,
}

enum Pending {
	Ready(FlightResult),
	InFlight(Flight),
}

/// Handle returned by [`Loader::request_range`].
///
/// Fetches run whether or not the handle is awaited.
pub struct RangeRequest {
	pending: Vec<(Month, Pending)>,
	started: Vec<Month>,
}

impl RangeRequest {
	/// Months for which this request started a new fetch.
	pub fn started(&self) -> &[Month] {
		&self.started
	}

	/// Months covered by this request, in request order.
	pub fn months(&self) -> impl Iterator<Item = Month> + '_ {
		self.pending.iter().map(|(month, _)| *month)
	}

	/// Waits for every covered month to resolve.
	pub async fn wait(self) -> Vec<MonthOutcome> {
		let mut outcomes = Vec::with_capacity(self.pending.len());
		for (month, pending) in self.pending {
			let result = match pending {
				Pending::Ready(result) => result,
				Pending::InFlight(flight) => flight.wait().await,
			};
			outcomes.push(MonthOutcome { month, result });
		}
		outcomes
	}
}

struct Shared {
	source: Arc<dyn EventSource>,
	mapper: EventMapper,
	cache: EventCache,
	retry: RetryPolicy,
	token: GenerationToken,
	on_range_loaded: Option<RangeLoadedFn>,
	slots: Mutex<HashMap<Month, Slot>>,
}

/// Builder for [`Loader`].
pub struct LoaderBuilder {
	source: Arc<dyn EventSource>,
	cache: EventCache,
	mapper: EventMapper,
	retry: RetryPolicy,
	token: Option<GenerationToken>,
	on_range_loaded: Option<RangeLoadedFn>,
}

impl LoaderBuilder {
	pub fn mapper(mut self, mapper: EventMapper) -> Self {
		self.mapper = mapper;
		self
	}

	pub fn retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	/// Scopes every fetch to `token`; cancelling it discards pending results.
	pub fn token(mut self, token: GenerationToken) -> Self {
		self.token = Some(token);
		self
	}

	pub fn on_range_loaded(mut self, f: RangeLoadedFn) -> Self {
		self.on_range_loaded = Some(f);
		self
	}

	pub fn build(self) -> Loader {
		Loader {
			shared: Arc::new(Shared {
				source: self.source,
				mapper: self.mapper,
				cache: self.cache,
				retry: self.retry,
				token: self.token.unwrap_or_else(|| GenerationClock::new().token()),
				on_range_loaded: self.on_range_loaded,
				slots: Mutex::new(HashMap::new()),
			}),
		}
	}
}

/// Orchestrates month fetches into a shared [`EventCache`].
#[derive(Clone)]
pub struct Loader {
	shared: Arc<Shared>,
}

impl std::fmt::Debug for Loader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Loader")
			.field("generation", &self.shared.token.generation())
			.field("loading", &self.loading_months())
			.field("cache", &self.shared.cache)
			.finish()
	}
}

impl Loader {
	pub fn builder(source: Arc<dyn EventSource>, cache: EventCache) -> LoaderBuilder {
		LoaderBuilder {
			source,
			cache,
			mapper: EventMapper::default(),
			retry: RetryPolicy::default(),
			token: None,
			on_range_loaded: None,
		}
	}

	pub fn cache(&self) -> &EventCache {
		&self.shared.cache
	}

	/// Requests every month in `months`, starting fetches only for idle or
	/// errored ones and attaching to fetches already in flight.
	pub fn request_range(&self, months: impl IntoIterator<Item = Month>) -> RangeRequest {
		let mut seen = HashSet::new();
		let mut pending = Vec::new();
		let mut to_start: Vec<(Month, FlightSender)> = Vec::new();
		let cancelled = self.shared.token.is_cancelled();

		{
			let mut slots = self.shared.slots.lock();
			for month in months {
				if !seen.insert(month) {
					continue;
				}
				if cancelled {
					pending.push((month, Pending::Ready(Err(LoadError::Cancelled(month)))));
					continue;
				}
				match slots.get(&month) {
					Some(Slot::Loading(flight)) => {
						pending.push((month, Pending::InFlight(flight.clone())));
						continue;
					}
					Some(Slot::Loaded) => {
						if let Some(events) = self.shared.cache.get(month) {
							pending.push((month, Pending::Ready(Ok(events))));
							continue;
						}
					}
					Some(Slot::Errored(_)) | None => {}
				}
				let (tx, rx) = flight(month);
				slots.insert(month, Slot::Loading(rx.clone()));
				pending.push((month, Pending::InFlight(rx)));
				to_start.push((month, tx));
			}
		}

		let started: Vec<Month> = to_start.iter().map(|(month, _)| *month).collect();
		if !started.is_empty() {
			tracing::info!(
				months = ?started.iter().map(ToString::to_string).collect::<Vec<_>>(),
				requested = pending.len(),
				"loader.batch.start"
			);
		}
		for (month, tx) in to_start {
			let shared = Arc::clone(&self.shared);
			almanac_worker::spawn(TaskClass::Fetch, run_flight(shared, month, tx));
		}

		RangeRequest { pending, started }
	}

	pub fn status(&self, month: Month) -> LoadStatus {
		self.shared.slots.lock().get(&month).map_or(LoadStatus::Idle, Slot::status)
	}

	/// Resolved records for `month`, if cached.
	pub fn events(&self, month: Month) -> Option<MonthEvents> {
		self.shared.cache.get(month)
	}

	pub fn loading_months(&self) -> Vec<Month> {
		self.months_where(|slot| matches!(slot, Slot::Loading(_)))
	}

	pub fn loaded_months(&self) -> Vec<Month> {
		self.months_where(|slot| matches!(slot, Slot::Loaded))
	}

	/// Errored months with their last error message, ascending.
	pub fn errored_months(&self) -> Vec<(Month, String)> {
		let slots = self.shared.slots.lock();
		let mut errored: Vec<_> = slots
			.iter()
			.filter_map(|(month, slot)| match slot {
				Slot::Errored(message) => Some((*month, message.clone())),
				_ => None,
			})
			.collect();
		errored.sort_by_key(|(month, _)| *month);
		errored
	}

	pub fn is_loading(&self) -> bool {
		self.shared.slots.lock().values().any(|slot| matches!(slot, Slot::Loading(_)))
	}

	pub fn is_shut_down(&self) -> bool {
		self.shared.token.is_cancelled()
	}

	/// Stops applying results. Pending fetches finish but are discarded.
	pub fn shutdown(&self) {
		tracing::debug!(generation = self.shared.token.generation(), "loader.shutdown");
		self.shared.token.cancel();
	}

	fn months_where(&self, pred: impl Fn(&Slot) -> bool) -> Vec<Month> {
		let slots = self.shared.slots.lock();
		let mut months: Vec<_> = slots.iter().filter(|(_, slot)| pred(slot)).map(|(month, _)| *month).collect();
		months.sort();
		months
	}
}

async fn run_flight(shared: Arc<Shared>, month: Month, tx: FlightSender) {
	let outcome = fetch_with_retry(&shared, month).await;

	if shared.token.is_cancelled() {
		tracing::debug!(month = %month, generation = shared.token.generation(), "loader.result.discarded");
		tx.complete(Err(LoadError::Cancelled(month)));
		return;
	}

	match outcome {
		Ok(records) => {
			let events: MonthEvents = Arc::from(records);
			let evicted = shared.cache.insert(month, Arc::clone(&events));
			{
				let mut slots = shared.slots.lock();
				slots.insert(month, Slot::Loaded);
				// An evicted month goes back to idle so a later preload can refetch it.
				if let Some(evicted) = evicted.filter(|evicted| *evicted != month)
					&& matches!(slots.get(&evicted), Some(Slot::Loaded))
				{
					slots.remove(&evicted);
				}
			}
			tracing::info!(
				month = %month,
				count = events.len(),
				cache_size = shared.cache.len(),
				"loader.month.loaded"
			);
			if let Some(callback) = &shared.on_range_loaded {
				callback(month.range(), &events);
			}
			tx.complete(Ok(events));
		}
		Err(error) => {
			tracing::error!(month = %month, %error, "loader.month.failed");
			shared.slots.lock().insert(month, Slot::Errored(error.to_string()));
			tx.complete(Err(error));
		}
	}
}

async fn fetch_with_retry(shared: &Shared, month: Month) -> Result<Vec<EventRecord>, LoadError> {
	let range = month.range();
	let policy = shared.retry;
	let mut attempt = 1u32;

	loop {
		if shared.token.is_cancelled() {
			return Err(LoadError::Cancelled(month));
		}
		tracing::debug!(month = %month, range = %range, attempt, "loader.fetch.start");

		let error = match shared.source.fetch(range).await {
			Ok(items) => return Ok(shared.mapper.map_batch(&items, month)),
			Err(error) => error,
		};
		if !error.is_retryable() {
			tracing::warn!(month = %month, %error, "loader.fetch.malformed");
			return Ok(Vec::new());
		}
		if attempt >= policy.max_attempts() {
			return Err(LoadError::Exhausted {
				month,
				attempts: attempt,
				message: error.detail().to_string(),
			});
		}

		let delay = policy.delay_before_retry(attempt);
		tracing::warn!(
			month = %month,
			retry = attempt,
			max_retries = policy.max_retries,
			delay_ms = delay.as_millis() as u64,
			%error,
			"loader.retry"
		);
		attempt += 1;
		tokio::select! {
			_ = shared.token.cancelled() => return Err(LoadError::Cancelled(month)),
			_ = tokio::time::sleep(delay) => {}
		}
	}
}
