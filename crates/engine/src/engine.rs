//! [`CalendarEngine`]: the window, loader and viewport state behind one handle.
//!
//! The host forwards three kinds of input: visibility samples for rendered
//! month blocks, scroll metrics for the container, and explicit navigation
//! (jump to a date, go to today). Every change to the month window runs the
//! preload planner and hands the resulting months to the [`Loader`].
//!
//! Engine state lives behind a single lock. Loader state lives behind the
//! loader's own lock; the two are never held together by loader code, so fetch
//! completions never contend with input handling for longer than one slot
//! update.

use std::sync::Arc;
use std::time::Instant;

use almanac_primitives::{Month, NaiveDate, today};
use almanac_worker::{Debouncer, GenerationClock, TaskClass};
use parking_lot::Mutex;

use crate::cache::{CacheDiagnostics, EventCache, MonthEvents};
use crate::config::{ConfigError, EngineConfig, ViewportConfig};
use crate::layout::{AutoHeight, MonthGrid, compose_month, initial_scroll_offset};
use crate::loader::{LoadStatus, Loader, PlanKind, PreloadPlanner, RangeLoadedFn, RangeRequest};
use crate::mapper::EventMapper;
use crate::scroll::{Edge, ScrollGate, ScrollMetrics};
use crate::source::EventSource;
use crate::viewport::{ViewportSample, ViewportTracker};
use crate::window::MonthWindow;

/// Read-only view of the engine for debugging overlays and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
	pub window: Vec<Month>,
	pub active: Month,
	pub loading: Vec<Month>,
	pub loaded: Vec<Month>,
	pub errored: Vec<(Month, String)>,
	pub cache: CacheDiagnostics,
	pub is_loading: bool,
	/// Whether the active month still shows at least one full week.
	pub current_month_visible: bool,
	pub initial_scroll_set: bool,
	pub available_height: Option<f64>,
}

struct EngineState {
	window: MonthWindow,
	viewport: ViewportTracker,
	gate: ScrollGate,
	planner: PreloadPlanner,
	height: AutoHeight,
	current_month_visible: bool,
}

/// Builder for [`CalendarEngine`].
pub struct EngineBuilder {
	config: EngineConfig,
	source: Arc<dyn EventSource>,
	mapper: EventMapper,
	initial: Option<NaiveDate>,
	on_range_loaded: Option<RangeLoadedFn>,
}

impl EngineBuilder {
	pub fn mapper(mut self, mapper: EventMapper) -> Self {
		self.mapper = mapper;
		self
	}

	/// Date whose month is centered at startup. Defaults to today.
	pub fn initial(mut self, date: NaiveDate) -> Self {
		self.initial = Some(date);
		self
	}

	/// Called once per successfully resolved month fetch, from the fetch task.
	pub fn on_range_loaded(mut self, f: RangeLoadedFn) -> Self {
		self.on_range_loaded = Some(f);
		self
	}

	/// Validates the configuration, builds the engine and starts the first preload.
	pub fn build(self) -> Result<CalendarEngine, ConfigError> {
		self.config.validate()?;
		let config = self.config;

		let token = GenerationClock::new().token();
		let mut loader = Loader::builder(self.source, EventCache::new(config.cache_capacity))
			.mapper(self.mapper)
			.retry(config.retry)
			.token(token);
		if let Some(f) = self.on_range_loaded {
			loader = loader.on_range_loaded(f);
		}
		let loader = loader.build();

		let window = MonthWindow::new(self.initial.unwrap_or_else(today));
		let state = EngineState {
			viewport: ViewportTracker::new(),
			gate: ScrollGate::new(config.scroll),
			planner: PreloadPlanner::new(config.preload_buffer, config.jump_threshold, config.jump_radius),
			height: AutoHeight::new(config.layout),
			current_month_visible: true,
			window,
		};
		tracing::info!(
			center = %state.window.center(),
			cache_capacity = config.cache_capacity,
			"engine.start"
		);

		let engine = CalendarEngine {
			state: Arc::new(Mutex::new(state)),
			election: Mutex::new(Debouncer::new("viewport.elect", TaskClass::Interactive)),
			loader,
			config,
		};
		engine.preload();
		Ok(engine)
	}
}

/// Data and state engine for an infinitely scrolling month calendar.
pub struct CalendarEngine {
	state: Arc<Mutex<EngineState>>,
	election: Mutex<Debouncer>,
	loader: Loader,
	config: EngineConfig,
}

impl std::fmt::Debug for CalendarEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CalendarEngine")
			.field("window", &self.state.lock().window)
			.field("loader", &self.loader)
			.finish_non_exhaustive()
	}
}

impl CalendarEngine {
	pub fn builder(config: EngineConfig, source: Arc<dyn EventSource>) -> EngineBuilder {
		EngineBuilder {
			config,
			source,
			mapper: EventMapper::default(),
			initial: None,
			on_range_loaded: None,
		}
	}

	pub fn new(
		config: EngineConfig,
		source: Arc<dyn EventSource>,
		mapper: EventMapper,
		initial: Option<NaiveDate>,
	) -> Result<Self, ConfigError> {
		let mut builder = Self::builder(config, source).mapper(mapper);
		if let Some(date) = initial {
			builder = builder.initial(date);
		}
		builder.build()
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn loader(&self) -> &Loader {
		&self.loader
	}

	pub fn window(&self) -> MonthWindow {
		self.state.lock().window.clone()
	}

	pub fn active_month(&self) -> Month {
		self.state.lock().window.active()
	}

	/// Prepends a month. Returns the resulting preload request, or `None` at
	/// the earliest representable month.
	pub fn extend_head(&self) -> Option<RangeRequest> {
		self.extend(Edge::Head)
	}

	/// Appends a month. Returns the resulting preload request, or `None` at
	/// the latest representable month.
	pub fn extend_tail(&self) -> Option<RangeRequest> {
		self.extend(Edge::Tail)
	}

	/// Re-centers the window on `date`'s month.
	pub fn jump_to(&self, date: NaiveDate) -> RangeRequest {
		self.election.lock().cancel();
		{
			let mut state = self.state.lock();
			let from = state.window.center();
			state.window.jump_to(date);
			state.viewport.clear();
			state.gate.reset();
			state.current_month_visible = true;
			tracing::info!(from = %from, to = %state.window.center(), "window.jump");
		}
		self.preload()
	}

	pub fn go_to_today(&self) -> RangeRequest {
		self.jump_to(today())
	}

	/// Records a visibility sample for the block at window `index` and
	/// (re)schedules the debounced active-month election.
	///
	/// Returns `None` for indices outside the window.
	pub fn observe_visibility(&self, index: usize, ratio: f64) -> Option<ViewportSample> {
		let sample = {
			let mut state = self.state.lock();
			let month = state.window.get(index)?;
			state.viewport.observe(index, month, ratio, month.week_rows())
		};

		let state = Arc::clone(&self.state);
		let config = self.config.viewport;
		self.election
			.lock()
			.schedule(config.debounce, move || apply_election(&state, &config));
		Some(sample)
	}

	/// Feeds one scroll event. Extends the window when it fires an edge.
	pub fn on_scroll(&self, metrics: ScrollMetrics, now: Instant) -> Option<Edge> {
		let edge = self.state.lock().gate.on_scroll(metrics, now)?;
		self.extend(edge);
		Some(edge)
	}

	/// Updates the usable height from the host viewport height. Returns the new
	/// height when it changed enough to be worth re-laying out.
	pub fn set_available_height(&self, viewport_height: f64) -> Option<f64> {
		self.state.lock().height.update(viewport_height)
	}

	/// Scroll offset that centers the middle month, handed out once per window
	/// reset. `None` until a height is known or after it was already taken.
	pub fn take_initial_scroll(&self) -> Option<f64> {
		let mut state = self.state.lock();
		if state.window.initial_scroll_set() {
			return None;
		}
		let available = state.height.current()?;
		let rows: Vec<u32> = state.window.months().iter().map(|m| m.week_rows()).collect();
		let offset = initial_scroll_offset(&rows, available, &self.config.layout)?;
		state.window.mark_initial_scroll_set();
		tracing::debug!(offset, available, "layout.initial_scroll");
		Some(offset)
	}

	/// Grid and event buckets for the month at window `index`.
	pub fn month_grid(&self, index: usize) -> Option<MonthGrid> {
		let month = self.state.lock().window.get(index)?;
		Some(compose_month(month, self.loader.cache()))
	}

	/// Grids for every window month, in order.
	pub fn month_grids(&self) -> Vec<MonthGrid> {
		let months = self.state.lock().window.months().to_vec();
		months.into_iter().map(|m| compose_month(m, self.loader.cache())).collect()
	}

	pub fn events(&self, month: Month) -> Option<MonthEvents> {
		self.loader.events(month)
	}

	pub fn status(&self, month: Month) -> LoadStatus {
		self.loader.status(month)
	}

	pub fn snapshot(&self) -> EngineSnapshot {
		let state = self.state.lock();
		EngineSnapshot {
			window: state.window.months().to_vec(),
			active: state.window.active(),
			loading: self.loader.loading_months(),
			loaded: self.loader.loaded_months(),
			errored: self.loader.errored_months(),
			cache: self.loader.cache().diagnostics(),
			is_loading: self.loader.is_loading(),
			current_month_visible: state.current_month_visible,
			initial_scroll_set: state.window.initial_scroll_set(),
			available_height: state.height.current(),
		}
	}

	/// Waits until no month is loading.
	pub async fn settle(&self) {
		while !self.loader.is_shut_down() {
			let loading = self.loader.loading_months();
			if loading.is_empty() {
				return;
			}
			self.loader.request_range(loading).wait().await;
		}
	}

	/// Tears the engine down. Pending fetches complete but their results are
	/// discarded; pending elections are cancelled.
	pub fn shutdown(&self) {
		self.election.lock().cancel();
		self.loader.shutdown();
		tracing::info!("engine.shutdown");
	}

	fn extend(&self, edge: Edge) -> Option<RangeRequest> {
		self.election.lock().cancel();
		{
			let mut state = self.state.lock();
			let grew = match edge {
				Edge::Head => state.window.extend_head(),
				Edge::Tail => state.window.extend_tail(),
			};
			if !grew {
				tracing::debug!(edge = edge.as_str(), "window.extend.at_bound");
				return None;
			}
			state.viewport.clear();
			tracing::debug!(
				edge = edge.as_str(),
				first = %state.window.first(),
				last = %state.window.last(),
				len = state.window.len(),
				"window.extend"
			);
		}
		Some(self.preload())
	}

	fn preload(&self) -> RangeRequest {
		let plan = {
			let mut state = self.state.lock();
			let EngineState { planner, window, .. } = &mut *state;
			planner.plan(window)
		};
		if let PlanKind::Jump { distance } = plan.kind {
			tracing::debug!(distance, months = plan.months.len(), "loader.preload.jump");
		}
		self.loader.request_range(plan.months)
	}
}

impl Drop for CalendarEngine {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn apply_election(state: &Mutex<EngineState>, config: &ViewportConfig) {
	let mut state = state.lock();
	let active = state.window.active();
	let election = state.viewport.elect(active, config);
	let switched = election.switch_to.is_some_and(|month| state.window.set_active(month));
	state.current_month_visible = switched || election.active_visible;
	tracing::debug!(
		from = %active,
		to = %state.window.active(),
		switched,
		score = election.candidate.map(|(_, score)| score),
		active_visible = state.current_month_visible,
		"viewport.elect"
	);
}
