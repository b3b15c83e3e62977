//! Derived views: month grids, initial positioning and height bookkeeping.
//!
//! Everything here is recomputed from the window and the cache on demand.

use std::collections::BTreeMap;

use almanac_primitives::{Month, NaiveDate};

use crate::cache::EventCache;
use crate::config::LayoutConfig;
use crate::event::EventRecord;

/// One Sunday-first week row; days belonging to neighbouring months are `None`.
pub type Week = [Option<NaiveDate>; 7];

/// Render-ready view of one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
	pub month: Month,
	pub weeks: Vec<Week>,
	/// Cached records for this month keyed by the date they start on.
	pub events_by_date: BTreeMap<NaiveDate, Vec<EventRecord>>,
}

impl MonthGrid {
	pub fn week_rows(&self) -> u32 {
		self.weeks.len() as u32
	}

	pub fn events_on(&self, date: NaiveDate) -> &[EventRecord] {
		self.events_by_date.get(&date).map_or(&[], Vec::as_slice)
	}

	pub fn event_count(&self) -> usize {
		self.events_by_date.values().map(Vec::len).sum()
	}
}

/// Lays out `month` and buckets whatever the cache holds for it.
pub fn compose_month(month: Month, cache: &EventCache) -> MonthGrid {
	let lead = month.first_weekday() as usize;
	let days = month.days_in_month();
	let mut weeks = Vec::with_capacity(month.week_rows() as usize);
	let mut week: Week = [None; 7];
	for day in 1..=days {
		let slot = (lead + day as usize - 1) % 7;
		week[slot] = month.day(day);
		if slot == 6 {
			weeks.push(week);
			week = [None; 7];
		}
	}
	if week.iter().any(Option::is_some) {
		weeks.push(week);
	}

	let mut events_by_date: BTreeMap<NaiveDate, Vec<EventRecord>> = BTreeMap::new();
	if let Some(events) = cache.get(month) {
		for record in events.iter().filter(|r| month.contains(r.date())) {
			events_by_date.entry(record.date()).or_default().push(record.clone());
		}
	}

	MonthGrid {
		month,
		weeks,
		events_by_date,
	}
}

/// Scroll offset that vertically centers the middle month of the window.
///
/// `week_rows` holds the row count of each window month in order. Returns
/// `None` while fewer than three months are laid out.
pub fn initial_scroll_offset(week_rows: &[u32], available_height: f64, layout: &LayoutConfig) -> Option<f64> {
	if week_rows.len() < 3 {
		return None;
	}
	let center = week_rows.len() / 2;
	let row = layout.day_cell_height;
	let before: f64 = week_rows[..center].iter().map(|&rows| f64::from(rows) * row).sum();
	let center_height = f64::from(week_rows[center]) * row;
	let viewport = available_height - layout.header_height;
	Some((before + center_height / 2.0 - viewport / 2.0).max(0.0))
}

/// Tracks the calendar's usable height as the host viewport resizes.
#[derive(Debug, Clone)]
pub struct AutoHeight {
	layout: LayoutConfig,
	current: Option<f64>,
}

impl AutoHeight {
	pub fn new(layout: LayoutConfig) -> Self {
		Self { layout, current: None }
	}

	/// Last reported height.
	pub fn current(&self) -> Option<f64> {
		self.current
	}

	/// Height for a viewport of `viewport_height` px.
	pub fn compute(&self, viewport_height: f64) -> f64 {
		let layout = &self.layout;
		(viewport_height - layout.top_offset - layout.bottom_offset).clamp(layout.min_height, layout.max_height)
	}

	/// Recomputes the height, returning it only when it moved by at least
	/// `min_height_delta` since the last report.
	pub fn update(&mut self, viewport_height: f64) -> Option<f64> {
		let height = self.compute(viewport_height);
		if self
			.current
			.is_some_and(|current| (height - current).abs() < self.layout.min_height_delta)
		{
			return None;
		}
		self.current = Some(height);
		Some(height)
	}
}
