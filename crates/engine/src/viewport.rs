//! Active-month election from per-month visibility samples.

use std::collections::BTreeMap;

use almanac_primitives::Month;

use crate::config::ViewportConfig;

/// Latest visibility reading for one rendered month block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSample {
	pub month: Month,
	/// Fraction of the block inside the viewport, clamped to `0.0..=1.0`.
	pub ratio: f64,
	/// `floor(ratio * total_weeks)`.
	pub visible_weeks: u32,
	pub total_weeks: u32,
}

impl ViewportSample {
	pub fn new(month: Month, ratio: f64, total_weeks: u32) -> Self {
		let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
		let visible_weeks = (ratio * f64::from(total_weeks)).floor() as u32;
		Self {
			month,
			ratio,
			visible_weeks,
			total_weeks,
		}
	}

	pub fn is_visible(&self) -> bool {
		self.visible_weeks >= 1
	}

	/// `visible/total + week_bonus * visible`; `None` when no full week shows.
	pub fn score(&self, week_bonus: f64) -> Option<f64> {
		if !self.is_visible() || self.total_weeks == 0 {
			return None;
		}
		let visible = f64::from(self.visible_weeks);
		Some(visible / f64::from(self.total_weeks) + week_bonus * visible)
	}
}

/// Result of one election pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Election {
	/// New active month, if the winning candidate cleared the threshold.
	pub switch_to: Option<Month>,
	/// Best eligible candidate and its score, whether or not it won.
	pub candidate: Option<(Month, f64)>,
	/// Whether the month that was active going in still shows a full week.
	pub active_visible: bool,
}

/// Accumulates visibility samples keyed by window index.
///
/// Samples are cheap to record on every intersection update; callers debounce
/// [`Self::elect`] themselves.
#[derive(Debug, Default, Clone)]
pub struct ViewportTracker {
	samples: BTreeMap<usize, ViewportSample>,
}

impl ViewportTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records the latest sample for the block at `index`, replacing any earlier one.
	pub fn observe(&mut self, index: usize, month: Month, ratio: f64, total_weeks: u32) -> ViewportSample {
		let sample = ViewportSample::new(month, ratio, total_weeks);
		self.samples.insert(index, sample);
		sample
	}

	pub fn sample(&self, index: usize) -> Option<&ViewportSample> {
		self.samples.get(&index)
	}

	pub fn len(&self) -> usize {
		self.samples.len()
	}

	pub fn is_empty(&self) -> bool {
		self.samples.is_empty()
	}

	/// Drops every sample. Indices are window positions, so they go stale on
	/// any window change.
	pub fn clear(&mut self) {
		self.samples.clear();
	}

	/// Picks the highest-scoring visible month. Ties go to the earlier block.
	pub fn elect(&self, active: Month, config: &ViewportConfig) -> Election {
		let mut candidate: Option<(Month, f64)> = None;
		for sample in self.samples.values() {
			let Some(score) = sample.score(config.week_bonus) else {
				continue;
			};
			if candidate.is_none_or(|(_, best)| score > best) {
				candidate = Some((sample.month, score));
			}
		}

		let switch_to = candidate
			.filter(|&(month, score)| month != active && score > config.switch_threshold)
			.map(|(month, _)| month);
		let active_visible = self.samples.values().any(|s| s.month == active && s.is_visible());

		Election {
			switch_to,
			candidate,
			active_visible,
		}
	}
}
