//! Edge detection for window growth.

use std::time::Instant;

use crate::config::ScrollConfig;

/// Offsets this far past either end are treated as elastic bounce, not position.
const BOUNCE_TOLERANCE_PX: f64 = 10.0;

/// Scroll container geometry at one scroll event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
	pub scroll_top: f64,
	pub scroll_height: f64,
	pub client_height: f64,
}

impl ScrollMetrics {
	pub fn distance_to_bottom(&self) -> f64 {
		self.scroll_height - self.scroll_top - self.client_height
	}

	fn is_bounce(&self) -> bool {
		!self.scroll_top.is_finite()
			|| self.scroll_top < -BOUNCE_TOLERANCE_PX
			|| self.distance_to_bottom() < -BOUNCE_TOLERANCE_PX
	}
}

/// Window edge a scroll event asked to grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
	Head,
	Tail,
}

impl Edge {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Head => "head",
			Self::Tail => "tail",
		}
	}
}

/// Fires at most one edge trigger per cooldown period.
#[derive(Debug, Clone)]
pub struct ScrollGate {
	config: ScrollConfig,
	last_trigger: Option<Instant>,
}

impl ScrollGate {
	pub fn new(config: ScrollConfig) -> Self {
		Self {
			config,
			last_trigger: None,
		}
	}

	/// Whether a trigger at `now` would be suppressed.
	pub fn is_cooling_down(&self, now: Instant) -> bool {
		self.last_trigger
			.is_some_and(|last| now.saturating_duration_since(last) < self.config.cooldown)
	}

	pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> Option<Edge> {
		if metrics.is_bounce() || self.is_cooling_down(now) {
			return None;
		}
		let threshold = self.config.threshold_px;
		let bottom = metrics.distance_to_bottom();
		let edge = if (0.0..threshold).contains(&metrics.scroll_top) {
			Edge::Head
		} else if (0.0..threshold).contains(&bottom) {
			Edge::Tail
		} else {
			return None;
		};
		self.last_trigger = Some(now);
		tracing::debug!(
			edge = edge.as_str(),
			scroll_top = metrics.scroll_top,
			scroll_height = metrics.scroll_height,
			"scroll.trigger"
		);
		Some(edge)
	}

	/// Forgets the last trigger, e.g. after the window was replaced.
	pub fn reset(&mut self) {
		self.last_trigger = None;
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	fn at(scroll_top: f64) -> ScrollMetrics {
		ScrollMetrics {
			scroll_top,
			scroll_height: 2000.0,
			client_height: 600.0,
		}
	}

	#[test]
	fn near_top_fires_head_once_per_cooldown() {
		let mut gate = ScrollGate::new(ScrollConfig::default());
		let t0 = Instant::now();

		assert_eq!(gate.on_scroll(at(40.0), t0), Some(Edge::Head));
		assert_eq!(gate.on_scroll(at(45.0), t0 + Duration::from_millis(30)), None);
		assert_eq!(gate.on_scroll(at(45.0), t0 + Duration::from_millis(100)), Some(Edge::Head));
	}

	#[test]
	fn near_bottom_fires_tail() {
		let mut gate = ScrollGate::new(ScrollConfig::default());
		assert_eq!(gate.on_scroll(at(1350.0), Instant::now()), Some(Edge::Tail));
	}

	#[test]
	fn middle_of_content_is_quiet() {
		let mut gate = ScrollGate::new(ScrollConfig::default());
		let now = Instant::now();
		assert_eq!(gate.on_scroll(at(700.0), now), None);
		assert!(!gate.is_cooling_down(now));
	}

	#[test]
	fn bounce_offsets_are_ignored() {
		let mut gate = ScrollGate::new(ScrollConfig::default());
		let now = Instant::now();
		assert_eq!(gate.on_scroll(at(-40.0), now), None);
		assert_eq!(gate.on_scroll(at(1450.0), now), None);
		assert_eq!(gate.on_scroll(at(f64::NAN), now), None);
		assert_eq!(gate.on_scroll(at(-5.0), now), None);
		assert_eq!(gate.on_scroll(at(1405.0), now), None);
		assert!(!gate.is_cooling_down(now));
		assert_eq!(gate.on_scroll(at(0.0), now), Some(Edge::Head));
	}

	#[test]
	fn exact_bottom_fires_tail() {
		let mut gate = ScrollGate::new(ScrollConfig::default());
		assert_eq!(gate.on_scroll(at(1400.0), Instant::now()), Some(Edge::Tail));
	}

	#[test]
	fn reset_clears_cooldown() {
		let mut gate = ScrollGate::new(ScrollConfig::default());
		let now = Instant::now();
		gate.on_scroll(at(0.0), now);
		gate.reset();
		assert_eq!(gate.on_scroll(at(1400.0), now), Some(Edge::Tail));
	}
}
