use std::collections::BTreeSet;

use almanac_primitives::Month;

use crate::window::MonthWindow;

/// Why a preload set was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
	/// Every window month plus the normal buffer on each side.
	Buffered,
	/// The center moved discontinuously; a wider radius around the new center.
	Jump { distance: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadPlan {
	pub kind: PlanKind,
	/// Months to request, ascending and unique.
	pub months: Vec<Month>,
}

/// Computes which months to fetch after each window change.
///
/// Remembers the previous window center so a large move (date picker, go to
/// today) can be told apart from incremental scrolling.
#[derive(Debug, Clone)]
pub struct PreloadPlanner {
	buffer: u32,
	jump_threshold: u32,
	jump_radius: u32,
	prev_center: Option<Month>,
}

impl PreloadPlanner {
	pub fn new(buffer: u32, jump_threshold: u32, jump_radius: u32) -> Self {
		Self {
			buffer,
			jump_threshold,
			jump_radius,
			prev_center: None,
		}
	}

	pub fn plan(&mut self, window: &MonthWindow) -> PreloadPlan {
		let center = window.center();
		let distance = self.prev_center.map_or(0, |prev| prev.months_until(center).unsigned_abs());
		self.prev_center = Some(center);

		if distance >= u64::from(self.jump_threshold) {
			let radius = i64::from(self.jump_radius);
			let months = (-radius..=radius).map(|delta| center.offset(delta)).collect::<BTreeSet<_>>();
			return PreloadPlan {
				kind: PlanKind::Jump {
					distance: u32::try_from(distance).unwrap_or(u32::MAX),
				},
				months: months.into_iter().collect(),
			};
		}

		let buffer = i64::from(self.buffer);
		let months: BTreeSet<Month> = window
			.months()
			.iter()
			.flat_map(|month| (-buffer..=buffer).map(move |delta| month.offset(delta)))
			.collect();
		PreloadPlan {
			kind: PlanKind::Buffered,
			months: months.into_iter().collect(),
		}
	}
}
