//! Contiguous window of materialized months.

use almanac_primitives::{Month, NaiveDate, today};

/// Smallest window the engine ever holds: previous, center, next.
pub const MIN_WINDOW_LEN: usize = 3;

/// Ordered, contiguous, ascending run of months currently materialized.
///
/// The window only grows by one month at either edge, or is replaced
/// wholesale by a freshly centered triple. Breaking contiguity is a
/// programming error and panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindow {
	months: Vec<Month>,
	active: Month,
	/// Whether the viewport has been positioned on the center month since the
	/// last reset.
	initial_scroll_set: bool,
}

impl MonthWindow {
	/// Creates `[date - 1mo, date, date + 1mo]` with `date`'s month active.
	pub fn new(date: NaiveDate) -> Self {
		Self::centered(Month::from_date(date))
	}

	/// Creates `[center - 1mo, center, center + 1mo]` with `center` active.
	pub fn centered(center: Month) -> Self {
		// Keep a full triple even at the representable bounds.
		let center = center.clamp(Month::MIN.next(), Month::MAX.prev());
		let window = Self {
			months: vec![center.prev(), center, center.next()],
			active: center,
			initial_scroll_set: false,
		};
		window.assert_invariants();
		window
	}

	pub fn months(&self) -> &[Month] {
		&self.months
	}

	pub fn len(&self) -> usize {
		self.months.len()
	}

	pub fn is_empty(&self) -> bool {
		self.months.is_empty()
	}

	pub fn first(&self) -> Month {
		self.months[0]
	}

	pub fn last(&self) -> Month {
		self.months[self.months.len() - 1]
	}

	/// Month at index `len / 2`.
	pub fn center(&self) -> Month {
		self.months[self.months.len() / 2]
	}

	pub fn get(&self, index: usize) -> Option<Month> {
		self.months.get(index).copied()
	}

	pub fn index_of(&self, month: Month) -> Option<usize> {
		let offset = self.first().months_until(month);
		usize::try_from(offset).ok().filter(|&i| i < self.months.len())
	}

	pub fn contains(&self, month: Month) -> bool {
		self.index_of(month).is_some()
	}

	pub fn active(&self) -> Month {
		self.active
	}

	/// Marks `month` active. Months outside the window are ignored.
	pub fn set_active(&mut self, month: Month) -> bool {
		if !self.contains(month) || month == self.active {
			return false;
		}
		self.active = month;
		true
	}

	pub fn initial_scroll_set(&self) -> bool {
		self.initial_scroll_set
	}

	pub fn mark_initial_scroll_set(&mut self) {
		self.initial_scroll_set = true;
	}

	/// Prepends `first - 1mo`. Returns false at the earliest representable month.
	pub fn extend_head(&mut self) -> bool {
		let first = self.first();
		let month = first.prev();
		if month == first {
			return false;
		}
		self.months.insert(0, month);
		self.assert_invariants();
		true
	}

	/// Appends `last + 1mo`. Returns false at the latest representable month.
	pub fn extend_tail(&mut self) -> bool {
		let last = self.last();
		let month = last.next();
		if month == last {
			return false;
		}
		self.months.push(month);
		self.assert_invariants();
		true
	}

	/// Replaces the window with a triple centered on `date` and clears the
	/// initial-scroll flag so the viewport re-centers.
	pub fn jump_to(&mut self, date: NaiveDate) {
		*self = Self::new(date);
	}

	pub fn go_to_today(&mut self) {
		self.jump_to(today());
	}

	fn assert_invariants(&self) {
		assert!(
			self.months.len() >= MIN_WINDOW_LEN,
			"month window shrank below {MIN_WINDOW_LEN}: {:?}",
			self.months
		);
		assert!(
			self.months.windows(2).all(|pair| pair[0].next() == pair[1] && pair[0] < pair[1]),
			"month window is not contiguous and ascending: {:?}",
			self.months
		);
		assert!(self.contains(self.active), "active month {} outside window", self.active);
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use proptest::prelude::*;

	use super::*;

	fn m(s: &str) -> Month {
		s.parse().unwrap()
	}

	fn keys(window: &MonthWindow) -> Vec<String> {
		window.months().iter().map(ToString::to_string).collect()
	}

	#[test]
	fn new_centers_on_date() {
		let window = MonthWindow::new(NaiveDate::from_ymd_opt(2024, 2, 17).unwrap());
		assert_eq!(keys(&window), ["2024-01", "2024-02", "2024-03"]);
		assert_eq!(window.active(), m("2024-02"));
		assert_eq!(window.center(), m("2024-02"));
		assert!(!window.initial_scroll_set());
	}

	#[test]
	fn extension_grows_edges() {
		let mut window = MonthWindow::centered(m("2024-02"));
		assert!(window.extend_tail());
		assert_eq!(keys(&window), ["2024-01", "2024-02", "2024-03", "2024-04"]);
		assert!(window.extend_head());
		assert_eq!(keys(&window), ["2023-12", "2024-01", "2024-02", "2024-03", "2024-04"]);
		assert_eq!(window.active(), m("2024-02"));
	}

	#[test]
	fn jump_resets_window_and_scroll_flag() {
		let mut window = MonthWindow::centered(m("2024-02"));
		window.extend_tail();
		window.extend_tail();
		window.mark_initial_scroll_set();

		window.jump_to(NaiveDate::from_ymd_opt(2030, 7, 4).unwrap());
		assert_eq!(keys(&window), ["2030-06", "2030-07", "2030-08"]);
		assert_eq!(window.active(), m("2030-07"));
		assert!(!window.initial_scroll_set());
	}

	#[test]
	fn go_to_today_centers_current_month() {
		let mut window = MonthWindow::centered(m("1999-01"));
		window.mark_initial_scroll_set();
		window.go_to_today();
		assert_eq!(window.center(), Month::today());
		assert_eq!(window.active(), Month::today());
		assert!(!window.initial_scroll_set());
	}

	#[test]
	fn set_active_ignores_months_outside_window() {
		let mut window = MonthWindow::centered(m("2024-02"));
		assert!(!window.set_active(m("2024-06")));
		assert!(window.set_active(m("2024-03")));
		assert!(!window.set_active(m("2024-03")));
		assert_eq!(window.active(), m("2024-03"));
	}

	#[test]
	fn index_of_maps_months_to_positions() {
		let mut window = MonthWindow::centered(m("2024-02"));
		window.extend_head();
		assert_eq!(window.index_of(m("2023-12")), Some(0));
		assert_eq!(window.index_of(m("2024-03")), Some(3));
		assert_eq!(window.index_of(m("2024-04")), None);
		assert_eq!(window.index_of(m("2023-11")), None);
	}

	#[test]
	fn edges_stop_at_representable_bounds() {
		let mut window = MonthWindow::centered(Month::MAX);
		assert_eq!(window.last(), Month::MAX);
		assert!(!window.extend_tail());
		assert_eq!(window.len(), 3);
	}

	proptest! {
		#[test]
		fn extension_preserves_invariants(ops in proptest::collection::vec(any::<bool>(), 0..64)) {
			let mut window = MonthWindow::centered(m("2024-02"));
			for head in &ops {
				if *head { window.extend_head(); } else { window.extend_tail(); }
			}
			prop_assert_eq!(window.len(), 3 + ops.len());
			prop_assert!(window.months().windows(2).all(|p| p[0].next() == p[1]));
			prop_assert_eq!(window.first().months_until(window.last()) as usize, window.len() - 1);
			prop_assert!(window.contains(window.active()));
		}
	}
}
