//! Bounded per-month event store with insertion-order eviction.

use std::sync::Arc;

use almanac_primitives::Month;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::event::EventRecord;

/// Records resolved for one month, shared with every caller that awaited them.
pub type MonthEvents = Arc<[EventRecord]>;

/// Read-only view of the cache for debugging overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDiagnostics {
	pub size: usize,
	pub capacity: usize,
	/// Cached month keys, oldest insertion first.
	pub keys: Vec<String>,
}

/// Shared handle to a bounded month → events map.
///
/// Eviction is strict FIFO on first insertion: reads do not refresh a month,
/// and re-inserting a cached month keeps its original position. A month still
/// on screen can therefore be evicted before one never viewed.
#[derive(Debug, Clone)]
pub struct EventCache {
	inner: Arc<Mutex<CacheInner>>,
}

#[derive(Debug)]
struct CacheInner {
	capacity: usize,
	entries: IndexMap<Month, MonthEvents>,
}

impl EventCache {
	/// Creates an empty cache holding at most `capacity` months (minimum 1).
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			inner: Arc::new(Mutex::new(CacheInner {
				capacity,
				entries: IndexMap::with_capacity(capacity + 1),
			})),
		}
	}

	/// Stores `events` under `month`, returning the month evicted to stay within capacity.
	pub fn insert(&self, month: Month, events: MonthEvents) -> Option<Month> {
		let mut inner = self.inner.lock();
		inner.entries.insert(month, events);
		if inner.entries.len() <= inner.capacity {
			return None;
		}
		let (evicted, _) = inner.entries.shift_remove_index(0)?;
		tracing::debug!(month = %evicted, inserted = %month, size = inner.entries.len(), "cache.evict");
		Some(evicted)
	}

	pub fn get(&self, month: Month) -> Option<MonthEvents> {
		self.inner.lock().entries.get(&month).cloned()
	}

	pub fn contains(&self, month: Month) -> bool {
		self.inner.lock().entries.contains_key(&month)
	}

	pub fn len(&self) -> usize {
		self.inner.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.inner.lock().capacity
	}

	/// Cached months, oldest insertion first.
	pub fn months(&self) -> Vec<Month> {
		self.inner.lock().entries.keys().copied().collect()
	}

	pub fn diagnostics(&self) -> CacheDiagnostics {
		let inner = self.inner.lock();
		CacheDiagnostics {
			size: inner.entries.len(),
			capacity: inner.capacity,
			keys: inner.entries.keys().map(ToString::to_string).collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use proptest::prelude::*;

	use super::*;

	fn month(offset: i64) -> Month {
		"2024-01".parse::<Month>().unwrap().offset(offset)
	}

	fn empty() -> MonthEvents {
		Arc::from(Vec::new())
	}

	#[test]
	fn capacity_plus_one_evicts_earliest() {
		let cache = EventCache::new(3);
		for i in 0..3 {
			assert_eq!(cache.insert(month(i), empty()), None);
		}
		assert_eq!(cache.insert(month(3), empty()), Some(month(0)));
		assert_eq!(cache.months(), vec![month(1), month(2), month(3)]);
	}

	#[test]
	fn reads_do_not_refresh_position() {
		let cache = EventCache::new(2);
		cache.insert(month(0), empty());
		cache.insert(month(1), empty());
		assert!(cache.get(month(0)).is_some());

		assert_eq!(cache.insert(month(2), empty()), Some(month(0)));
	}

	#[test]
	fn reinsert_keeps_original_position() {
		let cache = EventCache::new(2);
		cache.insert(month(0), empty());
		cache.insert(month(1), empty());
		assert_eq!(cache.insert(month(0), empty()), None);

		assert_eq!(cache.insert(month(2), empty()), Some(month(0)));
	}

	#[test]
	fn diagnostics_list_keys_in_insertion_order() {
		let cache = EventCache::new(50);
		cache.insert(month(5), empty());
		cache.insert(month(-1), empty());
		assert_eq!(
			cache.diagnostics(),
			CacheDiagnostics {
				size: 2,
				capacity: 50,
				keys: vec!["2024-06".to_string(), "2023-12".to_string()],
			}
		);
	}

	#[test]
	fn clones_share_storage() {
		let cache = EventCache::new(4);
		let handle = cache.clone();
		handle.insert(month(0), empty());
		assert!(cache.contains(month(0)));
	}

	proptest! {
		#[test]
		fn never_exceeds_capacity(capacity in 1usize..16, inserts in proptest::collection::vec(0i64..40, 0..200)) {
			let cache = EventCache::new(capacity);
			for offset in inserts {
				cache.insert(month(offset), empty());
				prop_assert!(cache.len() <= capacity);
			}
		}
	}
}
