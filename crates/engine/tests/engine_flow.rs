//! End-to-end engine behavior against file-backed and scripted sources.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use almanac_engine::{
	CalendarEngine, EngineConfig, EventMapper, EventRecord, EventSource, FetchError, FnSource, JsonFileSource,
	LoadStatus, Month, MonthRange, NaiveDate, RetryPolicy,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

fn m(s: &str) -> Month {
	s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
	s.parse().unwrap()
}

fn events_file() -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	write!(
		file,
		"{}",
		json!({
			"events": [
				{ "id": "kickoff", "title": "Kickoff", "date": "2024-03-04", "color": "#22c55e" },
				{ "title": "Standup", "startTime": "2024-03-05T09:00:00Z", "endTime": "2024-03-05T09:15:00Z" },
				{ "name": "Review", "startDate": "2024-04-18" },
				{ "title": "Undated" },
				{ "title": "Launch", "date": "2024-09-01" },
			]
		})
	)
	.unwrap();
	file
}

#[tokio::test]
async fn file_source_populates_grids() {
	let file = events_file();
	let engine = CalendarEngine::builder(EngineConfig::default(), Arc::new(JsonFileSource::new(file.path())))
		.initial(date("2024-03-15"))
		.build()
		.unwrap();
	engine.settle().await;

	let march = engine.month_grid(1).unwrap();
	assert_eq!(march.month, m("2024-03"));
	assert_eq!(march.events_on(date("2024-03-04"))[0].id, "kickoff");
	let standup = &march.events_on(date("2024-03-05"))[0];
	assert_eq!(standup.id, "event-2024-03-05-Standup-1");

	let april = engine.month_grid(2).unwrap();
	assert_eq!(april.events_on(date("2024-04-18"))[0].title, "Review");

	// Undated items are dropped per month rather than failing the load.
	let snapshot = engine.snapshot();
	assert!(snapshot.errored.is_empty());
	assert_eq!(snapshot.cache.size, 7);
	assert!(engine.events(m("2024-09")).is_none());
}

#[tokio::test(start_paused = true)]
async fn scrolling_forward_then_jumping_back() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let source: Arc<dyn EventSource> = Arc::new(FnSource::new(move |_range: MonthRange| {
		counter.fetch_add(1, Ordering::SeqCst);
		async { Ok::<_, FetchError>(Vec::new()) }
	}));
	let engine = CalendarEngine::new(EngineConfig::default(), source, EventMapper::default(), Some(date("2024-01-10"))).unwrap();
	engine.settle().await;
	assert_eq!(calls.load(Ordering::SeqCst), 7);

	for _ in 0..6 {
		engine.extend_tail();
	}
	engine.settle().await;
	let snapshot = engine.snapshot();
	assert_eq!(snapshot.window.len(), 9);
	assert_eq!(snapshot.window.last(), Some(&m("2024-08")));
	// Tail buffer reaches two months past the last window month.
	assert_eq!(snapshot.loaded.last(), Some(&m("2024-10")));
	assert_eq!(calls.load(Ordering::SeqCst), 13);

	// Jumping back onto already loaded months fetches nothing new.
	let request = engine.jump_to(date("2024-01-20"));
	assert!(request.started().is_empty());
	assert_eq!(engine.snapshot().window, vec![m("2023-12"), m("2024-01"), m("2024-02")]);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_heal_on_next_window_change() {
	let failing = Arc::new(Mutex::new(true));
	let flag = failing.clone();
	let source: Arc<dyn EventSource> = Arc::new(FnSource::new(move |range: MonthRange| {
		let fail = *flag.lock();
		async move {
			if fail {
				Err(FetchError::Network("connection reset".to_string()))
			} else {
				Ok(vec![json!({ "title": "ok", "date": range.start.to_string() })])
			}
		}
	}));
	let config = EngineConfig {
		retry: RetryPolicy {
			max_retries: 3,
			base_delay: Duration::from_millis(10),
		},
		..EngineConfig::default()
	};
	let engine = CalendarEngine::new(config, source, EventMapper::default(), Some(date("2024-05-01"))).unwrap();
	engine.settle().await;

	let snapshot = engine.snapshot();
	assert_eq!(snapshot.errored.len(), 7);
	assert!(snapshot.loaded.is_empty());
	assert!(matches!(engine.status(m("2024-05")), LoadStatus::Errored(ref msg) if msg.contains("connection reset")));

	*failing.lock() = false;
	engine.extend_tail().unwrap().wait().await;
	engine.settle().await;

	let snapshot = engine.snapshot();
	assert!(snapshot.errored.is_empty());
	assert_eq!(engine.status(m("2024-05")), LoadStatus::Loaded);
	assert_eq!(engine.events(m("2024-05")).unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn range_loaded_fires_per_month_and_eviction_resyncs() {
	let seen: Arc<Mutex<Vec<MonthRange>>> = Arc::default();
	let sink = seen.clone();
	let source: Arc<dyn EventSource> = Arc::new(FnSource::new(|_range: MonthRange| async {
		Ok::<_, FetchError>(Vec::new())
	}));
	let config = EngineConfig {
		cache_capacity: 8,
		..EngineConfig::default()
	};
	let engine = CalendarEngine::builder(config, source)
		.initial(date("2024-05-01"))
		.on_range_loaded(Arc::new(move |range: MonthRange, _events: &[EventRecord]| sink.lock().push(range)))
		.build()
		.unwrap();
	engine.settle().await;
	assert_eq!(seen.lock().len(), 7);

	engine.extend_tail();
	engine.extend_tail();
	engine.settle().await;

	let snapshot = engine.snapshot();
	assert_eq!(snapshot.cache.size, 8);
	assert_eq!(snapshot.cache.keys.len(), 8);
	let idle: Vec<_> = (0..9)
		.map(|i| m("2024-02").offset(i))
		.filter(|month| engine.status(*month) == LoadStatus::Idle)
		.collect();
	assert_eq!(idle.len(), 1);
	assert!(!snapshot.cache.keys.contains(&idle[0].to_string()));
	assert_eq!(seen.lock().len(), 9);
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_in_flight_loads() {
	let source: Arc<dyn EventSource> = Arc::new(FnSource::new(|_range: MonthRange| async {
		tokio::time::sleep(Duration::from_secs(1)).await;
		Ok::<_, FetchError>(vec![json!({ "date": "2024-05-01" })])
	}));
	let engine = CalendarEngine::new(EngineConfig::default(), source, EventMapper::default(), Some(date("2024-05-01"))).unwrap();
	tokio::time::sleep(Duration::from_millis(10)).await;
	engine.shutdown();
	tokio::time::sleep(Duration::from_secs(2)).await;

	assert!(engine.snapshot().cache.keys.is_empty());
}
