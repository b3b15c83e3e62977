//! Engine tuning knobs.
//!
//! Every field has a default matching the stock behavior, so an empty TOML
//! document yields [`EngineConfig::default`]. Durations are written as integer
//! milliseconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or field types.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A value parsed but is not usable.
	#[error("invalid value for '{field}': {reason}")]
	Invalid {
		/// Dotted path of the offending field.
		field: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// Maximum number of distinct months held in the event cache.
	pub cache_capacity: usize,
	/// Months fetched on each side of every window month.
	pub preload_buffer: u32,
	/// Minimum center-to-center distance (in months) treated as a jump.
	pub jump_threshold: u32,
	/// Months fetched on each side of the new center after a jump.
	pub jump_radius: u32,
	pub retry: RetryPolicy,
	pub viewport: ViewportConfig,
	pub scroll: ScrollConfig,
	pub layout: LayoutConfig,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			cache_capacity: 50,
			preload_buffer: 2,
			jump_threshold: 3,
			jump_radius: 3,
			retry: RetryPolicy::default(),
			viewport: ViewportConfig::default(),
			scroll: ScrollConfig::default(),
			layout: LayoutConfig::default(),
		}
	}
}

impl EngineConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(src)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let src = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&src)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.cache_capacity == 0 {
			return Err(ConfigError::Invalid {
				field: "cache_capacity",
				reason: "must hold at least one month",
			});
		}
		if self.jump_threshold == 0 {
			return Err(ConfigError::Invalid {
				field: "jump_threshold",
				reason: "must be at least one month",
			});
		}
		let threshold = self.viewport.switch_threshold;
		if !threshold.is_finite() || threshold < 0.0 {
			return Err(ConfigError::Invalid {
				field: "viewport.switch_threshold",
				reason: "must be a finite, non-negative score",
			});
		}
		if !self.viewport.week_bonus.is_finite() || self.viewport.week_bonus < 0.0 {
			return Err(ConfigError::Invalid {
				field: "viewport.week_bonus",
				reason: "must be a finite, non-negative weight",
			});
		}
		if !self.scroll.threshold_px.is_finite() || self.scroll.threshold_px < 0.0 {
			return Err(ConfigError::Invalid {
				field: "scroll.threshold_px",
				reason: "must be a finite, non-negative distance",
			});
		}
		if self.layout.min_height > self.layout.max_height {
			return Err(ConfigError::Invalid {
				field: "layout.min_height",
				reason: "must not exceed layout.max_height",
			});
		}
		Ok(())
	}
}

/// Bounded retry with linear backoff.
///
/// The delay before retry `n` (1-based) is `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
	pub max_retries: u32,
	#[serde(with = "millis", rename = "base_delay_ms")]
	pub base_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: Duration::from_millis(1000),
		}
	}
}

impl RetryPolicy {
	pub fn delay_before_retry(&self, retry: u32) -> Duration {
		self.base_delay.saturating_mul(retry)
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_retries.saturating_add(1)
	}
}

/// Active-month election tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
	/// Quiet period after the last visibility sample before electing.
	#[serde(with = "millis", rename = "debounce_ms")]
	pub debounce: Duration,
	/// Candidate score that must be exceeded to switch the active month.
	pub switch_threshold: f64,
	/// Score added per visible week.
	pub week_bonus: f64,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			debounce: Duration::from_millis(150),
			switch_threshold: 0.3,
			week_bonus: 0.1,
		}
	}
}

/// Edge-triggered window growth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollConfig {
	/// Distance from either edge, in pixels, that triggers extension.
	pub threshold_px: f64,
	/// Suppression window after a trigger.
	#[serde(with = "millis", rename = "cooldown_ms")]
	pub cooldown: Duration,
}

impl Default for ScrollConfig {
	fn default() -> Self {
		Self {
			threshold_px: 100.0,
			cooldown: Duration::from_millis(100),
		}
	}
}

/// Pixel metrics used for initial positioning and height bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
	/// Height of one week row.
	pub day_cell_height: f64,
	/// Height reserved for the sticky header.
	pub header_height: f64,
	pub top_offset: f64,
	pub bottom_offset: f64,
	pub min_height: f64,
	pub max_height: f64,
	/// Height changes smaller than this are not reported.
	pub min_height_delta: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			day_cell_height: 60.0,
			header_height: 100.0,
			top_offset: 0.0,
			bottom_offset: 20.0,
			min_height: 400.0,
			max_height: f64::MAX,
			min_height_delta: 5.0,
		}
	}
}

mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
	}

	#[test]
	fn partial_tables_keep_other_defaults() {
		let config = EngineConfig::from_toml_str(
			r#"
			cache_capacity = 12

			[retry]
			base_delay_ms = 250

			[viewport]
			debounce_ms = 80
			"#,
		)
		.unwrap();

		assert_eq!(config.cache_capacity, 12);
		assert_eq!(config.retry.base_delay, Duration::from_millis(250));
		assert_eq!(config.retry.max_retries, 3);
		assert_eq!(config.viewport.debounce, Duration::from_millis(80));
		assert_eq!(config.viewport.switch_threshold, 0.3);
		assert_eq!(config.scroll, ScrollConfig::default());
	}

	#[test]
	fn rejects_zero_capacity() {
		let err = EngineConfig::from_toml_str("cache_capacity = 0").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { field: "cache_capacity", .. }));
	}

	#[test]
	fn rejects_unknown_keys() {
		let err = EngineConfig::from_toml_str("cache_size = 10").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)));
	}

	#[test]
	fn retry_delays_grow_linearly() {
		let policy = RetryPolicy {
			max_retries: 3,
			base_delay: Duration::from_millis(100),
		};
		assert_eq!(policy.delay_before_retry(1), Duration::from_millis(100));
		assert_eq!(policy.delay_before_retry(3), Duration::from_millis(300));
		assert_eq!(policy.max_attempts(), 4);
	}

	#[test]
	fn loads_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[scroll]\nthreshold_px = 40.0\ncooldown_ms = 250").unwrap();

		let config = EngineConfig::load(file.path()).unwrap();
		assert_eq!(config.scroll.threshold_px, 40.0);
		assert_eq!(config.scroll.cooldown, Duration::from_millis(250));
	}

	#[test]
	fn missing_file_reports_path() {
		let err = EngineConfig::load("/nonexistent/almanac.toml").unwrap_err();
		assert!(matches!(err, ConfigError::Io { ref path, .. } if path.ends_with("almanac.toml")));
	}
}
