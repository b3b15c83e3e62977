//! Single-flight handles for per-month fetches.
//!
//! The first request for a month creates a [`FlightSender`]/[`Flight`] pair and
//! stores the [`Flight`] in the loader's slot table. Later requests for the same
//! month clone that [`Flight`] and await the same outcome instead of fetching.

use almanac_primitives::Month;
use tokio::sync::watch;

use crate::cache::MonthEvents;
use crate::error::LoadError;

/// Outcome shared by every waiter of one flight.
pub type FlightResult = Result<MonthEvents, LoadError>;

/// Receiving side of an in-progress month fetch.
#[derive(Debug, Clone)]
pub struct Flight {
	month: Month,
	rx: watch::Receiver<Option<FlightResult>>,
}

/// Completing side; owned by the fetch task.
#[derive(Debug)]
pub struct FlightSender {
	tx: watch::Sender<Option<FlightResult>>,
}

pub fn flight(month: Month) -> (FlightSender, Flight) {
	let (tx, rx) = watch::channel(None);
	(FlightSender { tx }, Flight { month, rx })
}

impl Flight {
	pub fn month(&self) -> Month {
		self.month
	}

	/// Resolves once the owning task publishes an outcome.
	///
	/// A task that dies without publishing resolves as [`LoadError::Cancelled`].
	pub async fn wait(mut self) -> FlightResult {
		let cancelled = LoadError::Cancelled(self.month);
		match self.rx.wait_for(Option::is_some).await {
			Ok(outcome) => outcome.clone().unwrap_or(Err(cancelled)),
			Err(_) => Err(cancelled),
		}
	}
}

impl FlightSender {
	/// Publishes the outcome to current and future waiters.
	pub fn complete(self, result: FlightResult) {
		self.tx.send_replace(Some(result));
	}
}
