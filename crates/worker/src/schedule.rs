use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{TaskClass, spawn};

/// Handle to a callback scheduled with [`schedule`].
///
/// Dropping the handle does not cancel the callback; call [`Self::cancel`].
#[derive(Debug)]
pub struct ScheduledTask {
	cancel: CancellationToken,
	join: JoinHandle<()>,
}

impl ScheduledTask {
	/// Prevents the callback from running if its delay has not yet elapsed.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Returns true once the callback ran or the task observed cancellation.
	pub fn is_finished(&self) -> bool {
		self.join.is_finished()
	}
}

/// Runs `f` once after `delay` unless the returned handle is cancelled first.
pub fn schedule<F>(class: TaskClass, delay: Duration, f: F) -> ScheduledTask
where
	F: FnOnce() + Send + 'static,
{
	let cancel = CancellationToken::new();
	let token = cancel.clone();
	let join = spawn(class, async move {
		tokio::select! {
			biased;
			_ = token.cancelled() => {}
			_ = tokio::time::sleep(delay) => {
				if !token.is_cancelled() {
					f();
				}
			}
		}
	});
	ScheduledTask { cancel, join }
}

/// Keeps at most one pending callback per purpose.
///
/// Each [`Self::schedule`] call cancels the previously pending callback, so only
/// the last request inside a quiet period fires.
#[derive(Debug)]
pub struct Debouncer {
	name: &'static str,
	class: TaskClass,
	pending: Option<ScheduledTask>,
}

impl Debouncer {
	pub fn new(name: &'static str, class: TaskClass) -> Self {
		Self { name, class, pending: None }
	}

	pub fn schedule<F>(&mut self, delay: Duration, f: F)
	where
		F: FnOnce() + Send + 'static,
	{
		let superseded = self.pending.take().is_some_and(|prev| {
			prev.cancel();
			!prev.is_finished()
		});
		tracing::trace!(debouncer = self.name, delay_ms = delay.as_millis() as u64, superseded, "worker.debounce.schedule");
		self.pending = Some(schedule(self.class, delay, f));
	}

	/// Cancels the pending callback, if any.
	pub fn cancel(&mut self) {
		if let Some(prev) = self.pending.take() {
			prev.cancel();
		}
	}

	pub fn is_pending(&self) -> bool {
		self.pending.as_ref().is_some_and(|task| !task.is_cancelled() && !task.is_finished())
	}
}

impl Drop for Debouncer {
	fn drop(&mut self) {
		self.cancel();
	}
}
