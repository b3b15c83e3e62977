use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(1)
			.thread_name("almanac-worker-global")
			.build()
			.expect("failed to build almanac-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task on the ambient runtime, or on a shared fallback runtime
/// when called outside of one.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	runtime_handle().spawn(fut)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn spawn_outside_runtime_uses_fallback() {
		let handle = spawn(TaskClass::Fetch, async { 7 });
		let (tx, rx) = std::sync::mpsc::channel();
		spawn(TaskClass::Fetch, async move {
			let _ = tx.send(handle.await.ok());
		});
		assert_eq!(rx.recv().unwrap(), Some(7));
	}

	#[tokio::test]
	async fn spawn_inside_runtime_uses_current() {
		let value = spawn(TaskClass::Fetch, async { "ok" }).await.unwrap();
		assert_eq!(value, "ok");
	}
}
