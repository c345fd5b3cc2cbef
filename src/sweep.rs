//! Periodic sweep loops that evict elapsed entries from in-memory maps.
//!
//! The TTL cache and the rate limiter both expire state lazily on access; the sweeper bounds memory
//! growth from keys that are never touched again. Each loop is owned by a [`SweepHandle`] so tests
//! and embedders can stop it deterministically.

// std
use std::sync::Weak;
// crates.io
use tokio::{
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};
// self
use crate::_prelude::*;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::minutes(5);

/// State container that can drop everything that elapsed before `now`.
pub trait Sweep
where
	Self: 'static + Send + Sync,
{
	/// Stable label used in sweep logs.
	const LABEL: &'static str;

	/// Removes entries that elapsed before `now`, returning how many were removed.
	fn sweep_at(&self, now: OffsetDateTime) -> usize;

	/// Removes entries that elapsed before the current UTC instant.
	fn sweep(&self) -> usize {
		self.sweep_at(OffsetDateTime::now_utc())
	}
}

/// Owns a background sweep task; dropping or stopping the handle ends the loop.
#[derive(Debug)]
pub struct SweepHandle {
	task: Option<JoinHandle<()>>,
}
impl SweepHandle {
	/// Spawns a sweep loop on the current Tokio runtime.
	///
	/// The loop holds only a weak reference, so it also exits once `target` is dropped. The first
	/// sweep runs one full `interval` after spawning.
	pub fn spawn<S>(target: &Arc<S>, interval: Duration) -> Self
	where
		S: Sweep,
	{
		let target = Arc::downgrade(target);
		let period = interval.unsigned_abs().max(std::time::Duration::from_millis(1));
		let task = tokio::spawn(run_loop(target, period));

		Self { task: Some(task) }
	}

	/// Returns `true` while the loop is still scheduled.
	pub fn is_running(&self) -> bool {
		self.task.as_ref().is_some_and(|task| !task.is_finished())
	}

	/// Stops the loop and waits for the task to wind down.
	pub async fn stop(mut self) {
		if let Some(task) = self.task.take() {
			task.abort();

			let _ = task.await;
		}
	}
}
impl Drop for SweepHandle {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

async fn run_loop<S>(target: Weak<S>, period: std::time::Duration)
where
	S: Sweep,
{
	let mut ticker = time::interval_at(time::Instant::now() + period, period);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		let Some(target) = target.upgrade() else {
			tracing::debug!(target_kind = S::LABEL, "Sweep target dropped; stopping loop.");

			break;
		};
		let removed = target.sweep();

		if removed > 0 {
			tracing::debug!(target_kind = S::LABEL, removed, "Swept elapsed entries.");
		}
	}
}
