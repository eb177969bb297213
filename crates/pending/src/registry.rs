use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::op::{OpHandle, PendingOperation};

/// Active set of in-flight operations for one document session.
///
/// Holds exactly the operations that have not yet reached a terminal state;
/// whoever applies a terminal transition also removes the entry. Exists so
/// that session teardown can cancel everything outstanding without the
/// native side enumerating operations one by one.
pub struct PendingOperationRegistry<T> {
	active: Mutex<FxHashMap<OpHandle, Arc<PendingOperation<T>>>>,
}

impl<T> PendingOperationRegistry<T> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			active: Mutex::new(FxHashMap::default()),
		}
	}

	pub(crate) fn insert(&self, op: Arc<PendingOperation<T>>) {
		let handle = op.handle();
		let displaced = self.active.lock().insert(handle, op);
		if let Some(displaced) = displaced {
			// Opening a second operation under a live handle is caller
			// misuse; the displaced operation must still reach a terminal
			// state or teardown would never see it.
			tracing::warn!(op = %handle, "pending.duplicate_begin_displaced");
			displaced.terminate();
		}
	}

	pub(crate) fn remove(&self, handle: OpHandle) -> Option<Arc<PendingOperation<T>>> {
		self.active.lock().remove(&handle)
	}

	/// Looks up one in-flight operation.
	pub fn get(&self, handle: OpHandle) -> Option<Arc<PendingOperation<T>>> {
		self.active.lock().get(&handle).cloned()
	}

	/// Number of operations currently in flight.
	pub fn active_count(&self) -> usize {
		self.active.lock().len()
	}

	/// Returns true when nothing is in flight.
	pub fn is_empty(&self) -> bool {
		self.active.lock().is_empty()
	}

	/// Terminates every operation in the active set, invoking termination
	/// callbacks before returning.
	///
	/// Loops until a drain observes an empty set, so registrations racing
	/// with the call are terminated too; an operation created strictly after
	/// this returns belongs to the next session epoch and is left alone.
	/// Callbacks run outside the set lock, on the calling thread.
	pub fn cancel_all(&self) {
		loop {
			let drained: Vec<_> = {
				let mut active = self.active.lock();
				if active.is_empty() {
					break;
				}
				active.drain().map(|(_, op)| op).collect()
			};
			tracing::debug!(count = drained.len(), "pending.cancel_all");
			for op in drained {
				// Already-terminal operations swept up here are no-ops.
				op.terminate();
			}
		}
	}
}

impl<T> Default for PendingOperationRegistry<T> {
	fn default() -> Self {
		Self::new()
	}
}
