use std::sync::Arc;

use tether_lifetime::{CleanupReport, ReferenceRegistry};

use crate::op::{OpHandle, OpKind, PendingOperation};
use crate::registry::PendingOperationRegistry;

#[cfg(test)]
mod tests;

/// Native-side bookkeeping hook for client-initiated resolution.
///
/// When the managed side, not native code, decides an operation is done, the
/// native side must be told so its own record of the operation retires.
/// Native-driven transitions arrive the other way, through
/// [`SessionContext::notify_resolved`] and
/// [`SessionContext::notify_terminated`], and need no echo.
pub trait OperationBridge: Send + Sync {
	/// Called after the managed side resolved `op`.
	fn resolved_by_client(&self, op: OpHandle);
}

/// Context owning everything scoped to one displayed document.
///
/// Holds the session's in-flight operation set and a shared reference to the
/// handle-lifetime registry, whose cleanup pass it drives once per frame.
/// Dropping the context cancels every operation still in flight.
pub struct SessionContext<T> {
	operations: PendingOperationRegistry<T>,
	bridge: Arc<dyn OperationBridge>,
	lifetimes: Arc<ReferenceRegistry>,
}

impl<T> SessionContext<T> {
	/// Creates a session resolving back through `bridge` and sharing the
	/// process-wide `lifetimes` registry.
	pub fn new(bridge: Arc<dyn OperationBridge>, lifetimes: Arc<ReferenceRegistry>) -> Self {
		Self {
			operations: PendingOperationRegistry::new(),
			bridge,
			lifetimes,
		}
	}

	/// Registers a native-opened operation and returns its managed face.
	///
	/// Opening a second operation under a handle that is still in flight is
	/// caller misuse: the displaced operation is terminated on the spot (its
	/// termination callbacks fire) so it cannot outlive the active set.
	pub fn begin(&self, handle: OpHandle, kind: OpKind) -> Arc<PendingOperation<T>> {
		let op = Arc::new(PendingOperation::new(handle, kind));
		self.operations.insert(Arc::clone(&op));
		tracing::trace!(op = %handle, kind = ?kind, "pending.begin");
		op
	}

	/// Native "completed" notification: resolves the operation and drops it
	/// from the active set. Unknown handles are a benign race, ignored.
	pub fn notify_resolved(&self, handle: OpHandle, payload: T) {
		let Some(op) = self.operations.get(handle) else {
			return;
		};
		if op.complete(payload) {
			self.operations.remove(handle);
		}
	}

	/// Native "terminated" notification: covers sequencing cancellation on
	/// the native side as well as forced session-wide cancellation echoes.
	/// Unknown handles are ignored.
	pub fn notify_terminated(&self, handle: OpHandle) {
		let Some(op) = self.operations.get(handle) else {
			return;
		};
		if op.terminate() {
			self.operations.remove(handle);
		}
	}

	/// Managed-side completion: applies the transition, then tells the
	/// native side so its bookkeeping matches. The bridge is only notified
	/// when this call actually won the transition.
	pub fn resolve(&self, handle: OpHandle, payload: T) {
		let Some(op) = self.operations.get(handle) else {
			return;
		};
		if op.complete(payload) {
			self.bridge.resolved_by_client(handle);
			self.operations.remove(handle);
		}
	}

	/// Terminates every operation still in flight, invoking termination
	/// callbacks before returning. See
	/// [`PendingOperationRegistry::cancel_all`] for the race rules.
	pub fn cancel_all(&self) {
		self.operations.cancel_all();
	}

	/// Number of operations currently in flight.
	pub fn active_operations(&self) -> usize {
		self.operations.active_count()
	}

	/// The session's active operation set.
	pub fn operations(&self) -> &PendingOperationRegistry<T> {
		&self.operations
	}

	/// The shared handle-lifetime registry.
	pub fn lifetimes(&self) -> &Arc<ReferenceRegistry> {
		&self.lifetimes
	}

	/// Per-frame maintenance: drains reclaimed peers and releases handles
	/// whose referent sets emptied. Missing frames delay reclamation but
	/// never change behavior.
	pub fn frame_tick(&self) -> CleanupReport {
		self.lifetimes.run_cleanup_pass()
	}
}

impl<T> Drop for SessionContext<T> {
	fn drop(&mut self) {
		// A torn-down session must leave no operation pending forever.
		self.operations.cancel_all();
	}
}
