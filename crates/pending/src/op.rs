use std::fmt;
use std::mem;

use parking_lot::Mutex;
use smallvec::SmallVec;

/// Native identity of one in-flight operation.
///
/// Assigned by the native side when it opens the operation; distinct from
/// any resource handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpHandle(u64);

impl OpHandle {
	/// Wraps a raw native operation identifier.
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw native identifier.
	pub const fn raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for OpHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "op#{}", self.0)
	}
}

/// Flavor of native-initiated work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
	/// One-shot command; resolves when executed.
	Event,
	/// Longer-running cancelable activity.
	Action,
}

type CompletionFn<T> = Box<dyn FnOnce(T) + Send>;
type TerminationFn = Box<dyn FnOnce() + Send>;

enum State<T> {
	Pending {
		on_resolved: Option<CompletionFn<T>>,
		on_terminated: SmallVec<[TerminationFn; 2]>,
	},
	Resolved,
	Terminated,
}

/// One native-initiated unit of work, resolved or terminated at most once.
///
/// `T` is the resolution payload handed to the completion callback. State
/// queries consult the authoritative state under the operation's own lock,
/// never a cached flag, because transitions can be driven from another
/// thread between two calls. Callbacks run on the transitioning thread,
/// after the state lock has been released.
pub struct PendingOperation<T> {
	handle: OpHandle,
	kind: OpKind,
	state: Mutex<State<T>>,
}

impl<T> PendingOperation<T> {
	pub(crate) fn new(handle: OpHandle, kind: OpKind) -> Self {
		Self {
			handle,
			kind,
			state: Mutex::new(State::Pending {
				on_resolved: None,
				on_terminated: SmallVec::new(),
			}),
		}
	}

	/// This operation's native identity.
	pub fn handle(&self) -> OpHandle {
		self.handle
	}

	/// Whether this is a one-shot event or a cancelable action.
	pub fn kind(&self) -> OpKind {
		self.kind
	}

	/// Sets the completion callback, fired once on resolution.
	///
	/// Single-assignment with last-write-wins: a second call replaces the
	/// first without error and only the latest callback fires. Attaching
	/// after a terminal state drops the callback, matching the transition's
	/// own discard of unfired callbacks.
	pub fn on_resolved(&self, callback: impl FnOnce(T) + Send + 'static) {
		let mut state = self.state.lock();
		match &mut *state {
			State::Pending { on_resolved, .. } => {
				if on_resolved.is_some() {
					tracing::warn!(op = %self.handle, "pending.completion_callback_replaced");
				}
				*on_resolved = Some(Box::new(callback));
			}
			State::Resolved | State::Terminated => {}
		}
	}

	/// Appends a termination callback; all fire in attachment order on
	/// termination. Attaching after a terminal state drops the callback.
	pub fn add_termination_callback(&self, callback: impl FnOnce() + Send + 'static) {
		let mut state = self.state.lock();
		match &mut *state {
			State::Pending { on_terminated, .. } => on_terminated.push(Box::new(callback)),
			State::Resolved | State::Terminated => {}
		}
	}

	/// Returns true while no terminal transition has applied.
	pub fn is_pending(&self) -> bool {
		matches!(*self.state.lock(), State::Pending { .. })
	}

	/// Returns true once the operation resolved.
	pub fn is_resolved(&self) -> bool {
		matches!(*self.state.lock(), State::Resolved)
	}

	/// Returns true once the operation was terminated.
	pub fn is_terminated(&self) -> bool {
		matches!(*self.state.lock(), State::Terminated)
	}

	/// PENDING→RESOLVED. Fires the completion callback with `payload` and
	/// discards termination callbacks uninvoked. Returns false, with no
	/// effect, when a terminal state was already reached.
	pub(crate) fn complete(&self, payload: T) -> bool {
		let callback = {
			let mut state = self.state.lock();
			match mem::replace(&mut *state, State::Resolved) {
				State::Pending { on_resolved, .. } => on_resolved,
				terminal => {
					*state = terminal;
					return false;
				}
			}
		};
		tracing::trace!(op = %self.handle, kind = ?self.kind, "pending.resolved");
		if let Some(callback) = callback {
			callback(payload);
		}
		true
	}

	/// PENDING→TERMINATED. Fires every termination callback in attachment
	/// order and discards the completion callback uninvoked. Returns false,
	/// with no effect, when a terminal state was already reached.
	pub(crate) fn terminate(&self) -> bool {
		let callbacks = {
			let mut state = self.state.lock();
			match mem::replace(&mut *state, State::Terminated) {
				State::Pending { on_terminated, .. } => on_terminated,
				terminal => {
					*state = terminal;
					return false;
				}
			}
		};
		tracing::trace!(op = %self.handle, kind = ?self.kind, "pending.terminated");
		for callback in callbacks {
			callback();
		}
		true
	}
}

impl<T> fmt::Debug for PendingOperation<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = match &*self.state.lock() {
			State::Pending { .. } => "pending",
			State::Resolved => "resolved",
			State::Terminated => "terminated",
		};
		f.debug_struct("PendingOperation")
			.field("handle", &self.handle)
			.field("kind", &self.kind)
			.field("state", &state)
			.finish()
	}
}
