use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier for one native-owned resource.
///
/// Carries identity only; the managed side never dereferences it, it is only
/// handed back across the boundary. Zero is reserved to mean "unbound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
	/// The reserved "no resource" handle.
	pub const UNBOUND: Handle = Handle(0);

	/// Wraps a raw native identifier.
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw native identifier.
	pub const fn raw(self) -> u64 {
		self.0
	}

	/// Returns true when this handle denotes a native resource.
	pub const fn is_bound(self) -> bool {
		self.0 != 0
	}
}

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Process-unique identity of one peer instance.
///
/// Distinct peers wrapping the same [`Handle`] get distinct ids; ids are
/// never reused, so a stale reclamation notification can never be mistaken
/// for a newer peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl PeerId {
	/// Allocates the next process-unique id.
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw id value.
	pub const fn raw(self) -> u64 {
		self.0
	}
}

impl fmt::Display for PeerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "peer#{}", self.0)
	}
}
