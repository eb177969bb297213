use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::reclaim::ReclaimQueue;
use crate::{Handle, PeerId};

/// Errors from peer binding misuse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PeerError {
	/// `bind` was given the reserved unbound handle.
	#[error("cannot bind the reserved unbound handle")]
	UnboundHandle,
	/// The peer is already bound; a peer binds exactly once.
	#[error("peer is already bound to {0}")]
	AlreadyBound(Handle),
}

/// Managed wrapper around exactly one native handle.
///
/// Constructed unbound, bound at most once, never rebound. Several
/// independent peers may wrap the same handle; the native resource survives
/// until the last of them has been reclaimed and a cleanup pass has run.
///
/// Dropping a bound peer enqueues its identity on the reclaim queue; it does
/// not release anything directly.
pub struct Peer {
	id: PeerId,
	handle: OnceLock<Handle>,
	reclaim: Arc<ReclaimQueue>,
}

impl Peer {
	/// Creates an unbound peer reporting its reclamation to `reclaim`.
	pub fn unbound(reclaim: Arc<ReclaimQueue>) -> Self {
		Self {
			id: PeerId::next(),
			handle: OnceLock::new(),
			reclaim,
		}
	}

	/// Creates a peer already bound to `handle`.
	pub fn bound(handle: Handle, reclaim: Arc<ReclaimQueue>) -> Result<Self, PeerError> {
		let peer = Self::unbound(reclaim);
		peer.bind(handle)?;
		Ok(peer)
	}

	/// Binds this peer to `handle`, permanently.
	pub fn bind(&self, handle: Handle) -> Result<(), PeerError> {
		if !handle.is_bound() {
			return Err(PeerError::UnboundHandle);
		}
		if self.handle.set(handle).is_err() {
			let bound = self.handle().unwrap_or(handle);
			return Err(PeerError::AlreadyBound(bound));
		}
		Ok(())
	}

	/// Returns the bound handle, if any.
	pub fn handle(&self) -> Option<Handle> {
		self.handle.get().copied()
	}

	/// Returns true once a handle has been bound.
	pub fn is_bound(&self) -> bool {
		self.handle.get().is_some()
	}

	/// This peer's process-unique identity.
	pub fn id(&self) -> PeerId {
		self.id
	}
}

impl Drop for Peer {
	fn drop(&mut self) {
		// Unbound peers never entered any referent set; nothing to report.
		if let Some(handle) = self.handle() {
			self.reclaim.push(self.id, handle);
		}
	}
}
