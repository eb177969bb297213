use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::owner::ResourceOwner;
use crate::peer::Peer;
use crate::reclaim::ReclaimQueue;
use crate::{Handle, PeerId};


/// Shard count for the handle table. Power of two; see [`ReferenceRegistry::shard`].
const SHARD_COUNT: usize = 16;

/// Errors from registry misuse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
	/// The peer has no handle yet; registering it would track nothing.
	/// Indicates the caller's lifetime bookkeeping is already broken.
	#[error("cannot register an unbound peer")]
	UnboundPeer,
}

/// Outcome of one cleanup pass, for the tick driver's logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
	/// Reclaimed-peer notifications processed.
	pub reclaimed_peers: usize,
	/// Native handles released because their referent set emptied.
	pub released_handles: usize,
}

type Shard = Mutex<FxHashMap<Handle, FxHashSet<PeerId>>>;

/// Tracks which peers currently reference each native handle and releases
/// each resource exactly once, when its referent set empties.
///
/// The table is sharded by handle so a cleanup pass touching one handle never
/// blocks registration of an unrelated one. Invariant: a handle appears in
/// the table iff at least one registered peer for it has not yet been
/// processed by a cleanup pass; referent sets in the table are never empty.
pub struct ReferenceRegistry {
	shards: [Shard; SHARD_COUNT],
	owner: Arc<dyn ResourceOwner>,
	reclaim: Arc<ReclaimQueue>,
}

impl ReferenceRegistry {
	/// Creates a registry releasing through `owner` and draining `reclaim`.
	pub fn new(owner: Arc<dyn ResourceOwner>, reclaim: Arc<ReclaimQueue>) -> Self {
		Self {
			shards: std::array::from_fn(|_| Mutex::new(FxHashMap::default())),
			owner,
			reclaim,
		}
	}

	/// The reclaim queue this registry drains.
	pub fn reclaim_queue(&self) -> &Arc<ReclaimQueue> {
		&self.reclaim
	}

	fn shard(&self, handle: Handle) -> &Shard {
		// Fibonacci scrambling: native handles are frequently aligned
		// pointers whose low bits carry no entropy.
		let idx = (handle.raw().wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 60) as usize;
		&self.shards[idx & (SHARD_COUNT - 1)]
	}

	/// Adds `peer` to the referent set of its handle.
	///
	/// Registering an unbound peer fails; registering the same peer twice is
	/// idempotent. Safe to call concurrently from any thread.
	pub fn register(&self, peer: &Peer) -> Result<(), RegistryError> {
		let Some(handle) = peer.handle() else {
			return Err(RegistryError::UnboundPeer);
		};
		let inserted = self.shard(handle).lock().entry(handle).or_default().insert(peer.id());
		if inserted {
			tracing::trace!(handle = %handle, peer = %peer.id(), "lifetime.register");
		}
		Ok(())
	}

	/// Drains the reclaim queue and releases every handle whose referent set
	/// empties as a result.
	///
	/// An empty queue makes this a no-op leaving all state unchanged. Safe to
	/// call concurrently: the per-handle remove-check-release sequence runs
	/// under the handle's shard lock, so two passes observing the same
	/// notification stream can never double-release.
	pub fn run_cleanup_pass(&self) -> CleanupReport {
		let reclaimed = self.reclaim.drain();
		let mut report = CleanupReport {
			reclaimed_peers: reclaimed.len(),
			..CleanupReport::default()
		};
		for (peer, handle) in reclaimed {
			if self.forget(peer, handle) {
				report.released_handles += 1;
			}
		}
		if report.reclaimed_peers > 0 {
			tracing::debug!(
				reclaimed = report.reclaimed_peers,
				released = report.released_handles,
				"lifetime.cleanup_pass"
			);
		}
		report
	}

	/// Removes one reclaimed peer from its handle's referent set, releasing
	/// the handle when the set empties. Returns true when a release happened.
	fn forget(&self, peer: PeerId, handle: Handle) -> bool {
		let mut shard = self.shard(handle).lock();
		let Some(referents) = shard.get_mut(&handle) else {
			// Handle already released or peer never registered; benign race.
			return false;
		};
		if !referents.remove(&peer) || !referents.is_empty() {
			return false;
		}
		shard.remove(&handle);
		// Still under the shard lock: removal and release must be atomic so
		// a concurrent re-registration cannot interleave between them.
		self.owner.release(handle);
		tracing::debug!(handle = %handle, "lifetime.release");
		true
	}

	/// Returns true while any registered peer for `handle` awaits cleanup.
	pub fn has_referents(&self, handle: Handle) -> bool {
		self.shard(handle).lock().contains_key(&handle)
	}

	/// Number of registered peers for `handle` not yet processed by cleanup.
	pub fn referent_count(&self, handle: Handle) -> usize {
		self.shard(handle).lock().get(&handle).map_or(0, FxHashSet::len)
	}

	/// Number of distinct handles currently tracked.
	pub fn tracked_handles(&self) -> usize {
		self.shards.iter().map(|shard| shard.lock().len()).sum()
	}

	/// Asks the native side whether `handle` still has a live resource.
	/// Verification helper only.
	pub fn owner_reports_live(&self, handle: Handle) -> bool {
		self.owner.is_live(handle)
	}
}
