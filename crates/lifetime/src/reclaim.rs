use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::{Handle, PeerId};

/// Queue of peers observed unreachable but not yet processed by a cleanup pass.
///
/// Peers enqueue themselves from `Drop`, which may run on any thread. The
/// registry drains the queue once per tick; draining an empty queue takes no
/// lock thanks to the atomic pending count.
#[derive(Debug, Default)]
pub struct ReclaimQueue {
	entries: Mutex<VecDeque<(PeerId, Handle)>>,
	pending: AtomicUsize,
}

impl ReclaimQueue {
	/// Creates an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Enqueues one reclaimed-peer notification.
	pub fn push(&self, peer: PeerId, handle: Handle) {
		// The count moves under the queue lock so it can never run ahead of
		// (or behind) the entries a concurrent drain observes.
		let mut entries = self.entries.lock();
		entries.push_back((peer, handle));
		self.pending.fetch_add(1, Ordering::Release);
		drop(entries);
		tracing::trace!(peer = %peer, handle = %handle, "lifetime.reclaim.enqueue");
	}

	/// Takes every queued notification, oldest first.
	pub fn drain(&self) -> Vec<(PeerId, Handle)> {
		if self.is_empty() {
			return Vec::new();
		}
		let mut entries = self.entries.lock();
		let drained: Vec<_> = entries.drain(..).collect();
		self.pending.fetch_sub(drained.len(), Ordering::Release);
		drop(entries);
		drained
	}

	/// Number of notifications waiting for the next cleanup pass.
	pub fn pending(&self) -> usize {
		self.pending.load(Ordering::Acquire)
	}

	/// Returns true when nothing is queued.
	pub fn is_empty(&self) -> bool {
		self.pending() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn drain_preserves_push_order() {
		let queue = ReclaimQueue::new();
		let a = PeerId::next();
		let b = PeerId::next();
		queue.push(a, Handle::from_raw(1));
		queue.push(b, Handle::from_raw(2));
		assert_eq!(queue.pending(), 2);

		let drained = queue.drain();
		assert_eq!(drained, vec![(a, Handle::from_raw(1)), (b, Handle::from_raw(2))]);
		assert!(queue.is_empty());
	}

	#[test]
	fn drain_of_empty_queue_is_empty() {
		let queue = ReclaimQueue::new();
		assert!(queue.drain().is_empty());
		assert_eq!(queue.pending(), 0);
	}

	#[test]
	fn concurrent_push_and_drain_keep_the_count_sane() {
		use std::sync::Arc;

		const PUSHERS: usize = 4;
		const PER_PUSHER: usize = 64;

		let queue = Arc::new(ReclaimQueue::new());

		let pushers: Vec<_> = (0..PUSHERS)
			.map(|_| {
				let queue = Arc::clone(&queue);
				std::thread::spawn(move || {
					for raw in 1..=PER_PUSHER as u64 {
						queue.push(PeerId::next(), Handle::from_raw(raw));
					}
				})
			})
			.collect();
		let drainers: Vec<_> = (0..2)
			.map(|_| {
				let queue = Arc::clone(&queue);
				std::thread::spawn(move || {
					let mut taken = 0;
					for _ in 0..200 {
						taken += queue.drain().len();
					}
					taken
				})
			})
			.collect();
		let observer = {
			let queue = Arc::clone(&queue);
			std::thread::spawn(move || {
				for _ in 0..1000 {
					// A mid-race sample must never exceed the number of
					// pushes in flight; a wrapped counter would be huge.
					assert!(queue.pending() <= PUSHERS * PER_PUSHER);
				}
			})
		};

		for pusher in pushers {
			pusher.join().unwrap();
		}
		let mut taken: usize = drainers.into_iter().map(|t| t.join().unwrap()).sum();
		observer.join().unwrap();

		taken += queue.drain().len();
		assert_eq!(taken, PUSHERS * PER_PUSHER);
		assert_eq!(queue.pending(), 0);
	}
}
