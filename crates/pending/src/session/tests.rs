use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tether_lifetime::{Handle, Peer, ReclaimQueue, ResourceOwner};

use super::*;

#[derive(Default)]
struct RecordingBridge {
	resolved: Mutex<Vec<OpHandle>>,
}

impl OperationBridge for RecordingBridge {
	fn resolved_by_client(&self, op: OpHandle) {
		self.resolved.lock().push(op);
	}
}

#[derive(Default)]
struct CountingOwner {
	released: AtomicUsize,
}

impl ResourceOwner for CountingOwner {
	fn release(&self, _handle: Handle) {
		self.released.fetch_add(1, Ordering::SeqCst);
	}

	fn is_live(&self, _handle: Handle) -> bool {
		true
	}
}

struct Fixture {
	bridge: Arc<RecordingBridge>,
	owner: Arc<CountingOwner>,
	queue: Arc<ReclaimQueue>,
	session: SessionContext<&'static str>,
}

fn fixture() -> Fixture {
	let bridge = Arc::new(RecordingBridge::default());
	let owner = Arc::new(CountingOwner::default());
	let queue = Arc::new(ReclaimQueue::new());
	let lifetimes = Arc::new(ReferenceRegistry::new(
		Arc::clone(&owner) as Arc<dyn ResourceOwner>,
		Arc::clone(&queue),
	));
	let session = SessionContext::new(Arc::clone(&bridge) as Arc<dyn OperationBridge>, lifetimes);
	Fixture {
		bridge,
		owner,
		queue,
		session,
	}
}

#[test]
fn native_resolution_fires_callback_without_bridge_echo() {
	let fx = fixture();
	let op = fx.session.begin(OpHandle::from_raw(1), OpKind::Event);
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	op.on_resolved(move |payload| sink.lock().push(payload));

	fx.session.notify_resolved(OpHandle::from_raw(1), "value");
	assert_eq!(*seen.lock(), vec!["value"]);
	assert!(op.is_resolved());
	assert_eq!(fx.session.active_operations(), 0);
	assert!(fx.bridge.resolved.lock().is_empty());
}

#[test]
fn unknown_handles_are_ignored() {
	let fx = fixture();
	fx.session.notify_resolved(OpHandle::from_raw(404), "nobody");
	fx.session.notify_terminated(OpHandle::from_raw(404));
	fx.session.resolve(OpHandle::from_raw(404), "nobody");
	assert!(fx.bridge.resolved.lock().is_empty());
}

#[test]
fn client_resolution_echoes_to_bridge_exactly_once() {
	let fx = fixture();
	fx.session.begin(OpHandle::from_raw(2), OpKind::Event);

	fx.session.resolve(OpHandle::from_raw(2), "first");
	fx.session.resolve(OpHandle::from_raw(2), "second");
	assert_eq!(*fx.bridge.resolved.lock(), vec![OpHandle::from_raw(2)]);
	assert_eq!(fx.session.active_operations(), 0);
}

#[test]
fn native_termination_runs_callbacks_and_clears_entry() {
	let fx = fixture();
	let op = fx.session.begin(OpHandle::from_raw(3), OpKind::Action);
	let fired = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&fired);
	op.add_termination_callback(move || {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	fx.session.notify_terminated(OpHandle::from_raw(3));
	assert_eq!(fired.load(Ordering::SeqCst), 1);
	assert!(op.is_terminated());
	assert_eq!(fx.session.active_operations(), 0);

	// A late native resolution for the same operation is absorbed.
	fx.session.notify_resolved(OpHandle::from_raw(3), "late");
	assert!(op.is_terminated());
}

#[test]
fn cancel_all_is_synchronous_and_total() {
	let fx = fixture();
	let fired = Arc::new(AtomicUsize::new(0));
	let ops: Vec<_> = (0..16)
		.map(|raw| {
			let op = fx.session.begin(OpHandle::from_raw(raw), OpKind::Action);
			let counter = Arc::clone(&fired);
			op.add_termination_callback(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			});
			op
		})
		.collect();

	fx.session.cancel_all();
	assert_eq!(fired.load(Ordering::SeqCst), 16);
	assert_eq!(fx.session.active_operations(), 0);
	assert!(ops.iter().all(|op| op.is_terminated()));
}

#[test]
fn cancel_all_leaves_resolved_operations_untouched() {
	let fx = fixture();
	let resolved = fx.session.begin(OpHandle::from_raw(10), OpKind::Event);
	let pending = fx.session.begin(OpHandle::from_raw(11), OpKind::Action);
	fx.session.notify_resolved(OpHandle::from_raw(10), "done");

	fx.session.cancel_all();
	assert!(resolved.is_resolved());
	assert!(pending.is_terminated());
	assert_eq!(fx.session.active_operations(), 0);
}

#[test]
fn racing_resolve_and_cancel_apply_exactly_one_outcome() {
	for _ in 0..64 {
		let fx = fixture();
		let session = Arc::new(fx.session);
		let op = session.begin(OpHandle::from_raw(20), OpKind::Action);

		let outcomes = Arc::new(AtomicUsize::new(0));
		let completion = Arc::clone(&outcomes);
		op.on_resolved(move |_| {
			completion.fetch_add(1, Ordering::SeqCst);
		});
		let termination = Arc::clone(&outcomes);
		op.add_termination_callback(move || {
			termination.fetch_add(1, Ordering::SeqCst);
		});

		let resolver = {
			let session = Arc::clone(&session);
			std::thread::spawn(move || session.resolve(OpHandle::from_raw(20), "raced"))
		};
		let canceller = {
			let session = Arc::clone(&session);
			std::thread::spawn(move || session.cancel_all())
		};
		resolver.join().unwrap();
		canceller.join().unwrap();

		assert_eq!(outcomes.load(Ordering::SeqCst), 1, "exactly one callback fires");
		assert!(!op.is_pending());
		assert_eq!(session.active_operations(), 0);
		assert!(fx.bridge.resolved.lock().len() <= 1);
	}
}

#[test]
fn duplicate_begin_never_strands_the_displaced_operation() {
	let fx = fixture();
	let first = fx.session.begin(OpHandle::from_raw(40), OpKind::Action);
	let second = fx.session.begin(OpHandle::from_raw(40), OpKind::Action);

	assert!(first.is_terminated(), "displaced operation must reach a terminal state");
	assert!(second.is_pending());
	assert_eq!(fx.session.active_operations(), 1);

	fx.session.cancel_all();
	assert!(second.is_terminated());
	assert_eq!(fx.session.active_operations(), 0);
}

#[test]
fn begin_racing_cancel_all_never_strands_an_op() {
	for raw in 0..64 {
		let fx = fixture();
		let session = Arc::new(fx.session);
		let handle = OpHandle::from_raw(raw);

		let beginner = {
			let session = Arc::clone(&session);
			std::thread::spawn(move || session.begin(handle, OpKind::Action))
		};
		let canceller = {
			let session = Arc::clone(&session);
			std::thread::spawn(move || session.cancel_all())
		};
		let op = beginner.join().unwrap();
		canceller.join().unwrap();

		// The racing registration is either swept by the cancellation or
		// survives into the next epoch, still tracked; an operation that is
		// pending yet absent from the active set would be unreachable.
		if op.is_pending() {
			assert!(session.operations().get(handle).is_some());
		} else {
			assert!(op.is_terminated());
			assert!(session.operations().get(handle).is_none());
		}
	}
}

#[test]
fn dropping_the_session_cancels_in_flight_operations() {
	let fx = fixture();
	let op = fx.session.begin(OpHandle::from_raw(30), OpKind::Action);
	drop(fx.session);
	assert!(op.is_terminated());
}

#[test]
fn frame_tick_drives_handle_reclamation() {
	let fx = fixture();
	let handle = Handle::from_raw(77);
	let peer = Peer::bound(handle, Arc::clone(&fx.queue)).unwrap();
	fx.session.lifetimes().register(&peer).unwrap();

	drop(peer);
	assert_eq!(fx.owner.released.load(Ordering::SeqCst), 0);

	let report = fx.session.frame_tick();
	assert_eq!(report.released_handles, 1);
	assert_eq!(fx.owner.released.load(Ordering::SeqCst), 1);

	// Nothing queued: the next frame is a no-op.
	assert_eq!(fx.session.frame_tick(), CleanupReport::default());
}
