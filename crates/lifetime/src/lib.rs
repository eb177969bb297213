//! Handle lifetime tracking between a managed host and a native resource owner.
//!
//! A native engine hands out opaque [`Handle`]s; the host wraps each one in
//! one or more [`Peer`]s. The [`ReferenceRegistry`] keeps a referent set per
//! handle and releases the native resource exactly once, when the last peer
//! wrapping that handle has been reclaimed and observed by a cleanup pass.
//!
//! Reclamation is two-phase: dropping a bound peer only enqueues a
//! notification on the [`ReclaimQueue`]; an external tick driver runs
//! [`ReferenceRegistry::run_cleanup_pass`] to drain the queue and release
//! dead handles. Missing ticks delay reclamation but never change behavior.

/// Opaque handle and peer identity types.
pub mod handle;
/// Boundary trait to the native resource owner.
pub mod owner;
/// Managed peer wrapper bound to exactly one handle.
pub mod peer;
/// Drop-driven unreachable-peer notification queue.
pub mod reclaim;
/// Reference-counting registry keyed by handle.
pub mod registry;

pub use handle::{Handle, PeerId};
pub use owner::ResourceOwner;
pub use peer::{Peer, PeerError};
pub use reclaim::ReclaimQueue;
pub use registry::{CleanupReport, ReferenceRegistry, RegistryError};
