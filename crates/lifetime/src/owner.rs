use crate::Handle;

/// Boundary to the native side that owns the resources behind handles.
///
/// The registry guarantees [`release`](ResourceOwner::release) is called at
/// most once per handle, and only after every peer wrapping that handle has
/// been reclaimed. `release` runs under the handle's shard lock so removal
/// and release are atomic; implementations must not call back into the
/// registry from it.
pub trait ResourceOwner: Send + Sync {
	/// Frees the native resource behind `handle`.
	fn release(&self, handle: Handle);

	/// Reports whether the native side still holds a live resource for
	/// `handle`. Diagnostic only; production logic never consults it.
	fn is_live(&self, handle: Handle) -> bool;
}
