//! Single-resolution pending operations and session-wide cancellation.
//!
//! The native engine opens units of work — one-shot events and longer-running
//! actions — that stay in flight until resolved or terminated exactly once.
//! [`PendingOperation`] is the managed face of one such unit;
//! [`PendingOperationRegistry`] is the active set scoped to one document
//! session; [`SessionContext`] ties the two to the native notification
//! surface and drives per-frame lifetime maintenance.
//!
//! Resolution and termination are mutually exclusive terminal states. Double
//! notifications are silent no-ops: races between native-driven completion
//! and session-wide cancellation are expected, not exceptional.

/// Pending operation state machine and callbacks.
pub mod op;
/// Active set of in-flight operations.
pub mod registry;
/// Document-session context and native bridge boundary.
pub mod session;

pub use op::{OpHandle, OpKind, PendingOperation};
pub use registry::PendingOperationRegistry;
pub use session::{OperationBridge, SessionContext};
