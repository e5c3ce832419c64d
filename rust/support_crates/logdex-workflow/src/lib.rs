//! Coordination utilities for concurrent query execution.
//!
//! - [`cancel`] - [`CancellationToken`](cancel::CancellationToken), a cooperative
//!   cancellation flag threaded through every blocking wait of a query.
//! - [`slots`] - the process-wide bounded worker-slot pool and RAII leases over it.

pub mod cancel;
pub mod slots;

pub use cancel::CancellationToken;
pub use slots::{AtomicSlots, SlotLease, WorkerSlots};
