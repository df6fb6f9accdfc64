//! # Synchronization Primitives
//!
//! Interrupt-safe critical section abstraction. The `notify*` paths may
//! run in interrupt context concurrently with the dispatcher; the two
//! words they write (a waiting slot's state and notified flag) are
//! guarded here.
//!
//! Implementations come from the `critical-section` crate: single-core
//! Cortex-M targets get the interrupt-disable one via `cortex-m`,
//! hosted builds and tests the mutex-based one via the crate's `std`
//! feature.

use critical_section::CriticalSection;

/// Execute a closure within a critical section.
///
/// Keep the enclosed work as short as possible to bound interrupt
/// latency.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}
