//! # Kernel API
//!
//! The public face of Tandem: thread admission, the scheduler service
//! and the routines thread code calls to cooperate.
//!
//! The scheduler state is a process-wide singleton, the usual shape for
//! embedded systems with one scheduler per program. The API splits into
//! two groups:
//!
//! - **Driver side** (`spawn`, `service`, `notify`, `notify_all`):
//!   callable from the top-level program; `notify*` additionally from
//!   interrupt service routines.
//! - **Thread side** (`yield_now`, `idle`, `yield_after`, `wait`,
//!   `wait_cond`, `thread_name`, `stack_watermark`): callable from a
//!   thread routine only. Calling them anywhere else is a programmer
//!   error with unspecified behavior.
//!
//! ## Typical shape
//!
//! ```ignore
//! fn worker(arg: *mut ()) {
//!     loop {
//!         if kernel::wait(RX_SEM, 500).is_ok() {
//!             // consume the event
//!         }
//!         kernel::yield_now();
//!     }
//! }
//!
//! kernel::spawn(worker, Some("worker"), 0, core::ptr::null_mut())?;
//! kernel::service(); // returns when every thread has terminated
//! ```

use crate::scheduler::Scheduler;
use crate::sync;
use crate::task::ThreadEntry;
use crate::Error;

#[cfg(not(feature = "idle"))]
use crate::task::ThreadState;
#[cfg(feature = "wait")]
use crate::task::PredicateFn;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::tick::Tick;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// The singleton scheduler.
///
/// # Safety
///
/// Mutated from three places: the dispatcher, the currently running
/// thread, and `notify*` callers (possibly an ISR). The first two are
/// the same, single thread of execution; the ISR-facing paths touch only
/// a waiting slot's state and notified flag and run inside a critical
/// section.
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw access to the singleton for this crate's internals.
pub(crate) unsafe fn scheduler() -> &'static mut Scheduler {
    &mut *core::ptr::addr_of_mut!(SCHEDULER)
}

// ---------------------------------------------------------------------------
// Driver-side API
// ---------------------------------------------------------------------------

/// Admit a thread into the pool; it starts running once [`service`]
/// dispatches it.
///
/// # Parameters
///
/// - `entry`: thread routine.
/// - `name`: optional thread name, readable from the thread via
///   [`thread_name`].
/// - `stack_sz`: requested stack size in bytes; 0 selects
///   [`DEFAULT_STACK_SIZE`](crate::config::DEFAULT_STACK_SIZE).
/// - `arg`: opaque pointer forwarded to `entry` untouched.
///
/// # Errors
///
/// - [`Error::InvArg`]: the requested stack size is below
///   [`MIN_STACK_SIZE`](crate::config::MIN_STACK_SIZE) or cannot fit the
///   arena.
/// - [`Error::Limit`]: no free slot; terminated threads whose stacks are
///   still pinned (holes) count against the pool.
///
/// # Panics
///
/// A panic inside a thread routine does not propagate to other threads
/// or to the service caller; it unwinds into the entry trampoline and
/// aborts.
pub fn spawn(
    entry: ThreadEntry,
    name: Option<&'static str>,
    stack_sz: usize,
    arg: *mut (),
) -> Result<(), Error> {
    sync::critical_section(|_| unsafe { scheduler() }.spawn(entry, name, stack_sz, arg))
}

/// Run the scheduler service until the last thread terminates.
///
/// Threads admitted before or during the service round all run to
/// completion. When the pool drains the singleton resets, so admission
/// and a new service round may follow. Must not be called from a thread
/// routine.
pub fn service() {
    unsafe { scheduler() }.service();
}

/// Wake a single thread waiting on `sem_id` (the lowest-index match
/// whose predicate holds). No-op if nothing matches.
///
/// Callable from anywhere, interrupt service routines included.
#[cfg(feature = "wait")]
pub fn notify(sem_id: i32) {
    sync::critical_section(|_| unsafe { scheduler() }.notify(sem_id, true));
}

/// Wake every thread waiting on `sem_id` whose predicate holds.
///
/// Callable from anywhere, interrupt service routines included.
#[cfg(feature = "wait")]
pub fn notify_all(sem_id: i32) {
    sync::critical_section(|_| unsafe { scheduler() }.notify(sem_id, false));
}

// ---------------------------------------------------------------------------
// Thread-side API
// ---------------------------------------------------------------------------

/// Give the CPU back to the scheduler; the thread continues when its
/// slot comes around again.
///
/// To be called from a thread routine only.
#[cfg(feature = "idle")]
pub fn yield_now() {
    idle(0);
}

/// Give the CPU back to the scheduler; the thread continues when its
/// slot comes around again.
///
/// To be called from a thread routine only.
#[cfg(not(feature = "idle"))]
pub fn yield_now() {
    unsafe { scheduler() }.yield_current(ThreadState::Run);
}

/// Sleep the current thread for at least `period` ticks; 0 degrades to
/// [`yield_now`]. `period` must not exceed
/// [`MAX_PERIOD`](crate::tick::MAX_PERIOD).
///
/// Cooperative scheduling cannot guarantee a punctual wake-up: the
/// thread resumes at the first dispatch after the period has passed,
/// which may be much later if peer threads hog the CPU. Prefer this
/// routine over platform sleeps inside thread code so that the scheduler
/// can consolidate idleness and suspend the platform.
///
/// To be called from a thread routine only.
#[cfg(feature = "idle")]
pub fn idle(period: Tick) {
    unsafe { scheduler() }.idle(period);
}

/// Yield once the tick in `*after` has passed, then advance `*after` by
/// `period`; do nothing otherwise. Intended for time-consuming loops:
///
/// ```ignore
/// let mut after = platform::tick_now() + MAX_RUN;
/// while work_left() {
///     do_a_chunk();
///     kernel::yield_after(&mut after, MAX_RUN);
/// }
/// ```
///
/// To be called from a thread routine only.
#[cfg(feature = "yield-after")]
pub fn yield_after(after: &mut Tick, period: Tick) {
    unsafe { scheduler() }.yield_after(after, period);
}

/// Wait for a notification on `sem_id`, a plain binary-semaphore wait:
/// equivalent to [`wait_cond`] with no predicate.
///
/// `timeout` of 0 waits forever. To be called from a thread routine
/// only.
///
/// # Errors
///
/// [`Error::Timeout`] when the timeout passed without a notification.
#[cfg(feature = "wait")]
pub fn wait(sem_id: i32, timeout: Tick) -> Result<(), Error> {
    wait_cond(sem_id, timeout, None, core::ptr::null_mut())
}

/// Wait for a notification on `sem_id`, gated by a predicate.
///
/// The predicate is evaluated inside `notify`/`notify_all` — possibly in
/// interrupt context — against the opaque `cv` pointer registered here.
/// It must be cheap and reentrant with respect to the waiter's state.
///
/// `timeout` of 0 waits forever. To be called from a thread routine
/// only.
///
/// # Errors
///
/// [`Error::Timeout`] when the timeout passed without a (predicate-
/// approved) notification.
#[cfg(feature = "wait")]
pub fn wait_cond(
    sem_id: i32,
    timeout: Tick,
    predicate: Option<PredicateFn>,
    cv: *mut (),
) -> Result<(), Error> {
    unsafe { scheduler() }.wait_cond(sem_id, timeout, predicate, cv)
}

/// Name of the current thread, as given at [`spawn`] time.
///
/// To be called from a thread routine only.
pub fn thread_name() -> Option<&'static str> {
    unsafe { scheduler() }.thread_name()
}

/// Estimated maximum stack usage of the current thread, in bytes.
///
/// A guard-byte heuristic; treat the value as an indicator while sizing
/// stacks, not as ground truth. To be called from a thread routine only.
#[cfg(feature = "stack-wm")]
pub fn stack_watermark() -> usize {
    unsafe { scheduler() }.stack_watermark()
}

/// Is the current thread the most shallow started one, i.e. would its
/// termination unwind the arena instead of leaving a hole?
///
/// To be called from a thread routine only.
#[doc(hidden)]
#[cfg(not(feature = "noexit-static-threads"))]
pub fn current_is_most_shallow() -> bool {
    unsafe { scheduler() }.current_is_most_shallow()
}
