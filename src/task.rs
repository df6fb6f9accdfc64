//! # Thread Context
//!
//! Defines the per-thread bookkeeping for Tandem: the thread state
//! machine and the thread context slot stored in the scheduler's fixed
//! pool.
//!
//! ## Memory model
//!
//! A slot does not own stack memory. Its stack is a region carved out of
//! the shared [`arena`](crate::arena) when the thread is first
//! dispatched, ordered by `depth`: the first-started thread is the
//! deepest (depth 1), the latest-started the most shallow. Regions are
//! reclaimed strictly last-in-first-out; a thread that terminates while
//! a more shallow thread is still alive leaves a *hole* whose region
//! stays pinned until the threads above it are gone.

use crate::arch;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::tick::Tick;

/// Thread entry routine. The argument is the opaque user pointer passed
/// at spawn time, forwarded untouched.
pub type ThreadEntry = fn(*mut ());

/// Wait-predicate routine evaluated at notify time. Receives the opaque
/// condition-variable pointer registered by the waiter; returns `true`
/// when the waiting thread shall be woken.
#[cfg(feature = "wait")]
pub type PredicateFn = fn(*mut ()) -> bool;

// ---------------------------------------------------------------------------
// Thread state machine
// ---------------------------------------------------------------------------

/// Execution state of a thread slot.
///
/// ```text
///             spawn()            first yield
///  ┌───────┐ ────────► ┌─────┐ ─────────────► ┌─────┐
///  │ Empty │           │ New │                │ Run │ ◄───┐
///  └───────┘           └─────┘                └─────┘     │
///      ▲                              idle() /   │        │ tick passed /
///      │ unwind                       wait()     ▼        │ notify
///  ┌───────┐  entry returned,      ┌──────────────────┐   │
///  │ Hole  │ ◄──────────────────── │   Idle / Wait    │ ──┘
///  └───────┘  deeper thread alive  └──────────────────┘
/// ```
///
/// A thread whose entry returns while it is the most shallow live thread
/// skips `Hole` and goes straight back to `Empty`, unwinding the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Free slot in the pool.
    Empty,
    /// Thread terminated but its stack region is still pinned in the
    /// arena by a deeper live thread.
    #[cfg(not(feature = "noexit-static-threads"))]
    Hole,
    /// Spawned but not yet started.
    New,
    /// Runnable (or currently running).
    Run,
    /// Sleeping until `idle_until`.
    #[cfg(feature = "idle")]
    Idle,
    /// Suspended until notified or timed out.
    #[cfg(feature = "wait")]
    Wait,
}

impl ThreadState {
    /// Sleeping in the timed-idle sense.
    #[inline]
    pub fn is_idle(self) -> bool {
        #[cfg(feature = "idle")]
        return self == ThreadState::Idle;
        #[cfg(not(feature = "idle"))]
        return false;
    }

    /// Suspended on a semaphore id.
    #[inline]
    pub fn is_wait(self) -> bool {
        #[cfg(feature = "wait")]
        return self == ThreadState::Wait;
        #[cfg(not(feature = "wait"))]
        return false;
    }

    /// Started threads occupy a stack region. `New` does not count.
    #[inline]
    pub fn is_started(self) -> bool {
        self == ThreadState::Run || self.is_idle() || self.is_wait()
    }
}

// ---------------------------------------------------------------------------
// Wait flags
// ---------------------------------------------------------------------------

/// Flags qualifying a `Wait` state.
#[cfg(feature = "wait")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitFlags {
    /// Set by `notify`/`notify_all` when the wake-up was a notification.
    /// The sole evidence distinguishing a successful wait from a timeout.
    pub notified: bool,
    /// Infinite wait; `wait_until` is not applied.
    pub infinite: bool,
}

// ---------------------------------------------------------------------------
// Thread context slot
// ---------------------------------------------------------------------------

/// One slot of the thread pool.
///
/// Everything here is mutated by the dispatcher or by the thread itself
/// while it runs, with one exception: `state` and `wait_flags.notified`
/// of a waiting slot may be flipped by `notify*` from an interrupt
/// service routine. Those two writes happen inside a critical section.
pub struct ThreadContext {
    /// Entry routine. Present on every non-empty slot.
    pub entry: Option<ThreadEntry>,

    /// Thread name, if any. `'static` so it outlives the thread.
    pub name: Option<&'static str>,

    /// Opaque user argument forwarded to `entry`.
    pub arg: *mut (),

    /// Current state.
    pub state: ThreadState,

    /// Base of the carved stack region; null until first dispatch.
    pub stack: *mut u8,

    /// Size of the stack region in bytes.
    pub stack_sz: usize,

    /// 1-based position in the arena. 1 is the deepest (oldest started)
    /// thread, the scheduler's current depth the most shallow. 0 until
    /// the thread is first dispatched.
    #[cfg(not(feature = "noexit-static-threads"))]
    pub depth: usize,

    /// Absolute tick the thread sleeps up to. Valid in `Idle`.
    #[cfg(feature = "idle")]
    pub idle_until: Tick,

    /// Tick at which the dispatcher last switched into this thread.
    #[cfg(feature = "yield-after")]
    pub switch_tick: Tick,

    /// Semaphore id the thread waits on. Valid in `Wait`.
    #[cfg(feature = "wait")]
    pub sem_id: i32,

    /// Wait predicate, evaluated at notify time.
    #[cfg(feature = "wait")]
    pub predicate: Option<PredicateFn>,

    /// Opaque condition-variable pointer handed to the predicate.
    #[cfg(feature = "wait")]
    pub cv: *mut (),

    /// Absolute tick the wait times out at. Valid in `Wait` when the
    /// wait is not infinite.
    #[cfg(feature = "wait")]
    pub wait_until: Tick,

    /// Wait qualifiers. Valid in `Wait`.
    #[cfg(feature = "wait")]
    pub wait_flags: WaitFlags,

    /// Saved execution context of the most recent suspension point.
    pub ctx: arch::Context,
}

impl ThreadContext {
    /// A free slot. The pool starts as an array of these.
    pub const EMPTY: Self = Self {
        entry: None,
        name: None,
        arg: core::ptr::null_mut(),
        state: ThreadState::Empty,
        stack: core::ptr::null_mut(),
        stack_sz: 0,
        #[cfg(not(feature = "noexit-static-threads"))]
        depth: 0,
        #[cfg(feature = "idle")]
        idle_until: 0,
        #[cfg(feature = "yield-after")]
        switch_tick: 0,
        #[cfg(feature = "wait")]
        sem_id: 0,
        #[cfg(feature = "wait")]
        predicate: None,
        #[cfg(feature = "wait")]
        cv: core::ptr::null_mut(),
        #[cfg(feature = "wait")]
        wait_until: 0,
        #[cfg(feature = "wait")]
        wait_flags: WaitFlags {
            notified: false,
            infinite: false,
        },
        ctx: arch::Context::null(),
    };

    /// Populate a free slot for a newly spawned thread.
    pub fn init(
        &mut self,
        entry: ThreadEntry,
        name: Option<&'static str>,
        stack_sz: usize,
        arg: *mut (),
    ) {
        *self = Self::EMPTY;
        self.entry = Some(entry);
        self.name = name;
        self.stack_sz = stack_sz;
        self.arg = arg;
        self.state = ThreadState::New;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_defaults() {
        let slot = ThreadContext::EMPTY;
        assert_eq!(slot.state, ThreadState::Empty);
        assert!(slot.entry.is_none());
        assert!(slot.stack.is_null());
        assert_eq!(slot.stack_sz, 0);
        #[cfg(not(feature = "noexit-static-threads"))]
        assert_eq!(slot.depth, 0);
    }

    fn nop(_: *mut ()) {}

    #[test]
    fn init_populates_slot() {
        let mut slot = ThreadContext::EMPTY;
        slot.init(nop, Some("worker"), 2048, core::ptr::null_mut());
        assert_eq!(slot.state, ThreadState::New);
        assert_eq!(slot.name, Some("worker"));
        assert_eq!(slot.stack_sz, 2048);
        assert!(slot.stack.is_null());
        assert!(!slot.state.is_started());
    }

    #[test]
    fn started_classification() {
        assert!(ThreadState::Run.is_started());
        assert!(!ThreadState::New.is_started());
        assert!(!ThreadState::Empty.is_started());
        #[cfg(feature = "idle")]
        assert!(ThreadState::Idle.is_started());
        #[cfg(feature = "wait")]
        assert!(ThreadState::Wait.is_started());
        #[cfg(not(feature = "noexit-static-threads"))]
        assert!(!ThreadState::Hole.is_started());
    }
}
