//! # Scheduler
//!
//! The round-robin cooperative dispatcher and everything that hangs off
//! it: thread admission, the dispatch loop, the stack-unwind protocol,
//! the yield family and the wait/notify machinery.
//!
//! ## Dispatch loop
//!
//! `service()` loops while any slot is occupied:
//!
//! 1. If the `idle` feature is enabled and every active thread sleeps or
//!    waits, run system-idle consolidation: compute the nearest wake-up
//!    and hand the gap to the platform idle hook (§ [`Scheduler::system_idle`]).
//! 2. Advance `cur_thrd` round-robin over slot indices.
//! 3. Dispatch on the slot state: free and hole slots are skipped, due
//!    sleepers and timed-out waiters are promoted to `Run` and entered,
//!    runnable threads are entered, NEW threads are started.
//!
//! Entering a thread parks the scheduler context and resumes the
//! thread's; the iteration ends when the thread yields back.
//!
//! ## Stack discipline
//!
//! Thread stacks are carved from the shared [arena](crate::arena) in
//! dispatch order and reclaimed strictly LIFO. A thread that terminates
//! while it is the most shallow live thread unwinds the arena: its own
//! region, and the regions of any holes directly below it, are cut off
//! in one step. A thread that terminates deeper down becomes a hole and
//! keeps its slot and region until the unwind reaches it.

use log::trace;

use crate::arch;
use crate::arena::StackArena;
use crate::config::{DEFAULT_STACK_SIZE, MAX_THREADS, MIN_STACK_SIZE, STACK_ARENA_SIZE};
use crate::kernel;
use crate::task::{ThreadContext, ThreadEntry, ThreadState};
use crate::Error;

#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::platform;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::tick::is_tick_over;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
use crate::tick::Tick;
#[cfg(feature = "idle")]
use crate::tick::MAX_TICK;
#[cfg(feature = "wait")]
use crate::task::PredicateFn;

// ---------------------------------------------------------------------------
// Scheduler state
// ---------------------------------------------------------------------------

/// The whole scheduler state: the thread pool, the stack arena and the
/// dispatch bookkeeping. Lives as a single static in [`kernel`].
pub struct Scheduler {
    /// Slot currently owning the CPU; `usize::MAX` before the first
    /// dispatch of a service round.
    cur_thrd: usize,

    /// Number of occupied (non-empty) slots, holes included.
    busy_n: usize,

    /// Number of idle plus waiting threads.
    #[cfg(feature = "idle")]
    idle_n: usize,

    /// Number of holes (terminated threads still pinning their stack).
    #[cfg(not(feature = "noexit-static-threads"))]
    hole_n: usize,

    /// Number of thread stacks currently carved from the arena.
    #[cfg(not(feature = "noexit-static-threads"))]
    depth: usize,

    /// The dispatcher's own parked context.
    ctx: arch::Context,

    /// The thread pool.
    thrds: [ThreadContext; MAX_THREADS],

    /// Backing store for all thread stacks.
    arena: StackArena,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            cur_thrd: usize::MAX,
            busy_n: 0,
            #[cfg(feature = "idle")]
            idle_n: 0,
            #[cfg(not(feature = "noexit-static-threads"))]
            hole_n: 0,
            #[cfg(not(feature = "noexit-static-threads"))]
            depth: 0,
            ctx: arch::Context::null(),
            thrds: [ThreadContext::EMPTY; MAX_THREADS],
            arena: StackArena::new(),
        }
    }

    /// Return to the pristine state after a service round drains.
    fn reset(&mut self) {
        self.cur_thrd = usize::MAX;
        self.busy_n = 0;
        #[cfg(feature = "idle")]
        {
            self.idle_n = 0;
        }
        #[cfg(not(feature = "noexit-static-threads"))]
        {
            self.hole_n = 0;
            self.depth = 0;
        }
        self.ctx = arch::Context::null();
        for slot in self.thrds.iter_mut() {
            *slot = ThreadContext::EMPTY;
        }
        self.arena.reset();
    }

    /// Occupied slots that are not holes.
    #[cfg(feature = "idle")]
    fn active_threads(&self) -> usize {
        #[cfg(not(feature = "noexit-static-threads"))]
        return self.busy_n - self.hole_n;
        #[cfg(feature = "noexit-static-threads")]
        return self.busy_n;
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Admit a thread into the pool.
    ///
    /// The lowest-index free slot is populated and marked NEW; the
    /// thread starts once the dispatcher reaches the slot. A requested
    /// stack size of 0 selects [`DEFAULT_STACK_SIZE`].
    pub fn spawn(
        &mut self,
        entry: ThreadEntry,
        name: Option<&'static str>,
        stack_sz: usize,
        arg: *mut (),
    ) -> Result<(), Error> {
        if stack_sz > STACK_ARENA_SIZE || (stack_sz != 0 && stack_sz < MIN_STACK_SIZE) {
            return Err(Error::InvArg);
        }
        if self.busy_n >= MAX_THREADS {
            return Err(Error::Limit);
        }

        for (i, slot) in self.thrds.iter_mut().enumerate() {
            if slot.state == ThreadState::Empty {
                let stack_sz = if stack_sz == 0 {
                    DEFAULT_STACK_SIZE
                } else {
                    stack_sz
                };
                slot.init(entry, name, stack_sz, arg);
                self.busy_n += 1;
                trace!("thread #{} scheduled to run", i);
                break;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Dispatch loop
    // -----------------------------------------------------------------------

    /// Run admitted threads until the pool drains, then reset.
    ///
    /// Returns when the last thread terminates. Under the
    /// `noexit-static-threads` configuration threads never terminate and
    /// this routine never returns.
    pub fn service(&mut self) {
        while self.busy_n > 0 {
            #[cfg(debug_assertions)]
            self.assert_invariants();

            // A thread just passed through the NEW or RUN states, so new
            // idleness may have arisen; check whether the platform can be
            // suspended. Slots skipped below don't re-run this check.
            #[cfg(feature = "idle")]
            self.system_idle();

            loop {
                self.cur_thrd = self.cur_thrd.wrapping_add(1) % MAX_THREADS;

                match self.thrds[self.cur_thrd].state {
                    ThreadState::Empty => continue,

                    #[cfg(not(feature = "noexit-static-threads"))]
                    ThreadState::Hole => continue,

                    #[cfg(feature = "idle")]
                    ThreadState::Idle => {
                        if !is_tick_over(platform::tick(), self.thrds[self.cur_thrd].idle_until) {
                            // Still sleeping, but other threads run; the
                            // system cannot be suspended.
                            continue;
                        }
                        trace!("thread #{} IDLE -> RUN (via sched loop)", self.cur_thrd);
                        self.thrds[self.cur_thrd].state = ThreadState::Run;
                        self.idle_n -= 1;
                        self.enter_current();
                        break;
                    }

                    #[cfg(feature = "wait")]
                    ThreadState::Wait => {
                        let slot = &self.thrds[self.cur_thrd];
                        if slot.wait_flags.infinite
                            || !is_tick_over(platform::tick(), slot.wait_until)
                        {
                            // Not-notified infinite or not yet timed-out.
                            continue;
                        }
                        trace!("thread #{} WAIT -> RUN (timed out)", self.cur_thrd);
                        self.thrds[self.cur_thrd].state = ThreadState::Run;
                        #[cfg(feature = "idle")]
                        {
                            self.idle_n -= 1;
                        }
                        self.enter_current();
                        break;
                    }

                    ThreadState::Run => {
                        self.enter_current();
                        break;
                    }

                    ThreadState::New => {
                        self.enter_new();
                        break;
                    }
                }
            }
        }

        #[cfg(feature = "noexit-static-threads")]
        unreachable!("all static threads terminated");

        #[cfg(not(feature = "noexit-static-threads"))]
        self.reset();
    }

    /// Resume the current (already started) thread. Returns when it
    /// yields back to the scheduler.
    fn enter_current(&mut self) {
        #[cfg(feature = "yield-after")]
        {
            self.thrds[self.cur_thrd].switch_tick = platform::tick();
        }
        trace!("scheduler -> thread #{}", self.cur_thrd);
        let save: *mut arch::Context = &mut self.ctx;
        let resume: *const arch::Context = &self.thrds[self.cur_thrd].ctx;
        unsafe { arch::switch(save, resume) };
        trace!("back to scheduler from thread #{}", self.cur_thrd);
    }

    /// Start a NEW thread: carve its stack region, fabricate its initial
    /// context and switch into the entry trampoline. Returns when the
    /// thread yields for the first time.
    fn enter_new(&mut self) {
        let i = self.cur_thrd;

        #[cfg(not(feature = "noexit-static-threads"))]
        {
            self.depth += 1;
            self.thrds[i].depth = self.depth;
        }

        let stack_sz = self.thrds[i].stack_sz;
        let base = self.arena.carve(stack_sz);
        self.thrds[i].stack = base;
        self.thrds[i].ctx = unsafe { arch::prepare(base.add(stack_sz), thread_trampoline) };

        #[cfg(not(feature = "noexit-static-threads"))]
        trace!(
            "thread #{}: starting, {} byte stack at depth {}",
            i,
            stack_sz,
            self.thrds[i].depth
        );
        #[cfg(feature = "noexit-static-threads")]
        trace!("thread #{}: starting, {} byte stack", i, stack_sz);

        #[cfg(feature = "yield-after")]
        {
            self.thrds[i].switch_tick = platform::tick();
        }

        let save: *mut arch::Context = &mut self.ctx;
        let resume: *const arch::Context = &self.thrds[i].ctx;
        unsafe { arch::switch(save, resume) };
        trace!("back to scheduler from thread #{}", self.cur_thrd);
    }

    // -----------------------------------------------------------------------
    // Termination and stack unwinding
    // -----------------------------------------------------------------------

    /// Handle a thread whose entry routine returned. Never comes back:
    /// control moves to the parked scheduler context.
    #[cfg(not(feature = "noexit-static-threads"))]
    fn thread_exited(&mut self) -> ! {
        let i = self.cur_thrd;

        if self.thrds[i].depth < self.depth {
            // A deeper thread pins this region: leave a hole behind.
            trace!("thread #{}: RUN -> HOLE", i);
            self.thrds[i].state = ThreadState::Hole;
            self.hole_n += 1;
        } else {
            // Most shallow live thread: unwind the arena down to the
            // first region no live thread pins any more.
            let target = self.mark_unwind_threads();
            let base = self.thrds[target].stack;
            self.arena.unwind_to(base);
            trace!("arena unwound at thread #{} region", target);
        }

        unsafe { arch::resume_only(&self.ctx) }
    }

    /// A returning thread under the static configuration is a fatal
    /// invariant violation.
    #[cfg(feature = "noexit-static-threads")]
    fn thread_exited(&mut self) -> ! {
        panic!("static thread #{} returned from its entry", self.cur_thrd);
    }

    /// Mark the terminating thread, and every hole about to lose its
    /// pin, as empty. Returns the slot whose region base becomes the new
    /// arena top.
    #[cfg(not(feature = "noexit-static-threads"))]
    fn mark_unwind_threads(&mut self) -> usize {
        let mut unwind_thrd = self.cur_thrd;

        trace!("thread #{}: RUN -> EMPTY", self.cur_thrd);
        self.thrds[self.cur_thrd].state = ThreadState::Empty;
        self.busy_n -= 1;

        // Depth of the most shallow still-started thread.
        let mut depth = 0;
        for slot in self.thrds.iter() {
            if slot.state.is_started() && slot.depth > depth {
                depth = slot.depth;
            }
        }

        if depth + 1 < self.depth {
            // Holes sit between the terminating thread and the most
            // shallow started one; their regions unpin along with ours.
            // The one directly above the started thread is where the
            // arena top lands.
            for i in 0..MAX_THREADS {
                if self.thrds[i].state == ThreadState::Hole && self.thrds[i].depth >= depth + 1 {
                    if self.thrds[i].depth == depth + 1 {
                        unwind_thrd = i;
                    }
                    trace!("thread #{}: HOLE -> EMPTY", i);
                    self.thrds[i].state = ThreadState::Empty;
                    self.busy_n -= 1;
                    self.hole_n -= 1;
                }
            }
        }
        self.depth = depth;

        unwind_thrd
    }

    // -----------------------------------------------------------------------
    // System idle
    // -----------------------------------------------------------------------

    /// While no thread is runnable and at least one sleeps, hand the gap
    /// to the nearest wake-up over to the platform idle hook, promoting
    /// every thread whose time has come. An infinite gap (only infinite
    /// waits remain) is passed to the hook as 0.
    #[cfg(feature = "idle")]
    fn system_idle(&mut self) {
        let mut min_idle: Tick = 0;
        let mut scanned = false;

        while self.idle_n > 0 && self.active_threads() <= self.idle_n {
            if scanned {
                // min_idle was computed by the previous scan.
                if min_idle == MAX_TICK {
                    trace!("system going idle indefinitely");
                    platform::idle(0);
                } else {
                    trace!("system going idle for {} ticks", min_idle);
                    platform::idle(min_idle);
                }
            }

            min_idle = MAX_TICK;
            let now = platform::tick();
            scanned = true;

            for i in 0..MAX_THREADS {
                let wake_at = match self.thrds[i].state {
                    ThreadState::Idle => self.thrds[i].idle_until,
                    #[cfg(feature = "wait")]
                    ThreadState::Wait if !self.thrds[i].wait_flags.infinite => {
                        self.thrds[i].wait_until
                    }
                    _ => continue,
                };

                if is_tick_over(now, wake_at) {
                    trace!("thread #{} -> RUN (via idle loop)", i);
                    self.thrds[i].state = ThreadState::Run;
                    self.idle_n -= 1;
                } else if wake_at.wrapping_sub(now) < min_idle {
                    min_idle = wake_at.wrapping_sub(now);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Yield family (called from thread context)
    // -----------------------------------------------------------------------

    /// Move the current thread to `new_state` and give the CPU back to
    /// the dispatcher. Returns when the dispatcher re-enters the thread.
    ///
    /// On the first yield of a thread this is the NEW -> started
    /// transition; the stack region was already carved at dispatch.
    pub(crate) fn yield_current(&mut self, new_state: ThreadState) {
        let i = self.cur_thrd;
        if self.thrds[i].state != new_state {
            trace!("thread #{}: -> {:?}", i, new_state);
        }
        self.thrds[i].state = new_state;

        let save: *mut arch::Context = &mut self.thrds[i].ctx;
        let resume: *const arch::Context = &self.ctx;
        unsafe { arch::switch(save, resume) };
        // Re-entered by the dispatcher.
    }

    /// Sleep the current thread for `period` ticks; 0 degrades to a bare
    /// yield. Wake-up is no earlier than `period` ticks from now, and
    /// later if peers are uncooperative.
    #[cfg(feature = "idle")]
    pub(crate) fn idle(&mut self, period: Tick) {
        let mut new_state = ThreadState::Run;

        if period > 0 {
            trace!(
                "thread #{} going idle for {} ticks",
                self.cur_thrd,
                period
            );
            new_state = ThreadState::Idle;
            self.idle_n += 1;
            self.thrds[self.cur_thrd].idle_until = platform::tick().wrapping_add(period);
        }
        self.yield_current(new_state);
    }

    /// Yield only if the tick in `*after` has passed; on return from the
    /// yield, advance `*after` by `period`. Untouched when no switch
    /// happens, so hot loops can call this cheaply every iteration.
    #[cfg(feature = "yield-after")]
    pub(crate) fn yield_after(&mut self, after: &mut Tick, period: Tick) {
        if is_tick_over(platform::tick(), *after) {
            trace!("thread #{} yields after tick {}", self.cur_thrd, *after);
            self.yield_current(ThreadState::Run);
            *after = platform::tick().wrapping_add(period);
        }
    }

    // -----------------------------------------------------------------------
    // Wait / notify
    // -----------------------------------------------------------------------

    /// Suspend the current thread until notified on `sem_id` or until
    /// `timeout` ticks pass (0 waits forever). A predicate, if given, is
    /// evaluated at notify time against `cv` and gates the wake-up.
    #[cfg(feature = "wait")]
    pub(crate) fn wait_cond(
        &mut self,
        sem_id: i32,
        timeout: Tick,
        predicate: Option<PredicateFn>,
        cv: *mut (),
    ) -> Result<(), Error> {
        let i = self.cur_thrd;
        {
            let slot = &mut self.thrds[i];
            slot.sem_id = sem_id;
            slot.predicate = predicate;
            slot.cv = cv;
            slot.wait_flags.notified = false;
            if timeout != 0 {
                slot.wait_until = platform::tick().wrapping_add(timeout);
                slot.wait_flags.infinite = false;
                trace!(
                    "thread #{} waiting on sem {} with timeout {}",
                    i,
                    sem_id,
                    timeout
                );
            } else {
                slot.wait_until = 0;
                slot.wait_flags.infinite = true;
                trace!("thread #{} waiting on sem {} infinitely", i, sem_id);
            }
        }
        #[cfg(feature = "idle")]
        {
            self.idle_n += 1;
        }

        self.yield_current(ThreadState::Wait);

        // The notified flag is the sole evidence; a timeout that races a
        // notification still reports success.
        if self.thrds[i].wait_flags.notified {
            trace!("thread #{} notified on sem {}", i, sem_id);
            Ok(())
        } else {
            trace!("thread #{} timed out on sem {}", i, sem_id);
            Err(Error::Timeout)
        }
    }

    /// Wake threads waiting on `sem_id` whose predicate (if any) holds.
    /// Stops after the first match when `single` is set.
    ///
    /// Callable from any context, interrupt service routines included;
    /// the caller wraps it in a critical section.
    #[cfg(feature = "wait")]
    pub(crate) fn notify(&mut self, sem_id: i32, single: bool) {
        for i in 0..MAX_THREADS {
            let slot = &mut self.thrds[i];
            if slot.state == ThreadState::Wait
                && slot.sem_id == sem_id
                && slot.predicate.map_or(true, |p| p(slot.cv))
            {
                trace!(
                    "thread #{}: WAIT -> RUN ({}-notify on sem {})",
                    i,
                    if single { "single" } else { "all" },
                    sem_id
                );
                slot.wait_flags.notified = true;
                slot.state = ThreadState::Run;
                #[cfg(feature = "idle")]
                {
                    self.idle_n -= 1;
                }
                if single {
                    break;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Introspection (called from thread context)
    // -----------------------------------------------------------------------

    /// Name of the currently running thread.
    pub(crate) fn thread_name(&self) -> Option<&'static str> {
        self.thrds[self.cur_thrd].name
    }

    /// Estimated maximum stack usage of the current thread. 0 before the
    /// thread's stack is carved.
    #[cfg(feature = "stack-wm")]
    pub(crate) fn stack_watermark(&self) -> usize {
        let slot = &self.thrds[self.cur_thrd];
        if slot.stack.is_null() {
            return 0;
        }
        unsafe { crate::arena::high_water_mark(slot.stack, slot.stack_sz) }
    }

    /// Is the current thread the most shallow started one?
    #[cfg(not(feature = "noexit-static-threads"))]
    pub(crate) fn current_is_most_shallow(&self) -> bool {
        self.thrds[self.cur_thrd].depth == self.depth
    }

    // -----------------------------------------------------------------------
    // Invariant checking (debug builds)
    // -----------------------------------------------------------------------

    /// Validate the counter and depth invariants at a dispatch boundary.
    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        let mut busy = 0;
        let mut _holes = 0;
        let mut _idles = 0;
        for slot in self.thrds.iter() {
            if slot.state != ThreadState::Empty {
                busy += 1;
            }
            #[cfg(not(feature = "noexit-static-threads"))]
            if slot.state == ThreadState::Hole {
                _holes += 1;
            }
            if slot.state.is_idle() || slot.state.is_wait() {
                _idles += 1;
            }
        }
        debug_assert_eq!(busy, self.busy_n, "busy slot count out of sync");
        #[cfg(not(feature = "noexit-static-threads"))]
        debug_assert_eq!(_holes, self.hole_n, "hole count out of sync");
        #[cfg(feature = "idle")]
        debug_assert_eq!(_idles, self.idle_n, "idle count out of sync");

        // Depths of started-or-hole slots form the set {1..=depth},
        // each occurring exactly once.
        #[cfg(not(feature = "noexit-static-threads"))]
        {
            let mut seen: u32 = 0;
            let mut max_depth = 0;
            for slot in self.thrds.iter() {
                let pinned = slot.state.is_started() || slot.state == ThreadState::Hole;
                if !pinned {
                    continue;
                }
                debug_assert!(slot.depth >= 1 && slot.depth <= self.depth);
                debug_assert_eq!(seen & (1u32 << slot.depth), 0, "duplicate stack depth");
                seen |= 1u32 << slot.depth;
                if slot.depth > max_depth {
                    max_depth = slot.depth;
                }
            }
            debug_assert_eq!(max_depth, self.depth, "arena depth out of sync");
        }
    }
}

// ---------------------------------------------------------------------------
// Entry trampoline
// ---------------------------------------------------------------------------

/// First code any thread executes on its fresh stack: run the entry
/// routine, then hand the slot to the termination protocol.
extern "C" fn thread_trampoline() -> ! {
    let (entry, arg) = {
        let sched = unsafe { kernel::scheduler() };
        let slot = &sched.thrds[sched.cur_thrd];
        let entry = slot.entry.expect("dispatched slot without entry routine");
        (entry, slot.arg)
    };

    entry(arg);

    // The entry returned: terminate this thread. The call never comes
    // back; the scheduler context takes over.
    unsafe { kernel::scheduler() }.thread_exited()
}

// ---------------------------------------------------------------------------
// Unit tests (admission logic; dispatch is covered by integration tests)
// ---------------------------------------------------------------------------
