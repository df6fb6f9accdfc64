//! Wait/notify: single notification delivery, timeouts, group
//! notify-all on separate semaphore ids, and notification from the
//! platform idle hook (the stand-in for an interrupt service routine).

mod common;

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use common::VirtualClock;
use tandem::kernel;
use tandem::platform::{self, Platform};
use tandem::tick::Tick;

static CLOCK: VirtualClock = VirtualClock::new();

const STACK: usize = 8192;

// ---------------------------------------------------------------------------
// Single notify, fast and slow
// ---------------------------------------------------------------------------

static OUTCOMES: Mutex<Vec<(&'static str, bool, Tick)>> = Mutex::new(Vec::new());

fn record(tag: &'static str, ok: bool, elapsed: Tick) {
    OUTCOMES.lock().unwrap().push((tag, ok, elapsed));
}

fn patient_waiter(_: *mut ()) {
    let started = CLOCK.now();
    let r = kernel::wait(1, 350);
    record("waiter", r.is_ok(), CLOCK.now() - started);
}

fn fast_notifier(_: *mut ()) {
    kernel::idle(100);
    kernel::yield_now();
    kernel::notify(1);
}

fn slow_notifier(_: *mut ()) {
    kernel::idle(400);
    kernel::yield_now();
    kernel::notify(1);
}

#[test]
fn notify_beats_timeout() {
    let _guard = common::serial();
    CLOCK.install();
    OUTCOMES.lock().unwrap().clear();

    kernel::spawn(patient_waiter, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::spawn(fast_notifier, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::service();

    assert_eq!(*OUTCOMES.lock().unwrap(), [("waiter", true, 100)]);
}

#[test]
fn timeout_beats_notify() {
    let _guard = common::serial();
    CLOCK.install();
    OUTCOMES.lock().unwrap().clear();

    kernel::spawn(patient_waiter, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::spawn(slow_notifier, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::service();

    assert_eq!(*OUTCOMES.lock().unwrap(), [("waiter", false, 350)]);
}

// ---------------------------------------------------------------------------
// Single notify wakes exactly one waiter, lowest slot first
// ---------------------------------------------------------------------------

fn tagged_waiter(arg: *mut ()) {
    let tag = if arg as usize == 1 { "w1" } else { "w2" };
    let started = CLOCK.now();
    let r = kernel::wait(7, 0);
    record(tag, r.is_ok(), CLOCK.now() - started);
}

fn paired_notifier(_: *mut ()) {
    kernel::yield_now();
    kernel::notify(7);
    kernel::yield_now();
    kernel::notify(7);
}

#[test]
fn single_notify_wakes_one_waiter() {
    let _guard = common::serial();
    CLOCK.install();
    OUTCOMES.lock().unwrap().clear();

    kernel::spawn(tagged_waiter, None, STACK, 1usize as *mut ()).unwrap();
    kernel::spawn(tagged_waiter, None, STACK, 2usize as *mut ()).unwrap();
    kernel::spawn(paired_notifier, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::service();

    // One waiter per notification, in slot order.
    assert_eq!(
        *OUTCOMES.lock().unwrap(),
        [("w1", true, 0), ("w2", true, 0)]
    );
}

// ---------------------------------------------------------------------------
// Notify-all with two groups and staggered timeouts
// ---------------------------------------------------------------------------

static GROUP_RESULTS: Mutex<Vec<(i32, Tick, bool, Tick)>> = Mutex::new(Vec::new());

fn group_waiter(arg: *mut ()) {
    let code = arg as usize;
    let sem = (code >> 16) as i32;
    let timeout = (code & 0xFFFF) as Tick;
    let started = CLOCK.now();
    let r = kernel::wait(sem, timeout);
    GROUP_RESULTS
        .lock()
        .unwrap()
        .push((sem, timeout, r.is_ok(), CLOCK.now() - started));
}

fn group_notifier(_: *mut ()) {
    kernel::idle(150);
    kernel::notify_all(1);
    kernel::idle(100);
    kernel::notify_all(2);
}

#[test]
fn notify_all_with_groups_and_timeouts() {
    let _guard = common::serial();
    CLOCK.install();
    GROUP_RESULTS.lock().unwrap().clear();

    for sem in [1usize, 2] {
        for timeout in [100usize, 200, 300, 0] {
            let code = ((sem << 16) | timeout) as *mut ();
            kernel::spawn(group_waiter, None, STACK, code).unwrap();
        }
    }
    kernel::spawn(group_notifier, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::service();

    // Group 1 is notified at tick 150: the 100-tick waiter already timed
    // out, everyone else succeeds. Group 2 is notified at tick 250: the
    // 100- and 200-tick waiters timed out, the rest succeed.
    let results = GROUP_RESULTS.lock().unwrap();
    let outcome = |sem: i32, timeout: Tick| -> (bool, Tick) {
        let &(_, _, ok, elapsed) = results
            .iter()
            .find(|&&(s, t, _, _)| s == sem && t == timeout)
            .expect("missing waiter outcome");
        (ok, elapsed)
    };

    assert_eq!(outcome(1, 100), (false, 100));
    assert_eq!(outcome(1, 200), (true, 150));
    assert_eq!(outcome(1, 300), (true, 150));
    assert_eq!(outcome(1, 0), (true, 150));

    assert_eq!(outcome(2, 100), (false, 100));
    assert_eq!(outcome(2, 200), (false, 200));
    assert_eq!(outcome(2, 300), (true, 250));
    assert_eq!(outcome(2, 0), (true, 250));
}

// ---------------------------------------------------------------------------
// Notification delivered from the idle hook (ISR stand-in)
// ---------------------------------------------------------------------------

/// A clock whose idle hook doubles as a wake-up interrupt: a timed idle
/// advances time, an indefinite one fires a notification.
struct IsrClock {
    now: AtomicU32,
    indefinite_idles: AtomicUsize,
}

static ISR_CLOCK: IsrClock = IsrClock {
    now: AtomicU32::new(0),
    indefinite_idles: AtomicUsize::new(0),
};

impl Platform for IsrClock {
    fn tick(&self) -> Tick {
        self.now.load(Ordering::SeqCst)
    }

    fn idle(&self, period: Tick) {
        if period == 0 {
            self.indefinite_idles.fetch_add(1, Ordering::SeqCst);
            kernel::notify(9);
        } else {
            self.now.fetch_add(period, Ordering::SeqCst);
        }
    }
}

fn timed_isr_waiter(_: *mut ()) {
    let started = ISR_CLOCK.tick();
    let r = kernel::wait(9, 500);
    record("timed", r.is_ok(), ISR_CLOCK.tick() - started);
}

fn infinite_isr_waiter(_: *mut ()) {
    let started = ISR_CLOCK.tick();
    let r = kernel::wait(9, 0);
    record("infinite", r.is_ok(), ISR_CLOCK.tick() - started);
}

#[test]
fn notify_from_idle_hook_wakes_infinite_waiter() {
    let _guard = common::serial();
    ISR_CLOCK.now.store(0, Ordering::SeqCst);
    platform::set_platform(&ISR_CLOCK);
    OUTCOMES.lock().unwrap().clear();

    kernel::spawn(timed_isr_waiter, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::spawn(infinite_isr_waiter, None, STACK, core::ptr::null_mut()).unwrap();
    kernel::service();

    // The timed waiter bounds the first system idle and times out; only
    // the infinite wait remains, the system idles indefinitely and the
    // hook's notification ends it.
    assert_eq!(
        *OUTCOMES.lock().unwrap(),
        [("timed", false, 500), ("infinite", true, 500)]
    );
    assert!(ISR_CLOCK.indefinite_idles.load(Ordering::SeqCst) >= 1);
}
