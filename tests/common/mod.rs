//! Shared test harness: a deterministic virtual-clock platform and the
//! serialization lock the scenario tests take around the scheduler
//! singleton.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tandem::platform::{self, Platform};
use tandem::tick::Tick;

/// A virtual clock: `tick()` reads a counter that only moves when the
/// scheduler hands idle time to the platform (or a test advances it by
/// hand). Every sleep and timeout in a scenario therefore elapses
/// exactly, making elapsed-time assertions deterministic.
pub struct VirtualClock {
    now: AtomicU32,
    idle_calls: AtomicUsize,
}

impl VirtualClock {
    pub const fn new() -> Self {
        Self {
            now: AtomicU32::new(0),
            idle_calls: AtomicUsize::new(0),
        }
    }

    /// Rewind to tick 0 and install this clock as the platform.
    pub fn install(&'static self) {
        self.now.store(0, Ordering::SeqCst);
        self.idle_calls.store(0, Ordering::SeqCst);
        platform::set_platform(self);
    }

    pub fn now(&self) -> Tick {
        self.now.load(Ordering::SeqCst)
    }

    /// Simulate in-thread work taking `ticks` of wall time.
    pub fn advance(&self, ticks: Tick) {
        self.now.fetch_add(ticks, Ordering::SeqCst);
    }

    /// How many times the scheduler suspended the platform.
    pub fn idle_calls(&self) -> usize {
        self.idle_calls.load(Ordering::SeqCst)
    }
}

impl Platform for VirtualClock {
    fn tick(&self) -> Tick {
        self.now()
    }

    fn idle(&self, period: Tick) {
        self.idle_calls.fetch_add(1, Ordering::SeqCst);
        assert_ne!(
            period, 0,
            "indefinite system idle with no wake-up source would hang"
        );
        self.advance(period);
    }
}

static SERIAL: Mutex<()> = Mutex::new(());

/// Scenario tests share the scheduler singleton; hold this for the whole
/// test body so the harness cannot interleave them.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// Ordered event log shared between threads of a scenario.
pub struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    pub const fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    pub fn push(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}
