//! # Platform Hooks
//!
//! The host-supplied services the scheduler builds its timed features
//! on: a monotonic tick source and an idle hook the system-idle
//! consolidation hands power management to.
//!
//! A platform is installed once, before the first service round, via
//! [`set_platform`] — the same shape as installing a logger with the
//! `log` crate. Hosted builds (`std` feature) fall back to a built-in
//! monotonic-clock platform when none is installed; bare-metal builds
//! consider a missing platform a fatal configuration error.

use crate::sync;
use crate::tick::Tick;

/// The services the host supplies.
pub trait Platform: Sync {
    /// Current monotonic tick count. The unit is the host's choice
    /// (commonly milliseconds) and the counter is expected to wrap.
    ///
    /// Called from scheduler and thread contexts.
    fn tick(&self) -> Tick;

    /// Suspend the platform for approximately `period` ticks; 0 means
    /// indefinitely, until some wake-up source fires. A wake-up source
    /// may be an interrupt whose service routine calls
    /// [`notify`](crate::kernel::notify): the scheduler re-examines the
    /// pool every time this hook returns, so returning early is always
    /// safe.
    ///
    /// Only called when the `idle` feature is enabled and no thread is
    /// runnable.
    fn idle(&self, period: Tick);
}

static mut PLATFORM: Option<&'static dyn Platform> = None;

/// Install the platform hooks. Call once before the first service
/// round; installing again replaces the previous hooks.
pub fn set_platform(platform: &'static dyn Platform) {
    sync::critical_section(|_| unsafe {
        *core::ptr::addr_of_mut!(PLATFORM) = Some(platform);
    });
}

fn active() -> &'static dyn Platform {
    let installed = unsafe { *core::ptr::addr_of!(PLATFORM) };
    match installed {
        Some(p) => p,
        #[cfg(feature = "std")]
        None => &host::StdPlatform,
        #[cfg(not(feature = "std"))]
        None => panic!("platform hooks not installed"),
    }
}

/// Current tick, via the installed hooks.
pub(crate) fn tick() -> Tick {
    active().tick()
}

/// Suspend the platform, via the installed hooks.
#[cfg(feature = "idle")]
pub(crate) fn idle(period: Tick) {
    active().idle(period);
}

// ---------------------------------------------------------------------------
// Hosted platform
// ---------------------------------------------------------------------------

#[cfg(feature = "std")]
mod host {
    use super::Platform;
    use crate::tick::Tick;
    use std::sync::OnceLock;
    use std::time::Instant;

    /// Milliseconds-since-start clock and sleeping idle hook for hosted
    /// builds.
    pub struct StdPlatform;

    impl Platform for StdPlatform {
        fn tick(&self) -> Tick {
            static START: OnceLock<Instant> = OnceLock::new();
            let start = START.get_or_init(Instant::now);
            start.elapsed().as_millis() as Tick
        }

        fn idle(&self, period: Tick) {
            // An indefinite idle is served in short slices so a wake-up
            // delivered from another host thread is picked up promptly.
            let ms = if period == 0 { 1 } else { u64::from(period) };
            std::thread::sleep(core::time::Duration::from_millis(ms));
        }
    }
}

#[cfg(feature = "std")]
pub use host::StdPlatform;
