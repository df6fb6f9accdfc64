//! # Clock Ticks
//!
//! Tick arithmetic tolerant of counter wrap-around.
//!
//! The platform supplies a monotonically increasing tick counter of
//! implementation-defined unit (commonly milliseconds). The counter is
//! expected to wrap. All deadline arithmetic in the scheduler therefore
//! stores an *absolute* target tick and compares it with [`is_tick_over`],
//! which splits the tick ring into a small "future" window of
//! [`OVER_TICKS`] ticks and a large "passed or equal" remainder. As long
//! as targets lie within [`MAX_PERIOD`] of the current tick, comparisons
//! stay correct across wrap-around.

/// Clock tick counter type.
pub type Tick = u32;

/// All-ones tick value.
pub const MAX_TICK: Tick = Tick::MAX;

/// Maximum tick distance for which [`is_tick_over`] reports `true`:
/// one hex digit of ones per byte of the tick type (`0xFFFF` for a
/// 4-byte tick).
pub const OVER_TICKS: Tick = Tick::MAX >> (4 * core::mem::size_of::<Tick>());

/// Largest legal idle/wait period. Passing a longer period to any of the
/// timed APIs is not checked and yields unspecified wake-up times.
pub const MAX_PERIOD: Tick = MAX_TICK - OVER_TICKS + 1;

/// Has `t1` reached or passed `t2` on the tick ring?
///
/// Uses the distance approach: if the wrapped difference `t1 - t2` is
/// smaller than [`OVER_TICKS`], `t1` is considered greater or equal,
/// otherwise `t2` still lies ahead.
#[inline]
pub fn is_tick_over(t1: Tick, t2: Tick) -> bool {
    t1.wrapping_sub(t2) < OVER_TICKS
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
