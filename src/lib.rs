//! # Tandem — Cooperative Threading Runtime
//!
//! A lightweight cooperative threading runtime for resource-constrained
//! single-core systems. Concurrency is expressed as a fixed pool of
//! named threads that share one stack arena, yield to each other at
//! explicit points, sleep for timed periods, wait on semaphore ids, and
//! resume deterministically under a round-robin dispatcher driven by a
//! host-supplied tick source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Application Threads                    │
//! ├─────────────────────────────────────────────────────────┤
//! │                Kernel API (kernel.rs)                    │
//! │  spawn() · service() · yield_now() · idle() · wait() ·   │
//! │  wait_cond() · notify() · notify_all() · yield_after()   │
//! ├───────────────┬───────────────────┬─────────────────────┤
//! │   Scheduler   │   Stack Arena     │   Platform Hooks    │
//! │  scheduler.rs │   arena.rs        │   platform.rs       │
//! │  ─ dispatch   │   ─ carve()       │   ─ tick()          │
//! │  ─ sys idle   │   ─ unwind_to()   │   ─ idle()          │
//! │  ─ unwind     │   ─ water mark    │                     │
//! ├───────────────┴───────────────────┴─────────────────────┤
//! │          Thread Model (task.rs) · Ticks (tick.rs)        │
//! │     ThreadContext · ThreadState · wrap-safe compares     │
//! ├─────────────────────────────────────────────────────────┤
//! │         Arch Ports (arch/) — saved-context switch        │
//! │         x86_64 · aarch64 · ARMv7-M · riscv64             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Single-threaded and strictly cooperative: a thread owns the CPU from
//! the moment the dispatcher enters it until it yields, sleeps, waits or
//! returns. There is no preemption and no priority; dispatch order is
//! round-robin over slot indices. Timeouts are sampled at dispatch
//! turns, so every wake-up is "no earlier than", never "exactly at".
//!
//! ## Memory model
//!
//! - **No heap**: all state is statically allocated.
//! - **One stack arena**: thread stacks are carved from a single static
//!   region in start order and reclaimed strictly LIFO. A thread that
//!   terminates under a live, more shallowly started thread leaves a
//!   *hole* that keeps both its pool slot and its stack region until the
//!   unwind reaches it.
//! - **Guard fill**: fresh stacks are filled with a guard byte, which
//!   the optional water-mark estimator later scans.
//!
//! ## Cargo features
//!
//! `idle`, `yield-after`, `wait` (all default) gate the timed APIs;
//! `stack-wm` (default) the stack estimator; `noexit-static-threads`
//! strips the hole/unwind machinery for static task sets that never
//! return; `std` adds a hosted platform and the demo binary.

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod arch;
mod arena;
pub mod config;
pub mod kernel;
#[cfg(any(feature = "idle", feature = "wait", feature = "yield-after"))]
pub mod platform;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod tick;

/// Errors reported by the kernel API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid argument at admission.
    InvArg,
    /// Thread pool full.
    Limit,
    /// Wait expired before a notification arrived.
    Timeout,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvArg => f.write_str("invalid argument"),
            Error::Limit => f.write_str("thread pool limit reached"),
            Error::Timeout => f.write_str("wait timed out"),
        }
    }
}
